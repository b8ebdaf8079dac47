//! conceptgraph CLI: run the pipeline over a JSON corpus.
//!
//! Usage:
//!   conceptgraph extract <corpus.json> [--config path.yaml] [--pretty] [--report-only] [--embeddings]
//!   conceptgraph config

use clap::{Parser, Subcommand};
use conceptgraph::{ConceptPipeline, Paper, PipelineConfig, PipelineError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "conceptgraph",
    version,
    about = "Concept extraction and evidence-grounded concept hierarchies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a concept graph from a corpus file
    Extract {
        /// JSON array of papers, or an object with a `papers` field
        corpus: PathBuf,
        /// YAML pipeline configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
        /// Print only the provenance report
        #[arg(long)]
        report_only: bool,
        /// Use the bundled ONNX embedder for the embedding strategy
        /// (requires the `embeddings` feature)
        #[arg(long)]
        embeddings: bool,
    },
    /// Print the default configuration as YAML
    Config,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Papers(Vec<Paper>),
    Wrapped { papers: Vec<Paper> },
}

impl CorpusFile {
    fn into_papers(self) -> Vec<Paper> {
        match self {
            Self::Papers(papers) | Self::Wrapped { papers } => papers,
        }
    }
}

fn load_corpus(path: &Path) -> Result<Vec<Paper>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let corpus: CorpusFile =
        serde_json::from_str(&text).map_err(|e| format!("invalid corpus '{}': {}", path.display(), e))?;
    Ok(corpus.into_papers())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, String> {
    match path {
        Some(path) => PipelineConfig::from_yaml_file(path).map_err(|e| format!("{}: {}", path.display(), e)),
        None => Ok(PipelineConfig::default()),
    }
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> i32 {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_extract(corpus: &Path, config: Option<&Path>, pretty: bool, report_only: bool, embeddings: bool) -> i32 {
    let papers = match load_corpus(corpus) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut config = match load_config(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if !embeddings && config.strategies.contains(&conceptgraph::StrategyKind::Embedding) {
        tracing::info!("no embedding provider; running lexical strategies only");
        config.strategies.retain(|s| *s != conceptgraph::StrategyKind::Embedding);
    }

    let pipeline = match ConceptPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let pipeline = match attach_embedder(pipeline, embeddings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };
    match rt.block_on(pipeline.run(papers)) {
        Ok(output) if report_only => print_json(&output.report, pretty),
        Ok(output) => print_json(&output.to_document(), pretty),
        Err(PipelineError::NoConcepts { papers, report }) => {
            eprintln!("Error: no concepts could be extracted from {} papers", papers);
            print_json(&report, pretty);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[cfg(feature = "embeddings")]
fn attach_embedder(pipeline: ConceptPipeline, embeddings: bool) -> Result<ConceptPipeline, String> {
    if !embeddings {
        return Ok(pipeline);
    }
    let provider = conceptgraph::embedding::FastEmbedProvider::default_model().map_err(|e| e.to_string())?;
    Ok(pipeline.with_embedding_provider(std::sync::Arc::new(provider)))
}

#[cfg(not(feature = "embeddings"))]
fn attach_embedder(pipeline: ConceptPipeline, embeddings: bool) -> Result<ConceptPipeline, String> {
    if embeddings {
        return Err("built without the `embeddings` feature".into());
    }
    Ok(pipeline)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conceptgraph=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Extract {
            corpus,
            config,
            pretty,
            report_only,
            embeddings,
        } => cmd_extract(&corpus, config.as_deref(), pretty, report_only, embeddings),
        Commands::Config => match PipelineConfig::default().to_yaml() {
            Ok(yaml) => {
                print!("{}", yaml);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
