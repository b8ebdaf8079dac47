//! Invariants that hold for every published graph

mod common;

use common::{crypto_corpus, find, paper, quantum_pair, HashingEmbedder};
use conceptgraph::config::GraphConfig;
use conceptgraph::embedding::cosine_similarity;
use conceptgraph::provenance::RejectReason;
use conceptgraph::{
    ConceptGraph, ConceptId, ConceptPipeline, Direction, EdgeKind, GraphSnapshot, GraphState, PipelineConfig,
    PipelineOutput, TraverseQuery, UngroundedPolicy,
};
use std::collections::BTreeSet;
use std::sync::Arc;

async fn run(config: PipelineConfig) -> PipelineOutput {
    ConceptPipeline::new(config)
        .unwrap()
        .with_embedding_provider(Arc::new(HashingEmbedder::new()))
        .run(crypto_corpus())
        .await
        .unwrap()
}

#[tokio::test]
async fn every_concept_is_grounded_under_default_policy() {
    let output = run(PipelineConfig::default()).await;
    assert_eq!(output.graph.state(), GraphState::Queryable);
    for concept in output.graph.nodes() {
        assert!(concept.grounded, "{} ungrounded", concept.id);
        assert!(!concept.evidence.is_empty(), "{} has no evidence", concept.id);
        assert!(concept.evidence.len() <= 5);
        assert!(concept
            .evidence
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert!(concept.evidence.iter().all(|e| (0.0..=1.0).contains(&e.confidence)));
    }
}

#[tokio::test]
async fn hierarchy_levels_are_exact_and_acyclic() {
    let output = run(PipelineConfig::default()).await;
    let graph = &output.graph;

    let is_a = graph.edges_of_kind(EdgeKind::IsA);
    assert!(!is_a.is_empty());
    for edge in is_a {
        let parent = graph.node(&edge.source).unwrap();
        let child = graph.node(&edge.target).unwrap();
        assert_eq!(parent.level + 1, child.level, "{} -> {}", parent.id, child.id);
        assert!(child.parents.contains(&parent.id));
        assert!(parent.children.contains(&child.id));
    }
    assert!(graph.detect_cycles().is_empty());
    for concept in graph.nodes() {
        if concept.level == 0 {
            assert!(concept.parents.is_empty(), "{}", concept.id);
        } else {
            assert!(!concept.parents.is_empty() || !concept.children.is_empty(), "{}", concept.id);
        }
    }
}

fn reaches(graph: &ConceptGraph, from: &ConceptId, to: &ConceptId) -> bool {
    TraverseQuery::from(from.clone())
        .depth(graph.node_count())
        .direction(Direction::Outgoing)
        .with_kind(EdgeKind::IsA)
        .execute(graph)
        .all_nodes()
        .contains(&to)
}

#[tokio::test]
async fn hearst_edges_at_unequal_depths_are_kept() {
    let text = "Security mechanisms such as cryptographic primitives and access control. \
                Cryptographic primitives such as hash functions and digital signatures. \
                Authentication schemes such as digital signatures.";
    let output = ConceptPipeline::new(PipelineConfig::lexical_only())
        .unwrap()
        .run(vec![paper("layers", text)])
        .await
        .unwrap();
    let graph = &output.graph;

    let is_a: Vec<(&str, &str)> = graph
        .edges_of_kind(EdgeKind::IsA)
        .into_iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    for pair in [
        ("security mechanisms", "cryptographic primitives"),
        ("cryptographic primitives", "digital signatures"),
        ("authentication schemes", "digital signatures"),
    ] {
        assert!(is_a.contains(&pair), "missing {pair:?} in {is_a:?}");
    }
    for edge in graph.edges_of_kind(EdgeKind::IsA) {
        let (parent, child) = (graph.node(&edge.source).unwrap(), graph.node(&edge.target).unwrap());
        assert_eq!(parent.level + 1, child.level, "{} -> {}", parent.id, child.id);
    }
    assert_eq!(find(graph, "authentication schemes").unwrap().level, 1);
    assert_eq!(find(graph, "digital signatures").unwrap().level, 2);

    for rejected in &output.report.rejected_edges {
        assert_ne!(rejected.reason, RejectReason::LevelConflict, "{rejected:?}");
        if rejected.reason == RejectReason::LevelSkip {
            assert!(reaches(graph, &rejected.parent, &rejected.child), "{rejected:?}");
        }
    }
}

#[tokio::test]
async fn level_skips_are_only_transitively_implied_edges() {
    let output = run(PipelineConfig::default()).await;
    for rejected in &output.report.rejected_edges {
        if rejected.reason == RejectReason::LevelSkip {
            assert!(reaches(&output.graph, &rejected.parent, &rejected.child), "{rejected:?}");
        }
    }
}

#[tokio::test]
async fn merged_keys_are_pairwise_within_threshold() {
    let threshold = 0.6;
    let text = "The key exchange protocol is in use. The key exchange is in the protocol. \
                The exchange protocol is on the wire.";
    let output = ConceptPipeline::new(PipelineConfig::default().with_merge_threshold(threshold))
        .unwrap()
        .with_embedding_provider(Arc::new(HashingEmbedder::new()))
        .run(vec![paper("kex", text)])
        .await
        .unwrap();

    for concept in output.graph.nodes().iter().filter(|c| !c.synthetic) {
        let keys: Vec<&str> = std::iter::once(concept.id.as_str())
            .chain(concept.aliases.iter().map(String::as_str))
            .collect();
        for a in &keys {
            for b in &keys {
                let sim = cosine_similarity(&HashingEmbedder::vector(a), &HashingEmbedder::vector(b)) as f64;
                assert!(sim >= threshold - 1e-6, "{a} and {b} merged at cosine {sim}");
            }
        }
    }

    // "key exchange" ~ "key exchange protocol" ~ "exchange protocol", ends at 0.5
    let kex = find(&output.graph, "key exchange").unwrap();
    let proto = find(&output.graph, "exchange protocol").unwrap();
    assert_ne!(kex.id, proto.id);
}

#[tokio::test]
async fn reruns_are_deterministic() {
    let first = run(PipelineConfig::default()).await;
    let second = run(PipelineConfig::default()).await;

    let ids = |o: &PipelineOutput| o.graph.nodes().iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    for (a, b) in first.graph.nodes().iter().zip(second.graph.nodes()) {
        assert_eq!(a.frequency, b.frequency);
        assert!((a.relevance - b.relevance).abs() < 1e-12, "{}", a.id);
        assert_eq!(a.parents, b.parents);
    }

    let edges = |o: &PipelineOutput| {
        o.graph
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.kind))
            .collect::<BTreeSet<_>>()
    };
    assert_eq!(edges(&first), edges(&second));

    let (ra, rb) = (first.graph.ranking().unwrap(), second.graph.ranking().unwrap());
    for (id, score) in &ra.scores {
        assert!((score - rb.score(id)).abs() < 1e-9, "{id}");
    }
}

#[tokio::test]
async fn converged_importance_sums_to_one() {
    let output = run(PipelineConfig::default()).await;
    let ranking = output.graph.ranking().unwrap();
    let summary = output.report.ranking.as_ref().unwrap();
    assert_eq!(summary.converged, ranking.converged);
    if ranking.converged {
        assert!((ranking.total() - 1.0).abs() < 1e-6);
    }
}

#[tokio::test]
async fn associative_edges_are_symmetric_and_weighted() {
    let output = run(PipelineConfig::default()).await;
    let graph = &output.graph;
    for kind in [EdgeKind::RelatedTo, EdgeKind::CoOccursWith] {
        for edge in graph.edges_of_kind(kind) {
            assert!((0.0..=1.0).contains(&edge.weight));
            let back = graph
                .edges_of_kind(kind)
                .into_iter()
                .find(|e| e.source == edge.target && e.target == edge.source)
                .unwrap_or_else(|| panic!("{kind} {} -> {} has no reverse", edge.source, edge.target));
            assert_eq!(back.weight, edge.weight);
        }
    }
}

#[tokio::test]
async fn concept_list_respects_top_k() {
    let output = ConceptPipeline::new(PipelineConfig::lexical_only().with_top_k(5))
        .unwrap()
        .run(crypto_corpus())
        .await
        .unwrap();
    assert!(output.graph.nodes().iter().filter(|c| !c.synthetic).count() <= 5);
}

#[tokio::test]
async fn keep_ungrounded_policy_never_drops() {
    let config = PipelineConfig::lexical_only().with_ungrounded_policy(UngroundedPolicy::KeepUngrounded);
    let output = ConceptPipeline::new(config).unwrap().run(quantum_pair()).await.unwrap();
    assert!(output.report.dropped_ungrounded.is_empty());
    for concept in output.graph.nodes() {
        assert_eq!(concept.grounded, !concept.evidence.is_empty());
    }
}

#[tokio::test]
async fn published_graph_round_trips_through_json() {
    let output = run(PipelineConfig::default()).await;
    let snapshot = output.graph.snapshot();
    let json = snapshot.to_json(true).unwrap();

    let restored = GraphSnapshot::from_json(&json)
        .unwrap()
        .into_graph(GraphConfig::default())
        .unwrap();
    assert_eq!(restored.state(), GraphState::Queryable);
    assert_eq!(restored.snapshot(), snapshot);
}

#[tokio::test]
async fn embedding_calls_are_cached_within_a_run() {
    let provider = Arc::new(HashingEmbedder::new());
    let pipeline = ConceptPipeline::new(PipelineConfig::default())
        .unwrap()
        .with_embedding_provider(provider.clone());
    pipeline.run(crypto_corpus()).await.unwrap();
    let first = provider.texts();
    assert!(first > 0);

    pipeline.run(crypto_corpus()).await.unwrap();
    assert_eq!(provider.texts(), first);
}
