use super::embedding::EmbeddingStrategy;
use super::rule_based::RuleBasedStrategy;
use super::statistical::StatisticalStrategy;
use super::types::{CorpusContext, ExtractionError, ExtractionResult};
use crate::config::PipelineConfig;
use crate::embedding::EmbeddingPool;
use crate::model::{Paper, StrategyKind};
use std::time::Instant;

/// The closed set of extraction strategies
///
/// Built once from configuration; each variant owns its settings. Cloning is
/// cheap enough to hand one copy to every per-paper task.
#[derive(Clone)]
pub enum ExtractionStrategy {
    RuleBased(RuleBasedStrategy),
    Statistical(StatisticalStrategy),
    Embedding(EmbeddingStrategy),
}

impl ExtractionStrategy {
    /// Instantiate the strategies enabled in `config`, in configuration order.
    pub fn from_config(config: &PipelineConfig, pool: Option<EmbeddingPool>) -> Vec<Self> {
        let max_words = config.rule_based.max_phrase_words;
        let mut out: Vec<Self> = Vec::new();
        for kind in &config.strategies {
            if out.iter().any(|s| s.kind() == *kind) {
                continue;
            }
            out.push(match kind {
                StrategyKind::RuleBased => {
                    Self::RuleBased(RuleBasedStrategy::new(config.rule_based.clone()))
                }
                StrategyKind::Statistical => Self::Statistical(StatisticalStrategy::new(
                    config.statistical.clone(),
                    max_words,
                )),
                StrategyKind::Embedding => Self::Embedding(EmbeddingStrategy::new(
                    config.embedding.clone(),
                    max_words,
                    pool.clone(),
                )),
            });
        }
        out
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::RuleBased(_) => StrategyKind::RuleBased,
            Self::Statistical(_) => StrategyKind::Statistical,
            Self::Embedding(_) => StrategyKind::Embedding,
        }
    }

    /// Run on one paper.
    ///
    /// Papers shorter than `min_text_length` characters give an empty,
    /// successful result flagged `input_too_short`.
    pub async fn extract(
        &self,
        paper: &Paper,
        corpus: &CorpusContext,
        min_text_length: usize,
    ) -> Result<ExtractionResult, ExtractionError> {
        let started = Instant::now();
        if let Err(ExtractionError::InputTooShort { .. }) = check_length(paper, min_text_length) {
            return Ok(ExtractionResult::too_short(self.kind(), paper.id.clone()));
        }

        let mut result = match self {
            Self::RuleBased(s) => s.extract(paper),
            Self::Statistical(s) => s.extract(paper, corpus),
            Self::Embedding(s) => s.extract(paper, corpus).await?,
        };
        result.metadata.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }
}

/// Reject bodies below the minimum length (whitespace-trimmed, in chars).
pub fn check_length(paper: &Paper, min_text_length: usize) -> Result<(), ExtractionError> {
    let len = paper.body().trim().chars().count();
    if len == 0 || len < min_text_length {
        return Err(ExtractionError::InputTooShort {
            len,
            min: min_text_length,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn short_input_is_empty_success() {
        let config = PipelineConfig::default();
        let strategies = ExtractionStrategy::from_config(&config, None);
        let paper = Paper::new("p", "", "Too short.");
        for s in &strategies {
            let result = s.extract(&paper, &CorpusContext::default(), 50).await.unwrap();
            assert!(result.candidates.is_empty());
            assert!(result.metadata.input_too_short);
        }
    }

    #[test]
    fn from_config_respects_selection_and_order() {
        let config = PipelineConfig::default().with_strategies(vec![
            StrategyKind::Statistical,
            StrategyKind::RuleBased,
            StrategyKind::Statistical,
        ]);
        let kinds: Vec<_> = ExtractionStrategy::from_config(&config, None)
            .iter()
            .map(ExtractionStrategy::kind)
            .collect();
        assert_eq!(kinds, vec![StrategyKind::Statistical, StrategyKind::RuleBased]);
    }

    #[test]
    fn check_length_counts_trimmed_chars() {
        let paper = Paper::new("p", "", "   ");
        assert!(matches!(
            check_length(&paper, 50),
            Err(ExtractionError::InputTooShort { len: 0, min: 50 })
        ));
        let paper = Paper::new("p", "", "x".repeat(50));
        assert!(check_length(&paper, 50).is_ok());
    }
}
