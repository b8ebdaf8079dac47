use crate::config::StatisticalConfig;
use crate::extraction::types::TopicModel;
use crate::model::PaperId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Fit LDA by collapsed Gibbs sampling.
///
/// `documents` pairs each paper with its content-word sequence. Words shorter
/// than three letters are ignored. The same seed and input always produce the
/// same model.
pub fn fit(documents: &[(PaperId, Vec<String>)], config: &StatisticalConfig, seed: u64) -> TopicModel {
    let k = config.num_topics.max(1);

    let mut vocab: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, words) in documents {
        for w in words.iter().filter(|w| w.chars().count() >= 3) {
            vocab.insert(w.as_str(), 0);
        }
    }
    for (i, id) in vocab.values_mut().enumerate() {
        *id = i;
    }
    let v = vocab.len();
    if v == 0 {
        return TopicModel::default();
    }
    let terms: Vec<&str> = vocab.keys().copied().collect();

    let docs: Vec<Vec<usize>> = documents
        .iter()
        .map(|(_, words)| words.iter().filter_map(|w| vocab.get(w.as_str()).copied()).collect())
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut doc_topic = vec![vec![0usize; k]; docs.len()];
    let mut topic_word = vec![vec![0usize; v]; k];
    let mut topic_total = vec![0usize; k];
    let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(docs.len());

    for (d, doc) in docs.iter().enumerate() {
        let mut z = Vec::with_capacity(doc.len());
        for &w in doc {
            let t = rng.gen_range(0..k);
            z.push(t);
            doc_topic[d][t] += 1;
            topic_word[t][w] += 1;
            topic_total[t] += 1;
        }
        assignments.push(z);
    }

    let alpha = config.alpha;
    let beta = config.beta;
    let v_beta = v as f64 * beta;
    let mut weights = vec![0.0_f64; k];

    for _ in 0..config.gibbs_sweeps {
        for (d, doc) in docs.iter().enumerate() {
            for (i, &w) in doc.iter().enumerate() {
                let old = assignments[d][i];
                doc_topic[d][old] -= 1;
                topic_word[old][w] -= 1;
                topic_total[old] -= 1;

                let mut total = 0.0;
                for t in 0..k {
                    let p = (doc_topic[d][t] as f64 + alpha) * (topic_word[t][w] as f64 + beta)
                        / (topic_total[t] as f64 + v_beta);
                    total += p;
                    weights[t] = total;
                }
                let draw = rng.gen::<f64>() * total;
                let new = weights.iter().position(|&c| draw < c).unwrap_or(k - 1);

                assignments[d][i] = new;
                doc_topic[d][new] += 1;
                topic_word[new][w] += 1;
                topic_total[new] += 1;
            }
        }
    }

    let topics = (0..k)
        .map(|t| {
            let denom = topic_total[t] as f64 + v_beta;
            let mut phi: Vec<(usize, f64)> = (0..v)
                .filter(|&w| topic_word[t][w] > 0)
                .map(|w| (w, (topic_word[t][w] as f64 + beta) / denom))
                .collect();
            phi.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| terms[a.0].cmp(terms[b.0])));
            phi.truncate(config.topic_terms);
            let best = phi.first().map_or(1.0, |p| p.1);
            phi.into_iter()
                .map(|(w, p)| (terms[w].to_string(), p / best))
                .collect()
        })
        .collect();

    let paper_topics = documents
        .iter()
        .zip(doc_topic.iter())
        .map(|((id, _), counts)| {
            let n: usize = counts.iter().sum();
            let shares = if n == 0 {
                vec![0.0; k]
            } else {
                counts.iter().map(|&c| c as f64 / n as f64).collect()
            };
            (id.clone(), shares)
        })
        .collect();

    TopicModel {
        topics,
        paper_topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<(PaperId, Vec<String>)> {
        let doc = |id: &str, text: &str| {
            (
                PaperId::new(id),
                text.split_whitespace().map(str::to_string).collect(),
            )
        };
        vec![
            doc("a", "lattice cipher lattice cipher lattice key key cipher"),
            doc("b", "protein folding protein enzyme folding enzyme protein"),
            doc("c", "lattice key cipher cipher lattice key"),
        ]
    }

    fn config() -> StatisticalConfig {
        StatisticalConfig {
            num_topics: 2,
            topic_terms: 3,
            ..Default::default()
        }
    }

    #[test]
    fn same_seed_same_model() {
        let a = fit(&corpus(), &config(), 7);
        let b = fit(&corpus(), &config(), 7);
        assert_eq!(a, b);
    }

    #[test]
    fn topic_weights_are_normalized() {
        let model = fit(&corpus(), &config(), 1);
        assert_eq!(model.topics.len(), 2);
        for topic in &model.topics {
            assert!(topic.len() <= 3);
            if let Some(first) = topic.first() {
                assert!((first.1 - 1.0).abs() < 1e-12);
            }
            assert!(topic.iter().all(|(_, w)| *w > 0.0 && *w <= 1.0));
        }
    }

    #[test]
    fn paper_shares_sum_to_one() {
        let model = fit(&corpus(), &config(), 3);
        for shares in model.paper_topics.values() {
            let sum: f64 = shares.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_vocabulary_gives_empty_model() {
        let docs = vec![(PaperId::new("x"), vec!["a".to_string(), "of".to_string()])];
        assert_eq!(fit(&docs, &config(), 1), TopicModel::default());
    }
}
