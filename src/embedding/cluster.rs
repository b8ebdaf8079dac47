use super::cosine_similarity;

/// Average-linkage agglomerative clustering under cosine similarity.
///
/// Merges the most similar pair of clusters until no pair reaches
/// `min_similarity`. Ties go to the lowest index pair, so the result is
/// deterministic. Members are sorted and clusters are ordered by their
/// first member.
pub fn agglomerate(vectors: &[Vec<f32>], min_similarity: f64) -> Vec<Vec<usize>> {
    let n = vectors.len();
    let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
    let mut sim = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let s = cosine_similarity(&vectors[i], &vectors[j]) as f64;
            sim[i][j] = s;
            sim[j][i] = s;
        }
    }

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if members[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if members[j].is_none() {
                    continue;
                }
                if best.map_or(true, |(_, _, s)| sim[i][j] > s) {
                    best = Some((i, j, sim[i][j]));
                }
            }
        }

        let Some((a, b, s)) = best else { break };
        if s < min_similarity {
            break;
        }

        let size_a = members[a].as_ref().map_or(0, Vec::len) as f64;
        let size_b = members[b].as_ref().map_or(0, Vec::len) as f64;
        // Lance-Williams update for average linkage
        for k in 0..n {
            if k == a || k == b || members[k].is_none() {
                continue;
            }
            let merged = (size_a * sim[a][k] + size_b * sim[b][k]) / (size_a + size_b);
            sim[a][k] = merged;
            sim[k][a] = merged;
        }
        if let Some(taken) = members[b].take() {
            if let Some(target) = members[a].as_mut() {
                target.extend(taken);
            }
        }
    }

    let mut clusters: Vec<Vec<usize>> = members
        .into_iter()
        .flatten()
        .map(|mut m| {
            m.sort_unstable();
            m
        })
        .collect();
    clusters.sort_by_key(|m| m.first().copied().unwrap_or(usize::MAX));
    clusters
}

/// Component-wise mean of the member vectors.
pub fn centroid(members: &[usize], vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = members.first() else {
        return Vec::new();
    };
    let dim = vectors[*first].len();
    let mut sum = vec![0.0_f32; dim];
    for &m in members {
        for (acc, x) in sum.iter_mut().zip(vectors[m].iter()) {
            *acc += x;
        }
    }
    let count = members.len() as f32;
    sum.iter().map(|x| x / count).collect()
}

/// Member with the highest mean similarity to the rest of its cluster
/// (lowest index on ties).
pub fn most_central(members: &[usize], vectors: &[Vec<f32>]) -> Option<usize> {
    if members.len() <= 1 {
        return members.first().copied();
    }
    let mut best: Option<(usize, f64)> = None;
    for &m in members {
        let total: f64 = members
            .iter()
            .filter(|&&o| o != m)
            .map(|&o| cosine_similarity(&vectors[m], &vectors[o]) as f64)
            .sum();
        let mean = total / (members.len() - 1) as f64;
        if best.map_or(true, |(_, b)| mean > b) {
            best = Some((m, mean));
        }
    }
    best.map(|(m, _)| m)
}

/// Mean pairwise similarity inside a cluster; `None` for singletons.
pub fn cohesion(members: &[usize], vectors: &[Vec<f32>]) -> Option<f64> {
    if members.len() < 2 {
        return None;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            total += cosine_similarity(&vectors[a], &vectors[b]) as f64;
            pairs += 1;
        }
    }
    Some(total / pairs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.95, 0.05, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.97, 0.03],
            vec![0.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn groups_similar_vectors() {
        let clusters = agglomerate(&vectors(), 0.75);
        assert_eq!(clusters, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn high_threshold_keeps_singletons() {
        assert_eq!(agglomerate(&vectors(), 0.9999).len(), 5);
    }

    #[test]
    fn zero_threshold_merges_everything_reachable() {
        let clusters = agglomerate(&vectors(), 0.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn centroid_and_cohesion() {
        let v = vectors();
        assert_eq!(centroid(&[0, 2], &v), vec![0.5, 0.5, 0.0]);
        assert!(cohesion(&[0], &v).is_none());
        let c = cohesion(&[0, 1], &v).unwrap();
        assert!(c > 0.99 && c <= 1.0);
    }

    #[test]
    fn most_central_member() {
        let v = vec![vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 1.0]];
        assert_eq!(most_central(&[0, 1, 2], &v), Some(1));
        assert_eq!(most_central(&[2], &v), Some(2));
    }
}
