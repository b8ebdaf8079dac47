//! Weighted PageRank by power iteration
//!
//! Shared by TextRank word scoring and the concept graph's importance rank.
//! Dangling mass is redistributed uniformly, so scores always sum to 1.

/// Outcome of a PageRank run
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankResult {
    /// One score per node, summing to 1 (empty graph: empty)
    pub scores: Vec<f64>,
    pub iterations: usize,
    /// L1 change of the final iteration
    pub delta: f64,
    /// False when `max_iterations` ran out before `delta <= tolerance`
    pub converged: bool,
}

/// PageRank parameters
#[derive(Debug, Clone, Copy)]
pub struct PageRank {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PageRank {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl PageRank {
    pub fn new(damping: f64, max_iterations: usize, tolerance: f64) -> Self {
        Self {
            damping,
            max_iterations,
            tolerance,
        }
    }

    /// Run over `n` nodes and directed weighted edges `(source, target, weight)`.
    ///
    /// Undirected graphs pass both directions. Non-positive weights and
    /// out-of-range indices are ignored.
    pub fn run(&self, n: usize, edges: &[(usize, usize, f64)]) -> PageRankResult {
        if n == 0 {
            return PageRankResult {
                scores: Vec::new(),
                iterations: 0,
                delta: 0.0,
                converged: true,
            };
        }

        let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut out_weight = vec![0.0_f64; n];
        for &(s, t, w) in edges {
            if s < n && t < n && w > 0.0 {
                incoming[t].push((s, w));
                out_weight[s] += w;
            }
        }

        let initial = 1.0 / n as f64;
        let mut scores = vec![initial; n];
        let mut new_scores = vec![0.0; n];
        let base = (1.0 - self.damping) / n as f64;
        let mut iterations = 0;
        let mut delta = f64::MAX;

        while iterations < self.max_iterations && delta > self.tolerance {
            let dangling: f64 = scores
                .iter()
                .enumerate()
                .filter(|(i, _)| out_weight[*i] == 0.0)
                .map(|(_, s)| s)
                .sum();

            for i in 0..n {
                let mut sum = dangling / n as f64;
                for &(j, w) in &incoming[i] {
                    sum += scores[j] * w / out_weight[j];
                }
                new_scores[i] = base + self.damping * sum;
            }

            delta = scores
                .iter()
                .zip(new_scores.iter())
                .map(|(old, new)| (old - new).abs())
                .sum();

            std::mem::swap(&mut scores, &mut new_scores);
            iterations += 1;
        }

        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            for s in &mut scores {
                *s /= total;
            }
        }

        PageRankResult {
            scores,
            iterations,
            delta,
            converged: delta <= self.tolerance,
        }
    }
}
