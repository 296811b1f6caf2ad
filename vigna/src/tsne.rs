use crate::vis_common::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use table_util::mat_ops::MatOps;

/// t-SNE with an explicit Kullback-Leibler gradient, perplexity
/// calibration by binary search, early exaggeration, and momentum
/// updates. Works on the raw cells × genes matrix.
pub struct TSne {
    dim: usize,
    perplexity: f32,
    learning_rate: f32,
    momentum: f32,
    n_iter: usize,
    early_exaggeration: f32,
    early_exaggeration_iter: usize,
    seed: u64,
}

impl TSne {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            perplexity: 30.0,
            learning_rate: 200.0,
            momentum: 0.8,
            n_iter: 1000,
            early_exaggeration: 4.0,
            early_exaggeration_iter: 250,
            seed: DEFAULT_SEED,
        }
    }

    pub fn perplexity(mut self, p: f32) -> Self {
        self.perplexity = p;
        self
    }

    pub fn n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run t-SNE on the cells × genes matrix; returns cells × dim
    pub fn fit(&self, x_ng: &Mat) -> anyhow::Result<Mat> {
        let nn = x_ng.nrows();
        anyhow::ensure!(nn >= 3, "t-SNE needs at least 3 cells, found {}", nn);

        let distances = pairwise_distances(x_ng);

        // perplexity cannot exceed the number of neighbours
        let perplexity = self.perplexity.min((nn as f32 - 1.0) / 3.0).max(1.0);
        let p = self.joint_probabilities(&distances, nn, perplexity);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut y = Mat::from_fn(nn, self.dim, |_, _| rng.random::<f32>() * 0.01);
        let mut velocity = Mat::zeros(nn, self.dim);

        let pb = ProgressBar::new(self.n_iter as u64);
        pb.set_style(ProgressStyle::with_template(
            "t-SNE {bar:40} {pos}/{len}",
        )?);

        for iter in 0..self.n_iter {
            let p_mult = if iter < self.early_exaggeration_iter {
                self.early_exaggeration
            } else {
                1.0
            };

            let grad = kl_gradient(&y, &p, p_mult);

            velocity = velocity * self.momentum - grad * self.learning_rate;
            y += &velocity;

            // keep the embedding centred at the origin
            y.centre_columns_inplace();
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(y)
    }

    /// Symmetrized joint probabilities from the distance matrix, with a
    /// per-point bandwidth calibrated to the target perplexity.
    fn joint_probabilities(&self, distances: &[f32], nn: usize, perplexity: f32) -> Mat {
        let target_entropy = perplexity.ln();
        let mut p = Mat::zeros(nn, nn);

        for i in 0..nn {
            let sigma = search_sigma(i, distances, nn, target_entropy);

            let mut row_sum = 0.0_f32;
            for j in 0..nn {
                if i != j {
                    let d = distances[i * nn + j];
                    let val = (-d * d / (2.0 * sigma * sigma)).exp();
                    p[(i, j)] = val;
                    row_sum += val;
                }
            }
            if row_sum > 1e-10 {
                for j in 0..nn {
                    p[(i, j)] /= row_sum;
                }
            }
        }

        // symmetrize and floor for numerical stability
        let scale = 2.0 * nn as f32;
        let mut p_sym = Mat::zeros(nn, nn);
        for i in 0..nn {
            for j in 0..nn {
                p_sym[(i, j)] = ((p[(i, j)] + p[(j, i)]) / scale).max(1e-12);
            }
        }
        p_sym
    }
}

/// Dense Euclidean distance matrix over the rows, in row-major order
fn pairwise_distances(x_ng: &Mat) -> Vec<f32> {
    let nn = x_ng.nrows();
    (0..nn)
        .into_par_iter()
        .map(|i| {
            let xi = x_ng.row(i);
            (0..nn)
                .map(|j| if i == j { 0.0 } else { (xi - x_ng.row(j)).norm() })
                .collect::<Vec<f32>>()
        })
        .flatten()
        .collect()
}

/// Binary search for the bandwidth matching the target entropy
fn search_sigma(i: usize, distances: &[f32], nn: usize, target: f32) -> f32 {
    let mut lo = 1e-10_f32;
    let mut hi = 1e4_f32;
    for _ in 0..50 {
        let mid = (lo + hi) / 2.0;
        if row_entropy(i, distances, nn, mid) > target {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Shannon entropy of the conditional distribution induced by `sigma`
fn row_entropy(i: usize, distances: &[f32], nn: usize, sigma: f32) -> f32 {
    let mut probs = vec![0.0_f32; nn];
    let mut sum = 0.0_f32;

    for j in 0..nn {
        if i != j {
            let d = distances[i * nn + j];
            probs[j] = (-d * d / (2.0 * sigma * sigma)).exp();
            sum += probs[j];
        }
    }

    if sum < 1e-10 {
        return 0.0;
    }

    let mut entropy = 0.0_f32;
    for j in 0..nn {
        if i != j && probs[j] > 0.0 {
            let pj = probs[j] / sum;
            entropy -= pj * pj.ln();
        }
    }
    entropy
}

///
/// Gradient of KL(P || Q) with the Student-t kernel in the embedding:
///
/// dC/dy_i = 4 Σ_j (p_ij − q_ij) w_ij (y_i − y_j),  w_ij = 1/(1 + |y_i − y_j|²)
///
fn kl_gradient(y: &Mat, p: &Mat, p_mult: f32) -> Mat {
    let nn = y.nrows();
    let dim = y.ncols();

    // unnormalized Student-t weights and their total
    let mut w = Mat::zeros(nn, nn);
    let mut w_sum = 0.0_f32;
    for i in 0..nn {
        for j in 0..nn {
            if i != j {
                let d2 = (y.row(i) - y.row(j)).norm_squared();
                w[(i, j)] = 1.0 / (1.0 + d2);
                w_sum += w[(i, j)];
            }
        }
    }
    let w_sum = w_sum.max(1e-12);

    let rows: Vec<Vec<f32>> = (0..nn)
        .into_par_iter()
        .map(|i| {
            let mut grad_i = vec![0.0_f32; dim];
            for j in 0..nn {
                if i == j {
                    continue;
                }
                let q_ij = (w[(i, j)] / w_sum).max(1e-12);
                let coeff = 4.0 * (p[(i, j)] * p_mult - q_ij) * w[(i, j)];
                for k in 0..dim {
                    grad_i[k] += coeff * (y[(i, k)] - y[(j, k)]);
                }
            }
            grad_i
        })
        .collect();

    Mat::from_fn(nn, dim, |i, k| rows[i][k])
}
