use crate::vis_common::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// UMAP (McInnes et al., 2018): brute-force kNN graph, fuzzy
/// simplicial set with binary-search bandwidths, and SGD layout with
/// negative sampling. Works on the raw cells × genes matrix.
pub struct Umap {
    dim: usize,
    n_neighbors: usize,
    min_dist: f32,
    spread: f32,
    n_epochs: usize,
    learning_rate: f32,
    negative_sample_rate: usize,
    seed: u64,
}

impl Umap {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            n_neighbors: 15,
            min_dist: 0.1,
            spread: 1.0,
            n_epochs: 200,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            seed: DEFAULT_SEED,
        }
    }

    pub fn n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = k;
        self
    }

    pub fn n_epochs(mut self, n: usize) -> Self {
        self.n_epochs = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run UMAP on the cells × genes matrix; returns cells × dim
    pub fn fit(&self, x_ng: &Mat) -> anyhow::Result<Mat> {
        let nn = x_ng.nrows();
        anyhow::ensure!(nn >= 3, "UMAP needs at least 3 cells, found {}", nn);

        let k = self.n_neighbors.min(nn - 1).max(1);

        let (knn_indices, knn_distances) = compute_knn(x_ng, k);
        let edges = fuzzy_simplicial_set(&knn_indices, &knn_distances, k);
        let y = self.optimize_layout(nn, &edges);
        Ok(y)
    }

    /// SGD over the fuzzy graph: attractive moves along edges sampled
    /// by weight, repulsive moves against random negative samples.
    fn optimize_layout(&self, nn: usize, edges: &[Edge]) -> Mat {
        let (a, b) = find_ab_params(self.spread, self.min_dist);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut y = Mat::from_fn(nn, self.dim, |_, _| rng.random_range(-10.0..10.0) * 0.01);

        let max_weight = edges.iter().map(|e| e.weight).fold(0.0_f32, f32::max);

        let pb = ProgressBar::new(self.n_epochs as u64);
        pb.set_style(
            ProgressStyle::with_template("UMAP  {bar:40} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for epoch in 0..self.n_epochs {
            let alpha = self.learning_rate * (1.0 - epoch as f32 / self.n_epochs as f32);
            if alpha < 1e-8 {
                break;
            }

            for edge in edges {
                // heavier edges are sampled more often
                let epochs_per_sample = if edge.weight > 0.0 {
                    max_weight / edge.weight
                } else {
                    f32::INFINITY
                };
                if (epoch as f32) % epochs_per_sample.max(1.0) >= 1.0 {
                    continue;
                }

                let (i, j) = (edge.i, edge.j);

                let mut d2 = 1e-8_f32;
                for kk in 0..self.dim {
                    let dy = y[(i, kk)] - y[(j, kk)];
                    d2 += dy * dy;
                }

                let attract = -2.0 * a * b * d2.powf(b - 1.0) / (1.0 + a * d2.powf(b));
                for kk in 0..self.dim {
                    let g = attract * (y[(i, kk)] - y[(j, kk)]);
                    y[(i, kk)] = (y[(i, kk)] + alpha * g).clamp(-10.0, 10.0);
                    y[(j, kk)] = (y[(j, kk)] - alpha * g).clamp(-10.0, 10.0);
                }

                for _ in 0..self.negative_sample_rate {
                    let other = rng.random_range(0..nn);
                    if other == i {
                        continue;
                    }

                    let mut d2_neg = 1e-8_f32;
                    for kk in 0..self.dim {
                        let dy = y[(i, kk)] - y[(other, kk)];
                        d2_neg += dy * dy;
                    }

                    let repel = 2.0 * b / ((0.001 + d2_neg) * (1.0 + a * d2_neg.powf(b)));
                    for kk in 0..self.dim {
                        let g = repel * (y[(i, kk)] - y[(other, kk)]);
                        y[(i, kk)] = (y[(i, kk)] + alpha * g).clamp(-10.0, 10.0);
                    }
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        y
    }
}

/// An undirected edge of the fuzzy simplicial set
struct Edge {
    i: usize,
    j: usize,
    weight: f32,
}

/// Max-heap entry keyed by distance so the farthest neighbour is evicted
struct Neighbor {
    index: usize,
    distance: f32,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Brute-force k-nearest neighbours over the rows, parallel over cells
fn compute_knn(x_ng: &Mat, k: usize) -> (Vec<Vec<usize>>, Vec<Vec<f32>>) {
    let nn = x_ng.nrows();

    let results: Vec<(Vec<usize>, Vec<f32>)> = (0..nn)
        .into_par_iter()
        .map(|i| {
            let xi = x_ng.row(i);
            let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);

            for j in 0..nn {
                if i == j {
                    continue;
                }
                let dist = (xi - x_ng.row(j)).norm();

                if heap.len() < k {
                    heap.push(Neighbor { index: j, distance: dist });
                } else if let Some(top) = heap.peek() {
                    if dist < top.distance {
                        heap.pop();
                        heap.push(Neighbor { index: j, distance: dist });
                    }
                }
            }

            let mut neighbors = heap.into_vec();
            neighbors.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(Ordering::Equal)
            });

            (
                neighbors.iter().map(|x| x.index).collect(),
                neighbors.iter().map(|x| x.distance).collect(),
            )
        })
        .collect();

    let mut knn_indices = Vec::with_capacity(nn);
    let mut knn_distances = Vec::with_capacity(nn);
    for (idx, dist) in results {
        knn_indices.push(idx);
        knn_distances.push(dist);
    }
    (knn_indices, knn_distances)
}

/// Per-point (rho, sigma) calibration and symmetrized edge weights:
/// w_sym = w + w' − w·w'
fn fuzzy_simplicial_set(
    knn_indices: &[Vec<usize>],
    knn_distances: &[Vec<f32>],
    k: usize,
) -> Vec<Edge> {
    let nn = knn_indices.len();
    let target = (k as f32).ln() / std::f32::consts::LN_2;

    let params: Vec<(f32, f32)> = (0..nn)
        .into_par_iter()
        .map(|i| {
            let dists = &knn_distances[i];
            let rho = dists.first().copied().unwrap_or(0.0).max(1e-12);

            let mut lo = 1e-8_f32;
            let mut hi = 1000.0_f32;
            let mut sigma = 1.0_f32;

            for _ in 0..64 {
                sigma = (lo + hi) / 2.0;
                let sum: f32 = dists
                    .iter()
                    .map(|&d| (-(d - rho).max(0.0) / sigma).exp())
                    .sum();
                if (sum - target).abs() < 1e-5 {
                    break;
                }
                if sum > target {
                    hi = sigma;
                } else {
                    lo = sigma;
                }
            }
            (rho, sigma)
        })
        .collect();

    let mut directed: HashMap<(usize, usize), f32> = HashMap::with_capacity(nn * k);
    for i in 0..nn {
        let (rho, sigma) = params[i];
        for (rank, (&j, &d)) in knn_indices[i].iter().zip(knn_distances[i].iter()).enumerate() {
            let w = if rank == 0 {
                1.0 // the nearest neighbour always gets full weight
            } else {
                (-(d - rho).max(0.0) / sigma.max(1e-12)).exp()
            };
            directed.insert((i, j), w);
        }
    }

    let mut symmetric: HashMap<(usize, usize), f32> = HashMap::with_capacity(directed.len());
    for (&(i, j), &w_ij) in &directed {
        let key = if i < j { (i, j) } else { (j, i) };
        let w_ji = directed.get(&(j, i)).copied().unwrap_or(0.0);
        let w_sym = w_ij + w_ji - w_ij * w_ji;
        symmetric
            .entry(key)
            .and_modify(|w| *w = w.max(w_sym))
            .or_insert(w_sym);
    }

    let mut edges: Vec<Edge> = symmetric
        .into_iter()
        .filter(|(_, w)| *w > 1e-8)
        .map(|((i, j), weight)| Edge { i, j, weight })
        .collect();

    // hash order is arbitrary; a fixed edge order keeps seeded runs reproducible
    edges.sort_by_key(|e| (e.i, e.j));
    edges
}

/// Fit the curve 1/(1 + a d^{2b}) to (spread, min_dist)
fn find_ab_params(spread: f32, min_dist: f32) -> (f32, f32) {
    let mut b = 1.0_f32;
    let a;

    if (spread - 1.0).abs() < 1e-6 {
        a = if min_dist > 0.0 {
            (2.0_f32.powf(2.0 * b) - 1.0) / min_dist.powf(2.0 * b)
        } else {
            1.0
        };
    } else {
        let mut lo = 0.1_f32;
        let mut hi = 5.0_f32;
        for _ in 0..64 {
            b = (lo + hi) / 2.0;
            let a_try = (2.0_f32.powf(2.0 * b) - 1.0) / spread.powf(2.0 * b);
            let val = 1.0 / (1.0 + a_try * min_dist.powf(2.0 * b));
            if val > 0.99 {
                hi = b;
            } else {
                lo = b;
            }
        }
        a = (2.0_f32.powf(2.0 * b) - 1.0) / spread.powf(2.0 * b);
    }

    (a.max(1e-8), b.max(0.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs(per: usize) -> Mat {
        Mat::from_fn(2 * per, 5, |i, j| {
            let offset = if i < per { 0.0 } else { 10.0 };
            offset + (i % per) as f32 * 0.01 + j as f32 * 0.002
        })
    }

    #[test]
    fn shapes_and_finiteness() {
        let x = two_blobs(5);
        for dim in [2, 3] {
            let y = Umap::new(dim)
                .n_neighbors(3)
                .n_epochs(50)
                .fit(&x)
                .unwrap();
            assert_eq!(y.nrows(), 10);
            assert_eq!(y.ncols(), dim);
            assert!(y.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn separates_two_blobs() {
        let per = 20;
        let x = two_blobs(per);
        let y = Umap::new(2).n_neighbors(5).n_epochs(200).fit(&x).unwrap();

        let centroid = |rows: std::ops::Range<usize>| -> (f32, f32) {
            let nn = rows.len() as f32;
            let mut cx = 0.0;
            let mut cy = 0.0;
            for i in rows {
                cx += y[(i, 0)];
                cy += y[(i, 1)];
            }
            (cx / nn, cy / nn)
        };

        let (ax, ay) = centroid(0..per);
        let (bx, by) = centroid(per..2 * per);
        let between = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
        assert!(between > 0.5, "blobs not separated: {}", between);
    }

    #[test]
    fn knn_orders_by_distance() {
        let x = Mat::from_row_slice(4, 1, &[0.0, 1.0, 3.0, 10.0]);
        let (idx, dist) = compute_knn(&x, 2);
        assert_eq!(idx[0], vec![1, 2]);
        assert!(dist[0][0] <= dist[0][1]);
        assert_eq!(idx[3], vec![2, 1]);
    }

    #[test]
    fn too_few_cells() {
        let x = Mat::zeros(2, 3);
        assert!(Umap::new(2).fit(&x).is_err());
    }
}
