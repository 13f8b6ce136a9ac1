//! Lloyd's k-means over colour samples, seeded with k-means++.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Termination criteria and cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    pub clusters: usize,
    pub max_iterations: usize,
    /// Stop once no centre moves further than this
    pub epsilon: f32,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            clusters: 1,
            max_iterations: 10,
            epsilon: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Clustering {
    /// One centre per row
    pub centers: Array2<f32>,
    /// Cluster index of every sample
    pub labels: Vec<usize>,
}

impl Clustering {
    /// Centre of the most populated cluster.
    pub fn dominant(&self) -> Array1<f32> {
        let mut counts = vec![0usize; self.centers.nrows()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        let best = counts
            .iter()
            .enumerate()
            .max_by_key(|(i, count)| (**count, std::cmp::Reverse(*i)))
            .map_or(0, |(i, _)| i);
        self.centers.row(best).to_owned()
    }
}

fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(sample: ArrayView1<f32>, centers: &Array2<f32>) -> (usize, f32) {
    centers
        .outer_iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(sample, c)))
        .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn seed_centers<R: Rng>(samples: ArrayView2<f32>, k: usize, rng: &mut R) -> Array2<f32> {
    let n = samples.nrows();
    let mut centers = Array2::zeros((k, samples.ncols()));
    centers.row_mut(0).assign(&samples.row(rng.gen_range(0..n)));

    for c in 1..k {
        let chosen = centers.slice(ndarray::s![..c, ..]).to_owned();
        let weights: Vec<f32> = samples.outer_iter().map(|s| nearest(s, &chosen).1).collect();
        let total: f32 = weights.iter().sum();

        let pick = if total > 0.0 {
            let mut target = rng.r#gen::<f32>() * total;
            weights
                .iter()
                .position(|w| {
                    target -= w;
                    target <= 0.0
                })
                .unwrap_or(n - 1)
        } else {
            rng.gen_range(0..n)
        };
        centers.row_mut(c).assign(&samples.row(pick));
    }
    centers
}

/// Cluster `samples` (one row per sample) into `params.clusters` groups.
pub fn kmeans<R: Rng>(samples: ArrayView2<f32>, params: &KMeansParams, rng: &mut R) -> Result<Clustering, ClusterError> {
    let n = samples.nrows();
    let k = params.clusters;
    if k == 0 || n < k {
        return Err(ClusterError::TooFewSamples {
            samples: n,
            clusters: k,
        });
    }

    let mut centers = seed_centers(samples, k, rng);
    let mut labels = vec![0usize; n];

    for _ in 0..params.max_iterations.max(1) {
        for (label, sample) in labels.iter_mut().zip(samples.outer_iter()) {
            *label = nearest(sample, &centers).0;
        }

        let mut sums = Array2::<f32>::zeros(centers.raw_dim());
        let mut counts = vec![0usize; k];
        for (&label, sample) in labels.iter().zip(samples.outer_iter()) {
            let mut row = sums.row_mut(label);
            row += &sample;
            counts[label] += 1;
        }

        let mut shift = 0.0_f32;
        for (c, count) in counts.iter().enumerate() {
            // An empty cluster keeps its previous centre.
            if *count == 0 {
                continue;
            }
            let updated = sums.row(c).mapv(|v| v / *count as f32);
            if updated.iter().any(|v| !v.is_finite()) {
                return Err(ClusterError::NonFinite);
            }
            shift = shift.max(squared_distance(updated.view(), centers.row(c)).sqrt());
            centers.row_mut(c).assign(&updated);
        }

        if shift <= params.epsilon {
            break;
        }
    }

    Ok(Clustering { centers, labels })
}

/// Arithmetic mean of the samples, `None` when there are none.
pub fn mean_color(samples: ArrayView2<f32>) -> Option<[f32; 3]> {
    let mean = samples.mean_axis(Axis(0))?;
    if mean.len() != 3 || mean.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some([mean[0], mean[1], mean[2]])
}
