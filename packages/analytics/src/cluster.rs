//! DBSCAN hotspot clustering over incident coordinates.
//!
//! Coordinates are sampled with a fixed seed, standardized per axis, and
//! clustered with a grid-bucketed DBSCAN. Cluster centers are the
//! arithmetic means of the assigned (unscaled) points.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crime_lens_analytics_models::{ClusterCenter, ClusterResult};
use crime_lens_dataset_models::CrimeRecord;

use crate::rng::{Lcg, sample_without_replacement};

/// Below this many filtered rows, clustering is skipped entirely.
pub const MIN_CLUSTER_ROWS: usize = 100;

/// Maximum number of coordinate pairs fed to DBSCAN.
pub const MAX_SAMPLE_POINTS: usize = 15_000;

/// Seed for the coordinate sample, so one filter combination always
/// clusters the same points.
pub const SAMPLE_SEED: u64 = 42;

/// Neighborhood radius in standardized units, tuned for city-scale
/// coordinate density.
const EPS: f64 = 0.1;

/// Minimum neighborhood size (the point itself included) for a core
/// point.
const MIN_NEIGHBORS: usize = 30;

const NOISE: i64 = -1;
const UNCLASSIFIED: i64 = -2;

/// Clusters the filtered records' coordinates into spatial hotspots.
///
/// Fewer than [`MIN_CLUSTER_ROWS`] records short-circuits to an empty
/// result without running DBSCAN.
#[must_use]
pub fn cluster_hotspots(records: &[&CrimeRecord]) -> ClusterResult {
    if records.len() < MIN_CLUSTER_ROWS {
        return ClusterResult::default();
    }

    let coords: Vec<[f64; 2]> = records
        .iter()
        .map(|r| [r.latitude, r.longitude])
        .filter(|c| c[0].is_finite() && c[1].is_finite())
        .collect();

    let sampled: Vec<[f64; 2]> = if coords.len() > MAX_SAMPLE_POINTS {
        let mut rng = Lcg::new(SAMPLE_SEED);
        sample_without_replacement(coords.len(), MAX_SAMPLE_POINTS, &mut rng)
            .into_iter()
            .map(|i| coords[i])
            .collect()
    } else {
        coords
    };

    let scaled = standardize(&sampled);
    let labels = dbscan(&scaled, EPS, MIN_NEIGHBORS);

    aggregate(&sampled, &labels)
}

/// Scales each axis to zero mean and unit variance. A zero standard
/// deviation is treated as one.
fn standardize(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    if points.is_empty() {
        return Vec::new();
    }

    let mut means = [0.0f64; 2];
    for point in points {
        means[0] += point[0];
        means[1] += point[1];
    }
    means[0] /= n;
    means[1] /= n;

    let mut variances = [0.0f64; 2];
    for point in points {
        variances[0] += (point[0] - means[0]).powi(2);
        variances[1] += (point[1] - means[1]).powi(2);
    }
    let stds = variances.map(|v| {
        let std = (v / n).sqrt();
        if std > 0.0 { std } else { 1.0 }
    });

    points
        .iter()
        .map(|p| [(p[0] - means[0]) / stds[0], (p[1] - means[1]) / stds[1]])
        .collect()
}

/// Spatial hash over eps-sized cells so neighborhood queries only touch
/// the surrounding 3x3 block instead of every point.
struct CellGrid {
    cells: HashMap<(i64, i64), Vec<usize>>,
    eps: f64,
}

impl CellGrid {
    fn build(points: &[[f64; 2]], eps: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, point) in points.iter().enumerate() {
            cells.entry(Self::key(point, eps)).or_default().push(i);
        }
        Self { cells, eps }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn key(point: &[f64; 2], eps: f64) -> (i64, i64) {
        ((point[0] / eps).floor() as i64, (point[1] / eps).floor() as i64)
    }

    /// Indices within `eps` of `points[center]`, the center included.
    fn neighbors(&self, points: &[[f64; 2]], center: usize) -> Vec<usize> {
        let (cx, cy) = Self::key(&points[center], self.eps);
        let eps_sq = self.eps * self.eps;
        let mut found = Vec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &i in bucket {
                    let ddx = points[i][0] - points[center][0];
                    let ddy = points[i][1] - points[center][1];
                    if ddx * ddx + ddy * ddy <= eps_sq {
                        found.push(i);
                    }
                }
            }
        }
        found
    }
}

/// Density-based clustering. Returns one label per point: `>= 0` for a
/// cluster, [`NOISE`] for unassigned points.
fn dbscan(points: &[[f64; 2]], eps: f64, min_neighbors: usize) -> Vec<i64> {
    let grid = CellGrid::build(points, eps);
    let mut labels = vec![UNCLASSIFIED; points.len()];
    let mut cluster: i64 = 0;

    for i in 0..points.len() {
        if labels[i] != UNCLASSIFIED {
            continue;
        }

        let neighbors = grid.neighbors(points, i);
        if neighbors.len() < min_neighbors {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = cluster;
        let mut queue: VecDeque<usize> = neighbors.into_iter().collect();

        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                // Border point claimed by this cluster.
                labels[j] = cluster;
            }
            if labels[j] != UNCLASSIFIED {
                continue;
            }
            labels[j] = cluster;

            let expansion = grid.neighbors(points, j);
            if expansion.len() >= min_neighbors {
                queue.extend(expansion);
            }
        }

        cluster += 1;
    }

    labels
}

/// Builds the result: per-cluster counts and mean centers over the
/// unscaled coordinates.
fn aggregate(points: &[[f64; 2]], labels: &[i64]) -> ClusterResult {
    let mut sums: BTreeMap<i64, ([f64; 2], u64)> = BTreeMap::new();

    for (point, &label) in points.iter().zip(labels) {
        if label == NOISE {
            continue;
        }
        let entry = sums.entry(label).or_insert(([0.0, 0.0], 0));
        entry.0[0] += point[0];
        entry.0[1] += point[1];
        entry.1 += 1;
    }

    let cluster_counts: BTreeMap<i64, u64> =
        sums.iter().map(|(&id, &(_, count))| (id, count)).collect();

    let cluster_centers: Vec<ClusterCenter> = sums
        .into_iter()
        .map(|(cluster_id, (sum, count))| {
            #[allow(clippy::cast_precision_loss)]
            let denom = count as f64;
            ClusterCenter {
                cluster_id,
                lat: sum[0] / denom,
                lon: sum[1] / denom,
                count,
            }
        })
        .collect();

    ClusterResult {
        n_clusters: cluster_centers.len(),
        cluster_centers,
        cluster_counts,
    }
}
