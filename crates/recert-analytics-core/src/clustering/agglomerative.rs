//! Hierarchical agglomerative partitioning with average linkage.
//!
//! Fully deterministic: merge ties break on the lowest cluster indices, and
//! the cut level is chosen by silhouette over the merge sequence.

use tracing::debug;

use crate::config::ClusteringConfig;
use crate::proximity::ProximityMatrix;

use super::error::ClusterError;
use super::partition::Partition;
use super::silhouette::mean_silhouette;

pub fn partition(
    matrix: &ProximityMatrix,
    config: &ClusteringConfig,
) -> Result<Partition, ClusterError> {
    let n = matrix.len();
    if n < 2 {
        return Err(ClusterError::insufficient_population(2, n));
    }

    let max_k = config
        .max_clusters
        .min(n / config.min_cluster_size.max(1))
        .max(2)
        .min(n);

    // Start from singletons and merge the closest pair until two clusters
    // remain, snapshotting every level within the candidate k range.
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut candidates: Vec<Partition> = Vec::new();
    snapshot_if_candidate(&clusters, max_k, n, &mut candidates);

    while clusters.len() > 2 {
        let (a, b) = closest_pair(matrix, &clusters);
        let merged = clusters.remove(b);
        clusters[a].extend(merged);
        clusters[a].sort_unstable();
        snapshot_if_candidate(&clusters, max_k, n, &mut candidates);
    }

    let mut best: Option<(Partition, f32)> = None;
    for candidate in candidates {
        if let Some(score) = mean_silhouette(matrix, &candidate) {
            let better = match &best {
                Some((_, best_score)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((candidate, score));
            }
        }
    }

    match best {
        Some((partition, score)) => {
            debug!(
                k = partition.cluster_count(),
                silhouette = score,
                "agglomerative cut selected"
            );
            Ok(partition)
        }
        None => Err(ClusterError::DegeneratePartition(
            "no cut level produced two scoreable clusters".to_string(),
        )),
    }
}

fn snapshot_if_candidate(
    clusters: &[Vec<usize>],
    max_k: usize,
    n: usize,
    out: &mut Vec<Partition>,
) {
    let k = clusters.len();
    if !(2..=max_k).contains(&k) {
        return;
    }
    let mut labels = vec![0i32; n];
    for (cluster, members) in clusters.iter().enumerate() {
        for &i in members {
            labels[i] = cluster as i32;
        }
    }
    out.push(Partition::new(labels));
}

/// Pair of cluster indices with minimum average-linkage distance; ties go
/// to the lexicographically smallest pair.
fn closest_pair(matrix: &ProximityMatrix, clusters: &[Vec<usize>]) -> (usize, usize) {
    let mut best = (0usize, 1usize);
    let mut best_dist = f32::INFINITY;
    for a in 0..clusters.len() {
        for b in (a + 1)..clusters.len() {
            let d = average_linkage(matrix, &clusters[a], &clusters[b]);
            if d < best_dist {
                best_dist = d;
                best = (a, b);
            }
        }
    }
    best
}

fn average_linkage(matrix: &ProximityMatrix, a: &[usize], b: &[usize]) -> f32 {
    let mut sum = 0.0;
    for &i in a {
        for &j in b {
            sum += matrix.distance(i, j);
        }
    }
    sum / (a.len() * b.len()) as f32
}
