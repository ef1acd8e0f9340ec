//! Density-based partitioning (DBSCAN) with explicit noise labeling.
//!
//! Noise points get [`NOISE`] and therefore no peers; the ensemble treats
//! that as an outlier verdict rather than an error. Expansion scans indices
//! in ascending order, so the result is deterministic without a seed.

use tracing::debug;

use crate::config::ClusteringConfig;
use crate::proximity::ProximityMatrix;

use super::error::ClusterError;
use super::partition::{Partition, NOISE};

const UNVISITED: i32 = -2;

pub fn partition(
    matrix: &ProximityMatrix,
    config: &ClusteringConfig,
) -> Result<Partition, ClusterError> {
    if config.dbscan_eps <= 0.0 {
        return Err(ClusterError::invalid_parameter("dbscan_eps must be positive"));
    }
    let n = matrix.len();
    if n < 2 {
        return Err(ClusterError::insufficient_population(2, n));
    }

    let mut labels = vec![UNVISITED; n];
    let mut cluster = 0i32;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        let seeds = neighborhood(matrix, i, config.dbscan_eps);
        // The point itself counts toward the density requirement.
        if seeds.len() + 1 < config.dbscan_min_samples {
            labels[i] = NOISE;
            continue;
        }

        labels[i] = cluster;
        let mut frontier = seeds;
        let mut cursor = 0;
        while cursor < frontier.len() {
            let j = frontier[cursor];
            cursor += 1;

            if labels[j] == NOISE {
                // Border point reachable from a core point.
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;

            let reachable = neighborhood(matrix, j, config.dbscan_eps);
            if reachable.len() + 1 >= config.dbscan_min_samples {
                frontier.extend(reachable);
            }
        }
        cluster += 1;
    }

    let partition = Partition::new(labels);
    debug!(
        clusters = partition.cluster_count(),
        outliers = partition.noise_count(),
        "density partitioning complete"
    );
    Ok(partition)
}

/// Indices within eps of i in distance space, excluding i.
fn neighborhood(matrix: &ProximityMatrix, i: usize, eps: f32) -> Vec<usize> {
    (0..matrix.len())
        .filter(|&j| j != i && matrix.distance(i, j) <= eps)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdentityId;

    fn matrix_with_outlier() -> ProximityMatrix {
        // emp_0..emp_4 form a dense block; emp_5 is far from everyone.
        let ids: Vec<IdentityId> = (0..6).map(|i| IdentityId::new(format!("emp_{i}"))).collect();
        let mut m = ProximityMatrix::new(ids);
        for i in 0..5 {
            for j in (i + 1)..5 {
                m.set(i, j, 0.9);
            }
        }
        m
    }

    #[test]
    fn test_outlier_labeled_noise() {
        let p = partition(&matrix_with_outlier(), &ClusteringConfig::default()).unwrap();
        assert_eq!(p.cluster_count(), 1);
        assert!(p.is_noise(5), "isolated identity must be noise");
        assert!(p.peers_of(5).is_empty(), "noise has no peers");
        assert_eq!(p.peers_of(0).len(), 4);
        println!("[PASS] test_outlier_labeled_noise");
    }

    #[test]
    fn test_sparse_population_all_noise() {
        let ids: Vec<IdentityId> = (0..4).map(|i| IdentityId::new(format!("emp_{i}"))).collect();
        // Identity matrix: everyone at distance 1.0 from everyone else.
        let p = partition(&ProximityMatrix::new(ids), &ClusteringConfig::default()).unwrap();
        assert_eq!(p.noise_count(), 4);
        assert!(!p.is_usable());
    }

    #[test]
    fn test_invalid_eps_rejected() {
        let mut config = ClusteringConfig::default();
        config.dbscan_eps = 0.0;
        let err = partition(&matrix_with_outlier(), &config).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidParameter(_)));
    }
}
