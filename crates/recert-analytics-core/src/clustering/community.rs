//! Graph-community partitioning over the access-overlap graph.
//!
//! Builds an undirected weighted graph with an edge wherever pairwise
//! proximity clears the configured floor, then runs seeded weighted label
//! propagation. Nodes with no edges at all have no community and are
//! labeled [`NOISE`].

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::ClusteringConfig;
use crate::proximity::ProximityMatrix;

use super::error::ClusterError;
use super::partition::{Partition, NOISE};

pub fn partition(
    matrix: &ProximityMatrix,
    config: &ClusteringConfig,
) -> Result<Partition, ClusterError> {
    let n = matrix.len();
    if n < 2 {
        return Err(ClusterError::insufficient_population(2, n));
    }

    // Adjacency lists over the proximity floor.
    let mut edges: Vec<Vec<(usize, f32)>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            let w = matrix.get(i, j);
            if w >= config.community_min_edge_weight {
                edges[i].push((j, w));
                edges[j].push((i, w));
            }
        }
    }

    let mut labels: Vec<i32> = (0..n as i32).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..n).collect();

    for _ in 0..config.max_iterations {
        order.shuffle(&mut rng);
        let mut changed = false;

        for &i in &order {
            if edges[i].is_empty() {
                continue;
            }
            // Adopt the neighbor label with the greatest total edge weight;
            // ties go to the smallest label.
            let mut weight_by_label: Vec<(i32, f32)> = Vec::new();
            for &(j, w) in &edges[i] {
                match weight_by_label.iter_mut().find(|(l, _)| *l == labels[j]) {
                    Some((_, total)) => *total += w,
                    None => weight_by_label.push((labels[j], w)),
                }
            }
            let mut best_label = labels[i];
            let mut best_weight = f32::NEG_INFINITY;
            for &(label, weight) in &weight_by_label {
                if weight > best_weight || (weight == best_weight && label < best_label) {
                    best_weight = weight;
                    best_label = label;
                }
            }
            if best_label != labels[i] {
                labels[i] = best_label;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    // Compact labels into 0..k in first-occurrence order; isolated nodes
    // become noise.
    let mut compact: Vec<i32> = Vec::new();
    let mut out = vec![NOISE; n];
    for i in 0..n {
        if edges[i].is_empty() {
            continue;
        }
        let label = labels[i];
        let id = match compact.iter().position(|&l| l == label) {
            Some(pos) => pos,
            None => {
                compact.push(label);
                compact.len() - 1
            }
        };
        out[i] = id as i32;
    }

    let partition = Partition::new(out);
    debug!(
        communities = partition.cluster_count(),
        isolated = partition.noise_count(),
        "community partitioning complete"
    );
    Ok(partition)
}
