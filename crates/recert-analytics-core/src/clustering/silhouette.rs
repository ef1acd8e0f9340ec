//! Mean silhouette coefficient over a precomputed distance matrix.
//!
//! Used by the partitioning algorithms to pick a cluster count when none is
//! configured.

use crate::proximity::ProximityMatrix;

use super::partition::Partition;

/// Mean silhouette over all non-noise points, in [-1, 1].
///
/// Returns None when the partition has fewer than two clusters, so callers
/// can skip degenerate candidates during auto-k selection.
pub fn mean_silhouette(matrix: &ProximityMatrix, partition: &Partition) -> Option<f32> {
    if partition.cluster_count() < 2 {
        return None;
    }

    let n = partition.len();
    let mut sum = 0.0;
    let mut count = 0u32;

    for i in 0..n {
        if partition.is_noise(i) {
            continue;
        }
        let own = partition.label_of(i);

        // a(i): mean distance to own cluster.
        let mut intra_sum = 0.0;
        let mut intra_count = 0u32;
        // b(i): min over other clusters of mean distance.
        let mut inter: Vec<(i32, f32, u32)> = Vec::new();

        for j in 0..n {
            if j == i || partition.is_noise(j) {
                continue;
            }
            let d = matrix.distance(i, j);
            let label = partition.label_of(j);
            if label == own {
                intra_sum += d;
                intra_count += 1;
            } else {
                match inter.iter_mut().find(|(l, _, _)| *l == label) {
                    Some((_, s, c)) => {
                        *s += d;
                        *c += 1;
                    }
                    None => inter.push((label, d, 1)),
                }
            }
        }

        // Singleton clusters contribute 0 by convention.
        if intra_count == 0 {
            count += 1;
            continue;
        }

        let a = intra_sum / intra_count as f32;
        let b = inter
            .iter()
            .map(|(_, s, c)| s / *c as f32)
            .fold(f32::INFINITY, f32::min);
        if !b.is_finite() {
            count += 1;
            continue;
        }

        let denom = a.max(b);
        if denom > 0.0 {
            sum += (b - a) / denom;
        }
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}
