//! Partition of a population into peer groups.

use serde::{Deserialize, Serialize};

/// Label for points outside every cluster (density noise, isolated nodes).
pub const NOISE: i32 = -1;

/// One algorithm's partition of a population block.
///
/// Labels follow matrix row order. Cluster ids are arbitrary but stable for
/// a fixed input and seed; [`NOISE`] marks identities with no peer group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    labels: Vec<i32>,
}

impl Partition {
    pub fn new(labels: Vec<i32>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn label_of(&self, idx: usize) -> i32 {
        self.labels[idx]
    }

    pub fn is_noise(&self, idx: usize) -> bool {
        self.labels[idx] == NOISE
    }

    /// Distinct non-noise cluster count.
    pub fn cluster_count(&self) -> usize {
        let mut seen: Vec<i32> = self
            .labels
            .iter()
            .copied()
            .filter(|&l| l != NOISE)
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Indices sharing idx's cluster, excluding idx itself. Empty for noise.
    pub fn peers_of(&self, idx: usize) -> Vec<usize> {
        let label = self.labels[idx];
        if label == NOISE {
            return Vec::new();
        }
        self.labels
            .iter()
            .enumerate()
            .filter(|&(j, &l)| j != idx && l == label)
            .map(|(j, _)| j)
            .collect()
    }

    /// A partition is usable for peer comparison when it has at least one
    /// real cluster with more than one member.
    pub fn is_usable(&self) -> bool {
        (0..self.labels.len()).any(|i| !self.is_noise(i) && !self.peers_of(i).is_empty())
    }
}
