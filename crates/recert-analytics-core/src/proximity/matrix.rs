//! Symmetric pairwise proximity matrix over a population block.

use std::collections::HashMap;

use crate::types::IdentityId;

/// Dense symmetric matrix of pairwise proximities in [0,1].
///
/// Row/column order follows `ids`, which is sorted so identical inputs
/// always produce an identical matrix. The diagonal is fixed at 1.0.
#[derive(Debug, Clone)]
pub struct ProximityMatrix {
    n: usize,
    ids: Vec<IdentityId>,
    index: HashMap<IdentityId, usize>,
    /// Row-major flat storage, length n * n.
    data: Vec<f32>,
}

impl ProximityMatrix {
    /// Build an identity matrix (diagonal 1.0) over the given population.
    /// Ids are sorted internally.
    pub fn new(mut ids: Vec<IdentityId>) -> Self {
        ids.sort();
        ids.dedup();
        let n = ids.len();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self { n, ids, index, data }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Population in matrix order.
    pub fn ids(&self) -> &[IdentityId] {
        &self.ids
    }

    pub fn index_of(&self, id: &IdentityId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id_at(&self, idx: usize) -> &IdentityId {
        &self.ids[idx]
    }

    /// Proximity between rows i and j.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// Distance form used by the clustering algorithms: 1 - proximity.
    pub fn distance(&self, i: usize, j: usize) -> f32 {
        1.0 - self.get(i, j)
    }

    /// Set both (i,j) and (j,i). Values are clamped to [0,1].
    pub fn set(&mut self, i: usize, j: usize, value: f32) {
        let v = value.clamp(0.0, 1.0);
        self.data[i * self.n + j] = v;
        self.data[j * self.n + i] = v;
    }

    /// Proximity by id pair; None if either id is outside the block.
    pub fn proximity(&self, a: &IdentityId, b: &IdentityId) -> Option<f32> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.get(i, j))
    }

    /// Mean proximity from row i to the given other rows. Returns 0.0 for
    /// an empty set.
    pub fn mean_proximity_to(&self, i: usize, others: &[usize]) -> f32 {
        let mut sum = 0.0;
        let mut count = 0u32;
        for &j in others {
            if j != i {
                sum += self.get(i, j);
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}
