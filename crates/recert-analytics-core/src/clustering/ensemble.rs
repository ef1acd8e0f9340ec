//! Multi-algorithm clustering ensemble with consensus analysis.
//!
//! All four algorithms run over the same proximity matrix and population,
//! so their partitions are directly comparable. Disagreement between them
//! is a signal, not an error: it flags the identity for human review.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClusteringConfig;
use crate::proximity::ProximityMatrix;
use crate::types::IdentityId;

use super::partition::Partition;
use super::{agglomerative, community, density, kmedoids};

// ============================================================================
// Algorithms
// ============================================================================

/// The clustering algorithms in the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    KMedoids,
    Agglomerative,
    Density,
    Community,
}

impl Algorithm {
    pub fn all() -> [Algorithm; 4] {
        [
            Algorithm::KMedoids,
            Algorithm::Agglomerative,
            Algorithm::Density,
            Algorithm::Community,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::KMedoids => "k_medoids",
            Algorithm::Agglomerative => "agglomerative",
            Algorithm::Density => "density",
            Algorithm::Community => "community",
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// One algorithm's view of one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmAssessment {
    pub cluster: i32,
    pub peer_count: usize,
    /// Fraction of this algorithm's peers holding the grant.
    pub typicality: f32,
    pub typical: bool,
}

/// Reconciled ensemble output for one identity and one grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAssessment {
    pub identity: IdentityId,
    pub per_algorithm: BTreeMap<Algorithm, AlgorithmAssessment>,
    /// Mean typicality over algorithms that gave the identity peers.
    pub typicality: f32,
    /// Fraction of valid algorithms agreeing with the majority verdict.
    pub consensus: f32,
    pub disagreement: bool,
    pub disagreement_note: Option<String>,
    pub small_peer_group: bool,
    /// Union of peer sets across algorithms.
    pub peer_group_size: usize,
    pub peers_with_access: usize,
    pub cold_start: bool,
    /// Seed the randomized algorithms ran with, recorded for audit.
    pub seed: u64,
}

/// Partitions of one population block, shared by every grant whose holder
/// lives in the block.
#[derive(Debug, Clone)]
pub struct PopulationClustering {
    ids: Vec<IdentityId>,
    partitions: BTreeMap<Algorithm, Partition>,
    cold_start: bool,
    seed: u64,
}

impl PopulationClustering {
    pub fn ids(&self) -> &[IdentityId] {
        &self.ids
    }

    pub fn partitions(&self) -> &BTreeMap<Algorithm, Partition> {
        &self.partitions
    }

    pub fn is_cold_start(&self) -> bool {
        self.cold_start
    }
}

// ============================================================================
// Ensemble
// ============================================================================

#[derive(Debug, Clone)]
pub struct Ensemble {
    config: ClusteringConfig,
}

impl Ensemble {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// Run every algorithm over one population block.
    ///
    /// Populations below the configured minimum skip clustering entirely
    /// and mark the block cold-start; individual algorithm failures are
    /// logged and skipped rather than failing the run.
    pub fn cluster(&self, matrix: &ProximityMatrix) -> PopulationClustering {
        let ids = matrix.ids().to_vec();

        if ids.len() < self.config.min_population {
            info!(
                population = ids.len(),
                min = self.config.min_population,
                "population below clustering minimum, marking cold start"
            );
            return PopulationClustering {
                ids,
                partitions: BTreeMap::new(),
                cold_start: true,
                seed: self.config.seed,
            };
        }

        let mut partitions = BTreeMap::new();
        for algorithm in Algorithm::all() {
            let result = match algorithm {
                Algorithm::KMedoids => kmedoids::partition(matrix, &self.config),
                Algorithm::Agglomerative => agglomerative::partition(matrix, &self.config),
                Algorithm::Density => density::partition(matrix, &self.config),
                Algorithm::Community => community::partition(matrix, &self.config),
            };
            match result {
                Ok(partition) => {
                    debug!(
                        algorithm = algorithm.name(),
                        clusters = partition.cluster_count(),
                        outliers = partition.noise_count(),
                        "partition complete"
                    );
                    partitions.insert(algorithm, partition);
                }
                Err(err) => {
                    warn!(algorithm = algorithm.name(), error = %err, "algorithm skipped");
                }
            }
        }

        PopulationClustering {
            ids,
            partitions,
            cold_start: false,
            seed: self.config.seed,
        }
    }

    /// Reconcile the per-algorithm partitions into one assessment of an
    /// identity's grant against its peers.
    ///
    /// `holders` is the set of identities holding the same grant.
    pub fn assess(
        &self,
        clustering: &PopulationClustering,
        identity: &IdentityId,
        holders: &BTreeSet<IdentityId>,
    ) -> PeerAssessment {
        let idx = clustering.ids.iter().position(|id| id == identity);

        let (idx, cold_start) = match (idx, clustering.cold_start) {
            (Some(i), false) => (i, false),
            // Unknown identity or un-clustered block: rule-based fallback.
            _ => {
                return self.cold_start_assessment(identity.clone(), clustering.seed);
            }
        };

        let mut per_algorithm = BTreeMap::new();
        let mut union_peers: BTreeSet<&IdentityId> = BTreeSet::new();

        for (&algorithm, partition) in &clustering.partitions {
            let peers = partition.peers_of(idx);
            let holding = peers
                .iter()
                .filter(|&&j| holders.contains(&clustering.ids[j]))
                .count();
            let typicality = if peers.is_empty() {
                0.0
            } else {
                holding as f32 / peers.len() as f32
            };
            for &j in &peers {
                union_peers.insert(&clustering.ids[j]);
            }
            per_algorithm.insert(
                algorithm,
                AlgorithmAssessment {
                    cluster: partition.label_of(idx),
                    peer_count: peers.len(),
                    typicality,
                    typical: typicality >= self.config.typicality_threshold,
                },
            );
        }

        let valid: Vec<&AlgorithmAssessment> = per_algorithm
            .values()
            .filter(|a| a.peer_count > 0)
            .collect();

        let peer_group_size = union_peers.len();
        let peers_with_access = union_peers.iter().filter(|id| holders.contains(*id)).count();
        let small_peer_group = peer_group_size < self.config.min_peer_group;

        if valid.len() < 2 {
            let typicality = valid.first().map(|a| a.typicality).unwrap_or(0.0);
            return PeerAssessment {
                identity: identity.clone(),
                per_algorithm,
                typicality,
                consensus: 0.0,
                disagreement: true,
                disagreement_note: Some(
                    "fewer than two clustering algorithms produced a valid peer group".to_string(),
                ),
                small_peer_group,
                peer_group_size,
                peers_with_access,
                cold_start,
                seed: clustering.seed,
            };
        }

        let typical_votes = valid.iter().filter(|a| a.typical).count();
        let atypical_votes = valid.len() - typical_votes;
        let consensus = typical_votes.max(atypical_votes) as f32 / valid.len() as f32;
        let typicality = valid.iter().map(|a| a.typicality).sum::<f32>() / valid.len() as f32;

        let disagreement = consensus < self.config.consensus_threshold;
        let disagreement_note = disagreement.then(|| {
            format!(
                "clustering algorithms split {typical_votes}-{atypical_votes} on whether this access is typical"
            )
        });

        PeerAssessment {
            identity: identity.clone(),
            per_algorithm,
            typicality,
            consensus,
            disagreement,
            disagreement_note,
            small_peer_group,
            peer_group_size,
            peers_with_access,
            cold_start,
            seed: clustering.seed,
        }
    }

    fn cold_start_assessment(&self, identity: IdentityId, seed: u64) -> PeerAssessment {
        PeerAssessment {
            identity,
            per_algorithm: BTreeMap::new(),
            typicality: 0.0,
            consensus: 0.0,
            disagreement: false,
            disagreement_note: None,
            small_peer_group: true,
            peer_group_size: 0,
            peers_with_access: 0,
            cold_start: true,
            seed,
        }
    }
}
