//! Peer-group detection: four independent partitioning algorithms over the
//! proximity matrix, reconciled by consensus analysis.
//!
//! Each grant gets a per-algorithm typicality (fraction of the identity's
//! peers holding the same access) plus an ensemble verdict. Algorithms
//! disagreeing on typicality is a first-class signal that routes the item
//! to a human reviewer.

pub mod agglomerative;
pub mod community;
pub mod density;
pub mod ensemble;
pub mod error;
pub mod kmedoids;
pub mod partition;
pub mod silhouette;

pub use ensemble::{
    Algorithm, AlgorithmAssessment, Ensemble, PeerAssessment, PopulationClustering,
};
pub use error::ClusterError;
pub use partition::{Partition, NOISE};
