//! Peer proximity: multi-dimensional similarity between identities.
//!
//! Four dimensions feed a weighted score in [0,1]:
//! - **Structural**: organizational placement (manager, reporting line,
//!   team, LOB, location).
//! - **Functional**: job attributes (title, job path, cost center,
//!   projects).
//! - **Behavioral**: entitlement overlap and usage patterns.
//! - **Temporal**: career stage (tenure, time in role, hire cohort).

pub mod calculator;
pub mod features;
pub mod matrix;
pub mod weights;

pub use calculator::{PeerMatch, ProximityCalculator, ProximityComponents};
pub use features::{FeatureSet, IdentityFeatures};
pub use matrix::ProximityMatrix;
pub use weights::{Dimension, InteractionAdjustment, ProximityWeights};
