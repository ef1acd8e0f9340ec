//! Graduation lifecycle: per-category rolling decision metrics driving an
//! Observation -> Eligible -> Graduated -> Suspended state machine, with
//! automatic rollback checked after every decision event.

pub mod metrics;
pub mod phase;
pub mod state;
pub mod store;
pub mod tracker;

pub use metrics::{CampaignBucket, CategoryMetrics};
pub use phase::Phase;
pub use state::{CategoryGraduationState, PhaseTransition};
pub use store::GraduationStore;
pub use tracker::{sampled_for_probation, GraduationTracker, GraduationUpdate};
