//! Access Recertification Analytics Core
//!
//! Computes an auditable assurance score for every (identity, access-grant)
//! pair in a recertification campaign, decides whether each pair can be
//! certified automatically or must go to a human reviewer, and governs the
//! lifecycle by which access categories earn (and lose) auto-certification
//! eligibility.
//!
//! # Architecture
//!
//! The pipeline runs once per campaign activation:
//!
//! 1. [`proximity`] — pairwise peer proximity across four weighted
//!    dimensions (structural, functional, behavioral, temporal).
//! 2. [`clustering`] — four independent grouping algorithms over the
//!    proximity matrix, reconciled into per-identity peer groups with a
//!    consensus/disagreement signal.
//! 3. [`scoring`] — peer typicality, usage activity, and a hard
//!    resource-sensitivity ceiling combined into a 0–100 assurance score.
//! 4. [`engine`] — one decision-ready [`types::ReviewItem`] per grant.
//!
//! The [`graduation`] tracker runs asynchronously from the scoring path:
//! it ingests human decisions after each campaign closes and drives a
//! per-category state machine (observation → eligible → graduated →
//! suspended) whose phase gates auto-certification on the next run.
//!
//! # Example
//!
//! ```
//! use recert_analytics_core::proximity::ProximityWeights;
//!
//! let weights = ProximityWeights::new(0.25, 0.35, 0.30, 0.10).unwrap();
//! assert!(weights.validate().is_ok());
//! ```

pub mod clustering;
pub mod config;
pub mod engine;
pub mod error;
pub mod graduation;
pub mod proximity;
pub mod scoring;
pub mod types;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::{AnalyticsEngine, AnalyticsOutcome, AnalyticsSummary};
pub use error::{CoreError, CoreResult};
pub use graduation::{GraduationStore, GraduationTracker, Phase};
pub use proximity::ProximityWeights;
pub use types::{ReviewItem, SensitivityLevel};
