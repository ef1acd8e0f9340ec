//! Assurance scoring: 70/30 typicality/usage combination, sensitivity
//! ceilings, classification bands, and generated explanations.

pub mod scorer;
pub mod usage;

pub use scorer::AssuranceScorer;
pub use usage::classify_usage;
