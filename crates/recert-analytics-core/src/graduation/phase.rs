//! Graduation phases and the legal transitions between them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of an access category's auto-certification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// All decisions human-made; metrics collected.
    Observation,
    /// Metrics meet the graduation thresholds; awaiting governance
    /// sign-off.
    Eligible,
    /// Auto-certification active, subject to probation sampling.
    Graduated,
    /// Rolled back; requires re-qualification from Observation.
    Suspended,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Observation
    }
}

impl Phase {
    /// Whether the state machine permits moving directly to `next`.
    ///
    /// No phase may be skipped: Observation -> Eligible -> Graduated ->
    /// Suspended -> Observation, plus Eligible regressing to Observation
    /// when its metrics slip before sign-off.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Observation, Phase::Eligible)
                | (Phase::Eligible, Phase::Graduated)
                | (Phase::Eligible, Phase::Observation)
                | (Phase::Graduated, Phase::Suspended)
                | (Phase::Suspended, Phase::Observation)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Observation => "observation",
            Phase::Eligible => "eligible",
            Phase::Graduated => "graduated",
            Phase::Suspended => "suspended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
