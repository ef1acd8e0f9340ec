//! Proximity dimension weights with pairwise interaction adjustments.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tolerance for the sum-to-1.0 invariant.
pub const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

/// The four proximity dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Structural,
    Functional,
    Behavioral,
    Temporal,
}

impl Dimension {
    pub fn all() -> [Dimension; 4] {
        [
            Dimension::Structural,
            Dimension::Functional,
            Dimension::Behavioral,
            Dimension::Temporal,
        ]
    }

    fn index(self) -> usize {
        match self {
            Dimension::Structural => 0,
            Dimension::Functional => 1,
            Dimension::Behavioral => 2,
            Dimension::Temporal => 3,
        }
    }
}

/// A bounded weight transfer between two dimensions.
///
/// Transfers `amount` of weight from `from` to `to`. Validation rejects
/// any set of transfers that would drive an effective weight negative, so
/// the adjusted vector still sums to 1.0 by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionAdjustment {
    pub from: Dimension,
    pub to: Dimension,
    pub amount: f32,
}

/// Immutable proximity weight configuration.
///
/// Loaded once per run, validated at construction, never mutated mid-run.
///
/// # Example
///
/// ```
/// use recert_analytics_core::proximity::ProximityWeights;
///
/// let weights = ProximityWeights::new(0.25, 0.35, 0.30, 0.10).unwrap();
/// let [s, f, b, t] = weights.effective();
/// assert!(((s + f + b + t) - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityWeights {
    pub structural: f32,
    pub functional: f32,
    pub behavioral: f32,
    pub temporal: f32,
    /// Optional pairwise interaction adjustments applied to the base
    /// weights before use.
    #[serde(default)]
    pub interactions: Vec<InteractionAdjustment>,
}

impl Default for ProximityWeights {
    fn default() -> Self {
        Self {
            structural: 0.25,
            functional: 0.35,
            behavioral: 0.30,
            temporal: 0.10,
            interactions: Vec::new(),
        }
    }
}

impl ProximityWeights {
    /// Create and validate a weight vector without interactions.
    pub fn new(structural: f32, functional: f32, behavioral: f32, temporal: f32) -> CoreResult<Self> {
        let weights = Self {
            structural,
            functional,
            behavioral,
            temporal,
            interactions: Vec::new(),
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Add an interaction adjustment, revalidating the result.
    pub fn with_interaction(
        mut self,
        from: Dimension,
        to: Dimension,
        amount: f32,
    ) -> CoreResult<Self> {
        self.interactions.push(InteractionAdjustment { from, to, amount });
        self.validate()?;
        Ok(self)
    }

    /// Effective weights after interaction adjustment, as
    /// [structural, functional, behavioral, temporal].
    pub fn effective(&self) -> [f32; 4] {
        let mut w = [self.structural, self.functional, self.behavioral, self.temporal];
        for adj in &self.interactions {
            w[adj.from.index()] -= adj.amount;
            w[adj.to.index()] += adj.amount;
        }
        w
    }

    /// Validate the base weights and the adjusted effective weights.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any base weight is negative, the base
    /// vector does not sum to 1.0 within tolerance, any interaction amount
    /// is negative or self-directed, or any effective weight goes negative
    /// after adjustment.
    pub fn validate(&self) -> CoreResult<()> {
        let base = [self.structural, self.functional, self.behavioral, self.temporal];
        if base.iter().any(|&w| w < 0.0) {
            return Err(CoreError::validation(
                "proximity.weights",
                "weights must be non-negative",
            ));
        }

        let sum: f32 = base.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CoreError::validation(
                "proximity.weights",
                format!("weights must sum to 1.0, got {}", sum),
            ));
        }

        for adj in &self.interactions {
            if adj.from == adj.to {
                return Err(CoreError::validation(
                    "proximity.interactions",
                    "interaction must move weight between distinct dimensions",
                ));
            }
            if adj.amount < 0.0 {
                return Err(CoreError::validation(
                    "proximity.interactions",
                    "interaction amount must be non-negative",
                ));
            }
        }

        let effective = self.effective();
        if effective.iter().any(|&w| w < 0.0) {
            return Err(CoreError::validation(
                "proximity.interactions",
                "interaction adjustment drives an effective weight negative",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_valid() {
        let weights = ProximityWeights::default();
        assert!(weights.validate().is_ok(), "default weights must validate");
        let sum: f32 = weights.effective().iter().sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let result = ProximityWeights::new(0.5, 0.5, 0.5, 0.5);
        assert!(result.is_err(), "sum 2.0 must be rejected");
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = ProximityWeights::new(-0.1, 0.5, 0.4, 0.2);
        assert!(result.is_err(), "negative weight must be rejected");
    }

    #[test]
    fn test_interaction_preserves_sum() {
        let weights = ProximityWeights::default()
            .with_interaction(Dimension::Functional, Dimension::Behavioral, 0.05)
            .unwrap();

        let effective = weights.effective();
        let sum: f32 = effective.iter().sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE, "sum preserved");
        assert!((effective[1] - 0.30).abs() < 1e-6, "functional reduced");
        assert!((effective[2] - 0.35).abs() < 1e-6, "behavioral increased");
    }

    #[test]
    fn test_interaction_cannot_go_negative() {
        // Temporal starts at 0.10; moving 0.2 away would make it negative.
        let result = ProximityWeights::default().with_interaction(
            Dimension::Temporal,
            Dimension::Structural,
            0.2,
        );
        assert!(result.is_err(), "over-draining transfer must be rejected");
    }

    #[test]
    fn test_self_interaction_rejected() {
        let result = ProximityWeights::default().with_interaction(
            Dimension::Structural,
            Dimension::Structural,
            0.05,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_weights_serde_round_trip() {
        let weights = ProximityWeights::default()
            .with_interaction(Dimension::Structural, Dimension::Temporal, 0.02)
            .unwrap();
        let json = serde_json::to_string(&weights).unwrap();
        let back: ProximityWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(back, weights);
    }
}
