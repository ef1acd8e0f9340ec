//! Review-item output types: the scorer's decision-ready record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::IdentityId;
use super::resource::{CategoryId, ResourceId, SensitivityLevel};
use crate::graduation::Phase;

/// Stable identifier for an access grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub String);

impl GrantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Assurance classification bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    HighAssurance,
    MediumAssurance,
    LowAssurance,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::HighAssurance => "high_assurance",
            Classification::MediumAssurance => "medium_assurance",
            Classification::LowAssurance => "low_assurance",
        };
        f.write_str(s)
    }
}

/// What the system recommends the reviewer do with the grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Certify,
    Review,
    Revoke,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendedAction::Certify => "certify",
            RecommendedAction::Review => "review",
            RecommendedAction::Revoke => "revoke",
        };
        f.write_str(s)
    }
}

/// Usage recency bands, derived from days since last use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePattern {
    /// Used within 30 days.
    Active,
    /// Used within 90 days.
    Recent,
    /// Used within a year.
    Stale,
    /// Not used in over a year, or never.
    Dormant,
}

impl fmt::Display for UsagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UsagePattern::Active => "active",
            UsagePattern::Recent => "recent",
            UsagePattern::Stale => "stale",
            UsagePattern::Dormant => "dormant",
        };
        f.write_str(s)
    }
}

/// The scorer's output unit: one decision-ready record per grant.
///
/// Created fresh each campaign run; carries enough detail for the review
/// UI and the audit trail without recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub grant_id: GrantId,
    pub identity_id: IdentityId,
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub sensitivity: SensitivityLevel,
    pub category: CategoryId,

    /// Final assurance score in [0,100], after the sensitivity ceiling.
    pub score: f32,
    /// Weighted typicality/usage combination before the ceiling, in [0,1].
    pub raw_score: f32,
    /// Peer typicality in [0,1] (mean across valid algorithms).
    pub typicality: f32,
    pub usage_factor: f32,
    pub usage_pattern: UsagePattern,
    pub days_since_last_use: Option<i64>,
    pub sensitivity_ceiling: f32,

    // Peer context
    pub peer_group_size: usize,
    pub peers_with_access: usize,
    /// Fraction of clustering algorithms agreeing with the majority
    /// typicality verdict, in [0,1].
    pub consensus: f32,
    pub disagreement: bool,
    pub disagreement_note: Option<String>,
    pub small_peer_group: bool,
    pub cold_start: bool,

    pub classification: Classification,
    pub auto_certify_eligible: bool,
    pub requires_human_review: bool,
    /// Why the item must go to a human, when a flag blocks automation.
    pub human_review_reason: Option<String>,
    /// What the system would have recommended absent the blocking flag.
    pub system_recommendation: Option<RecommendedAction>,
    pub recommended_action: RecommendedAction,

    /// Ordered, mechanically generated explanation strings.
    pub explanations: Vec<String>,

    /// Clustering seed used for this run, recorded for audit.
    pub clustering_seed: u64,
}

/// Audit record emitted for every auto-certify-eligible item, consumed by
/// the second-line sampling collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCertAuditRecord {
    pub campaign_id: Uuid,
    pub grant_id: GrantId,
    pub identity_id: IdentityId,
    pub resource_id: ResourceId,
    pub category: CategoryId,

    pub score: f32,
    pub raw_score: f32,
    pub typicality: f32,
    pub usage_factor: f32,
    pub sensitivity_ceiling: f32,

    pub peer_group_size: usize,
    pub peers_with_access: usize,
    pub consensus: f32,
    pub clustering_seed: u64,

    pub graduation_phase: Phase,
    /// True while the category is within its post-graduation probation
    /// window and this item was selected for second-line sampling.
    pub sampled_for_probation: bool,

    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_serde_labels() {
        let json = serde_json::to_string(&Classification::HighAssurance).unwrap();
        assert_eq!(json, "\"high_assurance\"");
        assert_eq!(Classification::LowAssurance.to_string(), "low_assurance");
    }

    #[test]
    fn test_usage_pattern_labels() {
        assert_eq!(UsagePattern::Active.to_string(), "active");
        assert_eq!(UsagePattern::Dormant.to_string(), "dormant");
    }

    #[test]
    fn test_recommended_action_serde() {
        let json = serde_json::to_string(&RecommendedAction::Revoke).unwrap();
        assert_eq!(json, "\"revoke\"");
        let back: RecommendedAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RecommendedAction::Revoke);
    }
}
