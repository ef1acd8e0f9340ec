//! Human-decision events ingested by the graduation tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::CategoryId;
use super::review::{GrantId, RecommendedAction};

/// The reviewer's verdict on a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerDecision {
    Certified,
    Revoked,
}

/// One human (or sampled) decision outcome for a review item, compared
/// against what the system recommended.
///
/// Metrics derived from these events are append-only per category; the
/// tracker re-evaluates rollback conditions after every single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub campaign_id: Uuid,
    pub grant_id: GrantId,
    pub category: CategoryId,
    pub decided_at: DateTime<Utc>,

    pub decision: ReviewerDecision,
    pub system_recommendation: RecommendedAction,
    /// True when the item was auto-certified (decision came from the
    /// second-line sampling path rather than a first-line reviewer).
    pub was_auto_certified: bool,
    /// True when a certified-then-revoked (or sampled-and-failed) outcome
    /// marks the system's certify recommendation as a false positive.
    pub false_positive: bool,

    /// Algorithm consensus observed for the item at scoring time.
    pub consensus: f32,
    /// Cluster churn for the item's population vs. the prior campaign.
    pub cluster_churn: f32,
}

impl DecisionEvent {
    /// Whether the reviewer accepted the system's recommendation.
    pub fn accepted(&self) -> bool {
        matches!(
            (self.decision, self.system_recommendation),
            (ReviewerDecision::Certified, RecommendedAction::Certify)
                | (ReviewerDecision::Revoked, RecommendedAction::Revoke)
        )
    }

    /// Whether the reviewer overrode the system's recommendation.
    pub fn overridden(&self) -> bool {
        !self.accepted() && self.system_recommendation != RecommendedAction::Review
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(decision: ReviewerDecision, rec: RecommendedAction) -> DecisionEvent {
        DecisionEvent {
            campaign_id: Uuid::nil(),
            grant_id: "grant_1".into(),
            category: CategoryId("saas:Internal".into()),
            decided_at: Utc::now(),
            decision,
            system_recommendation: rec,
            was_auto_certified: false,
            false_positive: false,
            consensus: 1.0,
            cluster_churn: 0.0,
        }
    }

    #[test]
    fn test_accepted_when_decision_matches_recommendation() {
        assert!(event(ReviewerDecision::Certified, RecommendedAction::Certify).accepted());
        assert!(event(ReviewerDecision::Revoked, RecommendedAction::Revoke).accepted());
    }

    #[test]
    fn test_overridden_when_decision_contradicts() {
        assert!(event(ReviewerDecision::Revoked, RecommendedAction::Certify).overridden());
        assert!(event(ReviewerDecision::Certified, RecommendedAction::Revoke).overridden());
    }

    #[test]
    fn test_review_recommendation_is_never_an_override() {
        // A "review" recommendation defers to the human, so neither verdict
        // counts as an override.
        assert!(!event(ReviewerDecision::Certified, RecommendedAction::Review).overridden());
        assert!(!event(ReviewerDecision::Revoked, RecommendedAction::Review).overridden());
    }
}
