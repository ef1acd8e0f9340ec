//! Decision ingestion and the graduation lifecycle.
//!
//! The tracker is the single writer of graduation state. Rollback triggers
//! are re-evaluated after every individual decision event, not on a
//! schedule, so one bad batch can suspend a category before the next
//! campaign starts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GraduationConfig;
use crate::error::CoreResult;
use crate::types::{CategoryId, DecisionEvent, GrantId};

use super::phase::Phase;
use super::store::GraduationStore;

/// One phase change produced by an ingest or lifecycle call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraduationUpdate {
    pub category: CategoryId,
    pub from: Phase,
    pub to: Phase,
    pub at: DateTime<Utc>,
    pub reason: String,
}

pub struct GraduationTracker {
    config: GraduationConfig,
    store: Arc<GraduationStore>,
}

impl GraduationTracker {
    pub fn new(config: GraduationConfig, store: Arc<GraduationStore>) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    pub fn store(&self) -> &Arc<GraduationStore> {
        &self.store
    }

    /// Ingest a batch of decision outcomes, returning every phase change.
    ///
    /// Per event: a Suspended category first re-enters Observation (metrics
    /// reset, history retained), the event is folded into the metrics, and
    /// Graduated categories are immediately checked for rollback. After the
    /// batch, Observation/Eligible categories are re-evaluated against the
    /// advancement gates.
    pub fn ingest_decisions(&self, decisions: &[DecisionEvent]) -> Vec<GraduationUpdate> {
        let mut updates = Vec::new();
        let mut touched: Vec<CategoryId> = Vec::new();
        // Categories rolled back inside this batch stay Suspended until the
        // next ingest; only a pre-existing suspension re-enters Observation.
        let mut rolled_back: Vec<CategoryId> = Vec::new();

        for event in decisions {
            if rolled_back.contains(&event.category) {
                continue;
            }
            if !touched.contains(&event.category) {
                touched.push(event.category.clone());
            }
            let at = event.decided_at;

            self.store.with_state(&event.category, |state| {
                if state.phase == Phase::Suspended {
                    // Automatic re-qualification entry: counters restart,
                    // audit history stays.
                    state.metrics.reset();
                    if state
                        .transition(Phase::Observation, at, "re-qualification after suspension")
                        .is_ok()
                    {
                        updates.push(GraduationUpdate {
                            category: state.category.clone(),
                            from: Phase::Suspended,
                            to: Phase::Observation,
                            at,
                            reason: "re-qualification after suspension".to_string(),
                        });
                    }
                }

                state.metrics.record(event);
                state.last_evaluated = Some(at);

                if let Some(reason) = state.rollback_trigger(&self.config) {
                    warn!(category = %state.category, %reason, "rollback triggered");
                    if state.transition(Phase::Suspended, at, reason.clone()).is_ok() {
                        state.probation_until = None;
                        rolled_back.push(state.category.clone());
                        updates.push(GraduationUpdate {
                            category: state.category.clone(),
                            from: Phase::Graduated,
                            to: Phase::Suspended,
                            at,
                            reason,
                        });
                    }
                }
            });
        }

        // Advancement gates are batch-granular; rollback above is
        // event-granular.
        let evaluated_at = decisions
            .iter()
            .map(|d| d.decided_at)
            .max()
            .unwrap_or_else(Utc::now);
        for category in touched {
            self.store.with_state(&category, |state| match state.phase {
                Phase::Observation if state.meets_graduation_criteria(&self.config) => {
                    let reason = format!(
                        "advancement gates met over {} campaigns / {} decisions",
                        state.metrics.campaign_count(),
                        state.metrics.decision_count()
                    );
                    info!(category = %state.category, "category now eligible for graduation");
                    if state.transition(Phase::Eligible, evaluated_at, reason.clone()).is_ok() {
                        updates.push(GraduationUpdate {
                            category: state.category.clone(),
                            from: Phase::Observation,
                            to: Phase::Eligible,
                            at: evaluated_at,
                            reason,
                        });
                    }
                }
                Phase::Eligible if !state.meets_graduation_criteria(&self.config) => {
                    let reason = "advancement gates no longer met".to_string();
                    if state.transition(Phase::Observation, evaluated_at, reason.clone()).is_ok() {
                        updates.push(GraduationUpdate {
                            category: state.category.clone(),
                            from: Phase::Eligible,
                            to: Phase::Observation,
                            at: evaluated_at,
                            reason,
                        });
                    }
                }
                _ => {}
            });
        }

        updates
    }

    /// External governance sign-off: Eligible -> Graduated.
    pub fn approve_graduation(
        &self,
        category: &CategoryId,
        approved_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> CoreResult<GraduationUpdate> {
        let approved_by = approved_by.into();
        self.store.with_state(category, |state| {
            state.graduate(approved_by.clone(), at, &self.config)?;
            info!(category = %state.category, approved_by, "category graduated");
            Ok(GraduationUpdate {
                category: state.category.clone(),
                from: Phase::Eligible,
                to: Phase::Graduated,
                at,
                reason: format!("governance sign-off by {approved_by}"),
            })
        })
    }

    /// External suspension request: Graduated -> Suspended.
    pub fn suspend(
        &self,
        category: &CategoryId,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> CoreResult<GraduationUpdate> {
        let reason = reason.into();
        self.store.with_state(category, |state| {
            state.transition(Phase::Suspended, at, reason.clone())?;
            state.probation_until = None;
            warn!(category = %state.category, %reason, "category suspended by request");
            Ok(GraduationUpdate {
                category: state.category.clone(),
                from: Phase::Graduated,
                to: Phase::Suspended,
                at,
                reason,
            })
        })
    }
}

/// Deterministic probation-sampling selection: a stable hash of the grant
/// id picks the mandatory second-line sample.
pub fn sampled_for_probation(grant: &GrantId, sampling_rate: f32) -> bool {
    let percent = (sampling_rate * 100.0).round() as u64;
    fnv1a(grant.as_str().as_bytes()) % 100 < percent
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecommendedAction, ReviewerDecision};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn category() -> CategoryId {
        CategoryId("database:Internal".to_string())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn tracker() -> GraduationTracker {
        GraduationTracker::new(
            GraduationConfig::default(),
            Arc::new(GraduationStore::new(6)),
        )
        .unwrap()
    }

    fn event(campaign: u128, decision: ReviewerDecision, rec: RecommendedAction) -> DecisionEvent {
        DecisionEvent {
            campaign_id: Uuid::from_u128(campaign),
            grant_id: "grant_1".into(),
            category: category(),
            decided_at: now(),
            decision,
            system_recommendation: rec,
            was_auto_certified: false,
            false_positive: false,
            consensus: 0.95,
            cluster_churn: 0.02,
        }
    }

    fn clean_batch(campaign: u128, count: usize) -> Vec<DecisionEvent> {
        (0..count)
            .map(|_| event(campaign, ReviewerDecision::Certified, RecommendedAction::Certify))
            .collect()
    }

    #[test]
    fn test_observation_to_eligible_after_three_clean_campaigns() {
        let t = tracker();
        assert!(t.ingest_decisions(&clean_batch(1, 40)).is_empty());
        assert!(t.ingest_decisions(&clean_batch(2, 40)).is_empty());

        let updates = t.ingest_decisions(&clean_batch(3, 40));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].from, Phase::Observation);
        assert_eq!(updates[0].to, Phase::Eligible);
        assert_eq!(t.store().phase_of(&category()), Phase::Eligible);
        println!("[PASS] test_observation_to_eligible_after_three_clean_campaigns");
    }

    #[test]
    fn test_sign_off_required_for_graduated() {
        let t = tracker();
        for campaign in 1..=3 {
            t.ingest_decisions(&clean_batch(campaign, 40));
        }
        assert_eq!(t.store().phase_of(&category()), Phase::Eligible);

        let update = t.approve_graduation(&category(), "governance_board", now()).unwrap();
        assert_eq!(update.to, Phase::Graduated);
        assert_eq!(t.store().phase_of(&category()), Phase::Graduated);

        let snapshot = t.store().snapshot(&category()).unwrap();
        assert!(snapshot.in_probation(now() + chrono::Duration::days(10)));
    }

    #[test]
    fn test_sign_off_rejected_outside_eligible() {
        let t = tracker();
        let err = t.approve_graduation(&category(), "board", now()).unwrap_err();
        assert!(err.to_string().contains("Invalid graduation transition"));
    }

    #[test]
    fn test_rollback_within_a_single_bad_batch() {
        let t = tracker();
        for campaign in 1..=3 {
            t.ingest_decisions(&clean_batch(campaign, 40));
        }
        t.approve_graduation(&category(), "board", now()).unwrap();

        // A burst of overrides in campaign 4 pushes the rolling override
        // rate past 15% mid-batch.
        let mut bad = Vec::new();
        for _ in 0..30 {
            bad.push(event(4, ReviewerDecision::Revoked, RecommendedAction::Certify));
        }
        let updates = t.ingest_decisions(&bad);

        assert!(
            updates.iter().any(|u| u.to == Phase::Suspended),
            "rollback must fire inside the batch, got {updates:?}"
        );
        assert_eq!(t.store().phase_of(&category()), Phase::Suspended);
        println!("[PASS] test_rollback_within_a_single_bad_batch");
    }

    #[test]
    fn test_suspended_reenters_observation_on_next_ingest() {
        let t = tracker();
        for campaign in 1..=3 {
            t.ingest_decisions(&clean_batch(campaign, 40));
        }
        t.approve_graduation(&category(), "board", now()).unwrap();
        t.suspend(&category(), "incident review", now()).unwrap();
        assert_eq!(t.store().phase_of(&category()), Phase::Suspended);

        let history_before = t.store().snapshot(&category()).unwrap().history.len();
        let updates = t.ingest_decisions(&clean_batch(5, 1));
        assert!(updates
            .iter()
            .any(|u| u.from == Phase::Suspended && u.to == Phase::Observation));

        let snapshot = t.store().snapshot(&category()).unwrap();
        assert_eq!(snapshot.phase, Phase::Observation);
        assert_eq!(snapshot.metrics.decision_count(), 1, "metrics reset on re-entry");
        assert!(snapshot.history.len() > history_before, "history retained and extended");
        println!("[PASS] test_suspended_reenters_observation_on_next_ingest");
    }

    #[test]
    fn test_eligible_regresses_when_metrics_slip() {
        let t = tracker();
        for campaign in 1..=3 {
            t.ingest_decisions(&clean_batch(campaign, 40));
        }
        assert_eq!(t.store().phase_of(&category()), Phase::Eligible);

        let mut bad = Vec::new();
        for _ in 0..40 {
            bad.push(event(4, ReviewerDecision::Revoked, RecommendedAction::Certify));
        }
        let updates = t.ingest_decisions(&bad);
        assert!(updates
            .iter()
            .any(|u| u.from == Phase::Eligible && u.to == Phase::Observation));
    }

    #[test]
    fn test_probation_sampling_deterministic_and_sparse() {
        let rate = 0.10;
        let sampled: Vec<bool> = (0..1000)
            .map(|i| sampled_for_probation(&GrantId::new(format!("grant_{i}")), rate))
            .collect();
        let again: Vec<bool> = (0..1000)
            .map(|i| sampled_for_probation(&GrantId::new(format!("grant_{i}")), rate))
            .collect();
        assert_eq!(sampled, again, "sampling must be stable across runs");

        let count = sampled.iter().filter(|&&s| s).count();
        assert!((50..200).contains(&count), "roughly 10% sampled, got {count}");
        println!("[PASS] test_probation_sampling_deterministic_and_sparse - {count}/1000");
    }
}
