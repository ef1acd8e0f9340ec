//! Assurance scoring: peer typicality, usage, and the sensitivity ceiling
//! combined into a 0-100 score with classification and flags.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::clustering::PeerAssessment;
use crate::config::ScoringConfig;
use crate::graduation::Phase;
use crate::types::{
    AccessGrant, ActivitySummary, Classification, RecommendedAction, Resource, ReviewItem,
    SensitivityLevel, UsagePattern,
};

use super::usage::classify_usage;

/// Scores one grant at a time. Holds only configuration; safe to share
/// across rayon workers.
#[derive(Debug, Clone)]
pub struct AssuranceScorer {
    config: ScoringConfig,
}

impl AssuranceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Produce the decision-ready review item for one grant.
    ///
    /// The Critical-sensitivity override is applied as the final step: no
    /// combination of typicality and usage can produce a nonzero score or
    /// auto-certification for a Critical resource.
    pub fn score(
        &self,
        grant: &AccessGrant,
        resource: &Resource,
        assessment: &PeerAssessment,
        activity: Option<&ActivitySummary>,
        as_of: DateTime<Utc>,
        phase: Phase,
    ) -> ReviewItem {
        let days_since_last_use = activity.and_then(|a| a.days_since_last_use(as_of));
        let usage_pattern = classify_usage(days_since_last_use, &self.config);
        let usage_factor = self.config.usage_factor(usage_pattern);

        let typicality = if assessment.cold_start {
            self.config.cold_start_typicality
        } else {
            assessment.typicality
        };

        let raw_score = (self.config.weight_typicality * typicality
            + self.config.weight_usage * usage_factor)
            .clamp(0.0, 1.0);

        let sensitivity = resource.sensitivity;
        let ceiling = self.config.ceiling(sensitivity);
        let mut score = (raw_score * ceiling * 100.0).clamp(0.0, 100.0);

        let critical = sensitivity == SensitivityLevel::Critical;
        if critical {
            // Enforced last, never folded into the weighted average.
            score = 0.0;
        }
        debug_assert!(!critical || score == 0.0);

        let classification = self.classify(score);

        let blocked = critical
            || assessment.disagreement
            || assessment.small_peer_group
            || assessment.cold_start;

        let auto_certify_eligible = !critical
            && classification == Classification::HighAssurance
            && ceiling > 0.0
            && phase == Phase::Graduated
            && !blocked;

        let human_review_reason = self.review_reason(assessment, critical);
        let requires_human_review = human_review_reason.is_some();

        // What the system would have recommended absent the blocking flag.
        // For Critical resources the shadow score lifts the ceiling.
        let system_recommendation = blocked.then(|| {
            let shadow = if critical {
                (raw_score * 100.0).clamp(0.0, 100.0)
            } else {
                score
            };
            action_for(self.classify(shadow))
        });

        let recommended_action = if requires_human_review {
            RecommendedAction::Review
        } else {
            action_for(classification)
        };

        let explanations = self.explanations(
            assessment,
            usage_pattern,
            days_since_last_use,
            sensitivity,
            ceiling,
            auto_certify_eligible,
        );

        trace!(
            grant = %grant.id,
            score,
            classification = %classification,
            auto_certify_eligible,
            "grant scored"
        );

        ReviewItem {
            grant_id: grant.id.clone(),
            identity_id: grant.identity_id.clone(),
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            sensitivity,
            category: resource.category(),
            score,
            raw_score,
            typicality,
            usage_factor,
            usage_pattern,
            days_since_last_use,
            sensitivity_ceiling: ceiling,
            peer_group_size: assessment.peer_group_size,
            peers_with_access: assessment.peers_with_access,
            consensus: assessment.consensus,
            disagreement: assessment.disagreement,
            disagreement_note: assessment.disagreement_note.clone(),
            small_peer_group: assessment.small_peer_group,
            cold_start: assessment.cold_start,
            classification,
            auto_certify_eligible,
            requires_human_review,
            human_review_reason,
            system_recommendation,
            recommended_action,
            explanations,
            clustering_seed: assessment.seed,
        }
    }

    fn classify(&self, score: f32) -> Classification {
        if score >= self.config.high_assurance_threshold {
            Classification::HighAssurance
        } else if score >= self.config.medium_assurance_threshold {
            Classification::MediumAssurance
        } else {
            Classification::LowAssurance
        }
    }

    /// Highest-precedence blocking flag, if any.
    fn review_reason(&self, assessment: &PeerAssessment, critical: bool) -> Option<String> {
        if critical {
            return Some("Critical sensitivity forces manual review".to_string());
        }
        if assessment.disagreement {
            return Some(assessment.disagreement_note.clone().unwrap_or_else(|| {
                "clustering algorithms disagree on peer typicality".to_string()
            }));
        }
        if assessment.cold_start {
            return Some("population too small for peer comparison".to_string());
        }
        if assessment.small_peer_group {
            return Some(format!(
                "peer group of {} is too small for reliable comparison",
                assessment.peer_group_size
            ));
        }
        None
    }

    /// Ordered explanation strings, derived mechanically from the inputs so
    /// they always match the numeric fields.
    fn explanations(
        &self,
        assessment: &PeerAssessment,
        usage_pattern: UsagePattern,
        days_since_last_use: Option<i64>,
        sensitivity: SensitivityLevel,
        ceiling: f32,
        auto_certify_eligible: bool,
    ) -> Vec<String> {
        let mut out = Vec::new();

        if assessment.cold_start {
            out.push("no peer group available; rule-based default typicality applied".to_string());
        } else if assessment.peer_group_size > 0 {
            let pct = 100.0 * assessment.peers_with_access as f32
                / assessment.peer_group_size as f32;
            out.push(format!("{:.0}% of peer group has this access", pct));
        } else {
            out.push("no peers found by any clustering algorithm".to_string());
        }

        match usage_pattern {
            UsagePattern::Active => {
                out.push("used within the last 30 days".to_string());
            }
            UsagePattern::Recent | UsagePattern::Stale => {
                if let Some(days) = days_since_last_use {
                    out.push(format!("last used {days} days ago"));
                }
            }
            UsagePattern::Dormant => match days_since_last_use {
                Some(days) => out.push(format!("dormant {days} days")),
                None => out.push("never used".to_string()),
            },
        }

        if sensitivity == SensitivityLevel::Critical {
            out.push("Critical sensitivity forces manual review".to_string());
        } else if ceiling < 1.0 {
            out.push(format!(
                "score capped at {:.0}% by {} sensitivity",
                ceiling * 100.0,
                sensitivity.label()
            ));
        }

        if let Some(note) = &assessment.disagreement_note {
            out.push(note.clone());
        }
        if assessment.small_peer_group && !assessment.cold_start {
            out.push(format!(
                "peer group of {} is below the reliability minimum",
                assessment.peer_group_size
            ));
        }

        if auto_certify_eligible {
            out.push("eligible for auto-certification".to_string());
        }

        out
    }
}

fn action_for(classification: Classification) -> RecommendedAction {
    match classification {
        Classification::HighAssurance => RecommendedAction::Certify,
        Classification::MediumAssurance => RecommendedAction::Review,
        Classification::LowAssurance => RecommendedAction::Revoke,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn assessment(typicality: f32) -> PeerAssessment {
        PeerAssessment {
            identity: "emp_1".into(),
            per_algorithm: BTreeMap::new(),
            typicality,
            consensus: 1.0,
            disagreement: false,
            disagreement_note: None,
            small_peer_group: false,
            peer_group_size: 16,
            peers_with_access: (typicality * 16.0).round() as usize,
            cold_start: false,
            seed: 42,
        }
    }

    fn resource(sensitivity: SensitivityLevel) -> Resource {
        Resource {
            id: "res_1".into(),
            name: "customer-db".to_string(),
            system_type: "database".to_string(),
            sensitivity,
        }
    }

    fn active_summary(as_of: DateTime<Utc>) -> ActivitySummary {
        ActivitySummary {
            identity_id: "emp_1".into(),
            resource_id: "res_1".into(),
            total_access_count: 40,
            access_count_30d: 12,
            access_count_90d: 30,
            last_used_at: Some(as_of - chrono::Duration::days(3)),
        }
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_typical_active_internal_scores_high() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");
        let summary = active_summary(as_of());

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Internal),
            &assessment(0.94),
            Some(&summary),
            as_of(),
            Phase::Graduated,
        );

        // raw = 0.94*0.7 + 1.0*0.3 = 0.958; * 0.85 * 100 = 81.43
        assert!((item.raw_score - 0.958).abs() < 1e-3);
        assert!((item.score - 81.43).abs() < 0.1, "got {}", item.score);
        assert_eq!(item.classification, Classification::HighAssurance);
        assert!(item.auto_certify_eligible);
        assert!(!item.requires_human_review);
        assert_eq!(item.recommended_action, RecommendedAction::Certify);
        assert!(item
            .explanations
            .iter()
            .any(|e| e == "94% of peer group has this access"), "{:?}", item.explanations);
        println!("[PASS] test_typical_active_internal_scores_high - score={}", item.score);
    }

    #[test]
    fn test_critical_forces_zero_regardless_of_inputs() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");
        let summary = active_summary(as_of());

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Critical),
            &assessment(1.0),
            Some(&summary),
            as_of(),
            Phase::Graduated,
        );

        assert_eq!(item.score, 0.0);
        assert!(!item.auto_certify_eligible);
        assert!(item.requires_human_review);
        assert_eq!(
            item.human_review_reason.as_deref(),
            Some("Critical sensitivity forces manual review")
        );
        // Perfect typicality and active usage would have been a certify.
        assert_eq!(item.system_recommendation, Some(RecommendedAction::Certify));
        assert_eq!(item.recommended_action, RecommendedAction::Review);
        println!("[PASS] test_critical_forces_zero_regardless_of_inputs");
    }

    #[test]
    fn test_disagreement_blocks_auto_certify() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");
        let summary = active_summary(as_of());
        let mut a = assessment(0.95);
        a.consensus = 0.5;
        a.disagreement = true;
        a.disagreement_note =
            Some("clustering algorithms split 2-2 on whether this access is typical".to_string());

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Public),
            &a,
            Some(&summary),
            as_of(),
            Phase::Graduated,
        );

        assert_eq!(item.classification, Classification::HighAssurance);
        assert!(!item.auto_certify_eligible, "disagreement must block automation");
        assert!(item.requires_human_review);
        assert_eq!(item.system_recommendation, Some(RecommendedAction::Certify));
        assert!(item.human_review_reason.unwrap().contains("2-2"));
        println!("[PASS] test_disagreement_blocks_auto_certify");
    }

    #[test]
    fn test_observation_phase_blocks_auto_certify() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");
        let summary = active_summary(as_of());

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Public),
            &assessment(0.95),
            Some(&summary),
            as_of(),
            Phase::Observation,
        );

        assert_eq!(item.classification, Classification::HighAssurance);
        assert!(!item.auto_certify_eligible, "category not graduated");
        // Not a flag: the item is clean, just not automatable yet.
        assert!(!item.requires_human_review);
        assert_eq!(item.recommended_action, RecommendedAction::Certify);
    }

    #[test]
    fn test_dormant_low_typicality_recommends_revoke() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Public),
            &assessment(0.1),
            None,
            as_of(),
            Phase::Observation,
        );

        // raw = 0.1*0.7 + 0.1*0.3 = 0.1 -> score 10
        assert!((item.score - 10.0).abs() < 0.01);
        assert_eq!(item.classification, Classification::LowAssurance);
        assert_eq!(item.recommended_action, RecommendedAction::Revoke);
        assert_eq!(item.usage_pattern, UsagePattern::Dormant);
        assert!(item.explanations.iter().any(|e| e == "never used"));
    }

    #[test]
    fn test_cold_start_uses_default_typicality_and_forces_review() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");
        let mut a = assessment(0.0);
        a.cold_start = true;
        a.small_peer_group = true;
        a.peer_group_size = 0;
        a.peers_with_access = 0;

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Internal),
            &a,
            None,
            as_of(),
            Phase::Graduated,
        );

        assert_eq!(item.typicality, 0.5);
        assert!(item.requires_human_review);
        assert!(!item.auto_certify_eligible);
        assert_eq!(item.recommended_action, RecommendedAction::Review);
        println!("[PASS] test_cold_start_uses_default_typicality_and_forces_review");
    }

    #[test]
    fn test_dormant_days_in_explanations() {
        let scorer = AssuranceScorer::new(ScoringConfig::default());
        let grant = AccessGrant::new("grant_1", "emp_1", "res_1");
        let summary = ActivitySummary {
            identity_id: "emp_1".into(),
            resource_id: "res_1".into(),
            total_access_count: 2,
            access_count_30d: 0,
            access_count_90d: 0,
            last_used_at: Some(as_of() - chrono::Duration::days(380)),
        };

        let item = scorer.score(
            &grant,
            &resource(SensitivityLevel::Public),
            &assessment(0.8),
            Some(&summary),
            as_of(),
            Phase::Observation,
        );

        assert_eq!(item.usage_pattern, UsagePattern::Dormant);
        assert!(item.explanations.iter().any(|e| e == "dormant 380 days"));
    }
}
