//! Campaign analytics orchestration.
//!
//! One call per campaign activation: features -> per-block proximity
//! matrices -> clustering ensemble -> per-grant scoring, then decision
//! ingestion feeding the graduation tracker between campaigns. The run is
//! pure computation over an immutable snapshot; graduation state is the
//! only shared mutable input and is read as a snapshot taken at the start
//! of the run.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clustering::{Ensemble, PopulationClustering};
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::graduation::{
    sampled_for_probation, CategoryGraduationState, GraduationStore, GraduationTracker,
    GraduationUpdate, Phase,
};
use crate::proximity::{FeatureSet, ProximityCalculator, ProximityWeights};
use crate::scoring::AssuranceScorer;
use crate::types::{
    ActivitySummary, AutoCertAuditRecord, CampaignScope, CategoryId, Classification,
    DecisionEvent, IdentityId, Resource, ResourceId, ReviewItem, UsagePattern,
};

// ============================================================================
// Outputs
// ============================================================================

/// Aggregate counts for one run, logged at completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub campaign_id: Uuid,
    pub total_grants: usize,
    pub high_assurance: usize,
    pub medium_assurance: usize,
    pub low_assurance: usize,
    pub auto_certify_eligible: usize,
    pub requires_human_review: usize,
    pub disagreements: usize,
    pub cold_start: usize,
    pub dormant: usize,
}

/// Everything a campaign run produces. Serializes to JSON for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOutcome {
    pub campaign_id: Uuid,
    pub as_of: DateTime<Utc>,
    /// One item per grant in scope, sorted by grant id.
    pub review_items: Vec<ReviewItem>,
    /// One record per auto-certify-eligible item, sorted by grant id.
    pub audit_records: Vec<AutoCertAuditRecord>,
    /// Graduation state of every category known at the end of the run.
    pub graduation: BTreeMap<CategoryId, CategoryGraduationState>,
    pub summary: AnalyticsSummary,
}

/// Per-identity roll-up over one run's review items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessSummary {
    pub identity_id: IdentityId,
    pub total_grants: usize,
    pub high_assurance: usize,
    pub medium_assurance: usize,
    pub low_assurance: usize,
    pub dormant: usize,
    pub auto_certify_eligible: usize,
    /// Largest peer group observed across the identity's items.
    pub peer_group_size: usize,
    /// Mean consensus across the identity's items.
    pub mean_consensus: f32,
}

impl AnalyticsOutcome {
    /// Roll up one identity's items for the access-summary surface.
    pub fn access_summary(&self, identity: &IdentityId) -> AccessSummary {
        let items: Vec<&ReviewItem> = self
            .review_items
            .iter()
            .filter(|item| &item.identity_id == identity)
            .collect();

        let total = items.len();
        let consensus_sum: f32 = items.iter().map(|i| i.consensus).sum();
        AccessSummary {
            identity_id: identity.clone(),
            total_grants: total,
            high_assurance: count(&items, |i| i.classification == Classification::HighAssurance),
            medium_assurance: count(&items, |i| {
                i.classification == Classification::MediumAssurance
            }),
            low_assurance: count(&items, |i| i.classification == Classification::LowAssurance),
            dormant: count(&items, |i| i.usage_pattern == UsagePattern::Dormant),
            auto_certify_eligible: count(&items, |i| i.auto_certify_eligible),
            peer_group_size: items.iter().map(|i| i.peer_group_size).max().unwrap_or(0),
            mean_consensus: if total == 0 {
                0.0
            } else {
                consensus_sum / total as f32
            },
        }
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn count(items: &[&ReviewItem], pred: impl Fn(&ReviewItem) -> bool) -> usize {
    items.iter().filter(|i| pred(i)).count()
}

// ============================================================================
// Engine
// ============================================================================

/// The analytics engine: one instance per deployment, shared across
/// campaign runs and decision ingestion.
pub struct AnalyticsEngine {
    config: EngineConfig,
    ensemble: Ensemble,
    scorer: AssuranceScorer,
    store: Arc<GraduationStore>,
    tracker: GraduationTracker,
    /// Campaign ids with a run currently in flight.
    in_flight: Mutex<HashSet<Uuid>>,
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> CoreResult<Self> {
        config.validate()?;
        let store = Arc::new(GraduationStore::new(
            config.graduation.metrics_window_campaigns,
        ));
        let tracker = GraduationTracker::new(config.graduation.clone(), Arc::clone(&store))?;
        Ok(Self {
            ensemble: Ensemble::new(config.clustering.clone()),
            scorer: AssuranceScorer::new(config.scoring.clone()),
            store,
            tracker,
            config,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn store(&self) -> &Arc<GraduationStore> {
        &self.store
    }

    /// Run a campaign with the configured proximity weights.
    pub fn run(&self, scope: &CampaignScope) -> CoreResult<AnalyticsOutcome> {
        let weights = self.config.proximity.clone();
        self.run_analytics(scope, weights)
    }

    /// Run a full campaign analytics pass.
    ///
    /// Idempotent: identical scope, weights, and seed produce identical
    /// output. A second run for a campaign id still in flight is rejected.
    pub fn run_analytics(
        &self,
        scope: &CampaignScope,
        weights: ProximityWeights,
    ) -> CoreResult<AnalyticsOutcome> {
        let _guard = RunGuard::acquire(&self.in_flight, scope.campaign_id)?;
        info!(
            campaign = %scope.campaign_id,
            identities = scope.identities.len(),
            grants = scope.grants.len(),
            "starting analytics run"
        );

        let calculator = ProximityCalculator::new(weights)?;
        let features = FeatureSet::extract(scope);

        // Cluster each population block once; every grant whose holder
        // lives in a block reuses its partitions.
        let blocks = self.population_blocks(scope, &features);
        let clusterings: Vec<PopulationClustering> = blocks
            .par_iter()
            .map(|ids| {
                let matrix = calculator.matrix(ids, &features, false);
                self.ensemble.cluster(&matrix)
            })
            .collect();
        let block_of: HashMap<&IdentityId, usize> = blocks
            .iter()
            .enumerate()
            .flat_map(|(b, ids)| ids.iter().map(move |id| (id, b)))
            .collect();

        let resources: HashMap<&ResourceId, &Resource> =
            scope.resources.iter().map(|r| (&r.id, r)).collect();
        let mut holders: HashMap<&ResourceId, BTreeSet<IdentityId>> = HashMap::new();
        for grant in &scope.grants {
            holders
                .entry(&grant.resource_id)
                .or_default()
                .insert(grant.identity_id.clone());
        }
        let activity: HashMap<(&IdentityId, &ResourceId), &ActivitySummary> = scope
            .activity
            .iter()
            .map(|a| ((&a.identity_id, &a.resource_id), a))
            .collect();

        // One consistent graduation snapshot for the whole run.
        let phases: BTreeMap<CategoryId, Phase> = scope
            .resources
            .iter()
            .map(|r| {
                let category = r.category();
                let phase = self.store.phase_of(&category);
                (category, phase)
            })
            .collect();

        let empty_holders = BTreeSet::new();
        let mut review_items: Vec<ReviewItem> = scope
            .grants
            .par_iter()
            .map(|grant| {
                let resource = resources
                    .get(&grant.resource_id)
                    .ok_or_else(|| CoreError::UnknownResource(grant.resource_id.to_string()))?;
                let block = block_of
                    .get(&grant.identity_id)
                    .ok_or_else(|| CoreError::UnknownIdentity(grant.identity_id.to_string()))?;
                let resource_holders = holders.get(&grant.resource_id).unwrap_or(&empty_holders);

                let assessment =
                    self.ensemble
                        .assess(&clusterings[*block], &grant.identity_id, resource_holders);
                let phase = phases
                    .get(&resource.category())
                    .copied()
                    .unwrap_or_default();
                Ok(self.scorer.score(
                    grant,
                    resource,
                    &assessment,
                    activity.get(&(&grant.identity_id, &grant.resource_id)).copied(),
                    scope.as_of,
                    phase,
                ))
            })
            .collect::<CoreResult<Vec<ReviewItem>>>()?;

        // Deterministic output order regardless of worker scheduling.
        review_items.sort_by(|a, b| a.grant_id.cmp(&b.grant_id));

        let audit_records = self.audit_records(scope, &review_items);
        let summary = summarize(scope.campaign_id, &review_items);
        info!(
            campaign = %scope.campaign_id,
            total = summary.total_grants,
            high = summary.high_assurance,
            auto_certify = summary.auto_certify_eligible,
            human_review = summary.requires_human_review,
            disagreements = summary.disagreements,
            "analytics run complete"
        );

        Ok(AnalyticsOutcome {
            campaign_id: scope.campaign_id,
            as_of: scope.as_of,
            review_items,
            audit_records,
            graduation: self.store.snapshot_all(),
            summary,
        })
    }

    /// Feed closed-campaign decision outcomes into the graduation tracker.
    pub fn ingest_decisions(&self, decisions: &[DecisionEvent]) -> Vec<GraduationUpdate> {
        debug!(count = decisions.len(), "ingesting decision events");
        self.tracker.ingest_decisions(decisions)
    }

    /// Governance sign-off for an Eligible category.
    pub fn approve_graduation(
        &self,
        category: &CategoryId,
        approved_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> CoreResult<GraduationUpdate> {
        self.tracker.approve_graduation(category, approved_by, at)
    }

    /// External suspension request for a Graduated category.
    pub fn suspend_category(
        &self,
        category: &CategoryId,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> CoreResult<GraduationUpdate> {
        self.tracker.suspend(category, reason, at)
    }

    /// Population blocks for clustering: per line of business when
    /// blocking is on, otherwise one block with everyone.
    fn population_blocks(
        &self,
        scope: &CampaignScope,
        features: &FeatureSet,
    ) -> Vec<Vec<IdentityId>> {
        let mut all: Vec<IdentityId> = scope.identities.iter().map(|e| e.id.clone()).collect();
        all.sort();
        all.dedup();

        if !self.config.clustering.block_by_lob {
            return vec![all];
        }

        let mut by_lob: BTreeMap<String, Vec<IdentityId>> = BTreeMap::new();
        for id in all {
            let lob = features
                .get(&id)
                .and_then(|f| f.lob_id.clone())
                .unwrap_or_else(|| "unknown".to_string());
            by_lob.entry(lob).or_default().push(id);
        }
        by_lob.into_values().collect()
    }

    fn audit_records(
        &self,
        scope: &CampaignScope,
        review_items: &[ReviewItem],
    ) -> Vec<AutoCertAuditRecord> {
        review_items
            .iter()
            .filter(|item| item.auto_certify_eligible)
            .map(|item| {
                let in_probation = self
                    .store
                    .snapshot(&item.category)
                    .map(|s| s.in_probation(scope.as_of))
                    .unwrap_or(false);
                AutoCertAuditRecord {
                    campaign_id: scope.campaign_id,
                    grant_id: item.grant_id.clone(),
                    identity_id: item.identity_id.clone(),
                    resource_id: item.resource_id.clone(),
                    category: item.category.clone(),
                    score: item.score,
                    raw_score: item.raw_score,
                    typicality: item.typicality,
                    usage_factor: item.usage_factor,
                    sensitivity_ceiling: item.sensitivity_ceiling,
                    peer_group_size: item.peer_group_size,
                    peers_with_access: item.peers_with_access,
                    consensus: item.consensus,
                    clustering_seed: item.clustering_seed,
                    graduation_phase: Phase::Graduated,
                    sampled_for_probation: in_probation
                        && sampled_for_probation(
                            &item.grant_id,
                            self.config.graduation.probation_sampling_rate,
                        ),
                    recorded_at: scope.as_of,
                }
            })
            .collect()
    }
}

fn summarize(campaign_id: Uuid, items: &[ReviewItem]) -> AnalyticsSummary {
    let by = |pred: &dyn Fn(&ReviewItem) -> bool| items.iter().filter(|i| pred(i)).count();
    AnalyticsSummary {
        campaign_id,
        total_grants: items.len(),
        high_assurance: by(&|i| i.classification == Classification::HighAssurance),
        medium_assurance: by(&|i| i.classification == Classification::MediumAssurance),
        low_assurance: by(&|i| i.classification == Classification::LowAssurance),
        auto_certify_eligible: by(&|i| i.auto_certify_eligible),
        requires_human_review: by(&|i| i.requires_human_review),
        disagreements: by(&|i| i.disagreement),
        cold_start: by(&|i| i.cold_start),
        dormant: by(&|i| i.usage_pattern == UsagePattern::Dormant),
    }
}

/// Mutual exclusion per campaign id: removed on drop so a failed run does
/// not wedge the campaign.
#[derive(Debug)]
struct RunGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> RunGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, id: Uuid) -> CoreResult<Self> {
        if !set.lock().insert(id) {
            return Err(CoreError::CampaignInFlight(id));
        }
        Ok(Self { set, id })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_guard_blocks_double_entry() {
        let set = Mutex::new(HashSet::new());
        let id = Uuid::from_u128(7);
        let guard = RunGuard::acquire(&set, id).unwrap();
        let err = RunGuard::acquire(&set, id).unwrap_err();
        assert!(matches!(err, CoreError::CampaignInFlight(_)));
        drop(guard);
        assert!(RunGuard::acquire(&set, id).is_ok());
    }
}
