//! Pairwise proximity scoring across the four peer dimensions.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreResult;
use crate::types::IdentityId;

use super::features::{FeatureSet, IdentityFeatures};
use super::matrix::ProximityMatrix;
use super::weights::ProximityWeights;

// ============================================================================
// Dimension signal weights
// ============================================================================

// Structural
const W_SAME_MANAGER: f32 = 0.30;
const W_CHAIN_DISTANCE: f32 = 0.20;
const W_SAME_TEAM: f32 = 0.20;
const W_SAME_SUB_LOB: f32 = 0.15;
const W_SAME_LOB: f32 = 0.10;
const W_SAME_LOCATION: f32 = 0.05;

// Functional
const W_TITLE: f32 = 0.30;
const W_JOB_PATH: f32 = 0.30;
const W_COST_CENTER: f32 = 0.20;
const W_PROJECTS: f32 = 0.20;

// Behavioral
const W_ENTITLEMENT_JACCARD: f32 = 0.50;
const W_USAGE_COSINE: f32 = 0.30;
const W_INTENSITY: f32 = 0.20;

// Temporal
const W_TENURE: f32 = 0.40;
const W_TIME_IN_ROLE: f32 = 0.30;
const W_COHORT: f32 = 0.30;
const TENURE_SIGMA_DAYS: f32 = 365.0;
const ROLE_SIGMA_DAYS: f32 = 180.0;
/// Cohort bonus halves for every this many days of average tenure.
const COHORT_HALF_LIFE_DAYS: f32 = 730.0;

// ============================================================================
// Output types
// ============================================================================

/// Per-dimension breakdown of a single pairwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityComponents {
    pub structural: f32,
    pub functional: f32,
    pub behavioral: f32,
    pub temporal: f32,
    pub overall: f32,
}

/// One entry of a top-k peer lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMatch {
    pub id: IdentityId,
    pub proximity: f32,
    pub components: ProximityComponents,
}

// ============================================================================
// Calculator
// ============================================================================

/// Computes proximity scores between identities.
///
/// Scores are symmetric, deterministic, and pure: the calculator holds only
/// the validated weight vector, never per-run state.
///
/// # Example
///
/// ```
/// use recert_analytics_core::proximity::{ProximityCalculator, ProximityWeights};
///
/// let calc = ProximityCalculator::new(ProximityWeights::default()).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ProximityCalculator {
    weights: ProximityWeights,
}

impl ProximityCalculator {
    /// Create a calculator with the given weights. Fails if the weight
    /// vector is invalid.
    pub fn new(weights: ProximityWeights) -> CoreResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ProximityWeights {
        &self.weights
    }

    /// Overall proximity with the per-dimension breakdown.
    pub fn proximity(&self, a: &IdentityFeatures, b: &IdentityFeatures) -> ProximityComponents {
        let structural = structural_proximity(a, b);
        let functional = functional_proximity(a, b);
        let behavioral = behavioral_proximity(a, b);
        let temporal = temporal_proximity(a, b);

        let [ws, wf, wb, wt] = self.weights.effective();
        let overall =
            (ws * structural + wf * functional + wb * behavioral + wt * temporal).clamp(0.0, 1.0);

        ProximityComponents {
            structural,
            functional,
            behavioral,
            temporal,
            overall,
        }
    }

    /// Symmetric pairwise matrix over the given population.
    ///
    /// With `block_by_lob` set, only pairs sharing a line of business are
    /// compared; cross-LOB pairs keep proximity 0. Identities missing from
    /// the feature set keep 0 against everyone.
    pub fn matrix(
        &self,
        ids: &[IdentityId],
        features: &FeatureSet,
        block_by_lob: bool,
    ) -> ProximityMatrix {
        let mut matrix = ProximityMatrix::new(ids.to_vec());
        let n = matrix.len();
        debug!(n, block_by_lob, "computing pairwise proximity matrix");

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for i in 0..n {
            let feat_i = match features.get(matrix.id_at(i)) {
                Some(f) => f,
                None => continue,
            };
            for j in (i + 1)..n {
                let feat_j = match features.get(matrix.id_at(j)) {
                    Some(f) => f,
                    None => continue,
                };
                if block_by_lob && !same_lob(feat_i, feat_j) {
                    continue;
                }
                pairs.push((i, j));
            }
        }

        let scored: Vec<(usize, usize, f32)> = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let a = features.get(matrix.id_at(i))?;
                let b = features.get(matrix.id_at(j))?;
                Some((i, j, self.proximity(a, b).overall))
            })
            .collect();

        for (i, j, value) in scored {
            matrix.set(i, j, value);
        }

        info!(
            n,
            comparisons = pairs.len(),
            "pairwise proximity matrix complete"
        );
        matrix
    }

    /// Top-k nearest peers for one identity, sorted by proximity descending
    /// with a deterministic id tie-break. Peers below `min_proximity` are
    /// dropped; the identity itself is never returned.
    pub fn find_peers(
        &self,
        id: &IdentityId,
        features: &FeatureSet,
        top_k: usize,
        min_proximity: f32,
    ) -> Vec<PeerMatch> {
        let target = match features.get(id) {
            Some(f) => f,
            None => return Vec::new(),
        };

        let mut peers: Vec<PeerMatch> = features
            .iter()
            .filter(|(other_id, _)| *other_id != id)
            .filter_map(|(other_id, other)| {
                let components = self.proximity(target, other);
                if components.overall >= min_proximity {
                    Some(PeerMatch {
                        id: other_id.clone(),
                        proximity: components.overall,
                        components,
                    })
                } else {
                    None
                }
            })
            .collect();

        peers.sort_by(|a, b| {
            b.proximity
                .total_cmp(&a.proximity)
                .then_with(|| a.id.cmp(&b.id))
        });
        peers.truncate(top_k);
        peers
    }
}

fn same_lob(a: &IdentityFeatures, b: &IdentityFeatures) -> bool {
    match (&a.lob_id, &b.lob_id) {
        (Some(la), Some(lb)) => la == lb,
        // Unknown LOB identities form their own block.
        (None, None) => true,
        _ => false,
    }
}

// ============================================================================
// Dimension scores
// ============================================================================

/// Organizational placement: manager, reporting line, team, LOB, location.
pub fn structural_proximity(a: &IdentityFeatures, b: &IdentityFeatures) -> f32 {
    let mut score = 0.0;

    if matches_some(&a.manager_id, &b.manager_id) {
        score += W_SAME_MANAGER;
    }

    if let Some(hops) = chain_distance(a, b) {
        score += W_CHAIN_DISTANCE * (1.0 / (1.0 + hops as f32));
    }

    if matches_some(&a.team_id, &b.team_id) {
        score += W_SAME_TEAM;
    }
    if matches_some(&a.sub_lob_id, &b.sub_lob_id) {
        score += W_SAME_SUB_LOB;
    }
    if matches_some(&a.lob_id, &b.lob_id) {
        score += W_SAME_LOB;
    }
    if matches_some(&a.location_id, &b.location_id) {
        score += W_SAME_LOCATION;
    } else if matches_some(&a.region_id, &b.region_id) {
        // Different site, same region: half the location credit.
        score += W_SAME_LOCATION / 2.0;
    }

    score.min(1.0)
}

/// Job attributes: title token overlap, job-path overlap, cost center,
/// project assignments.
pub fn functional_proximity(a: &IdentityFeatures, b: &IdentityFeatures) -> f32 {
    let mut score = 0.0;

    score += W_TITLE * jaccard(&a.title_tokens, &b.title_tokens);
    score += W_JOB_PATH * jaccard(&a.job_path, &b.job_path);
    if matches_some(&a.cost_center_id, &b.cost_center_id) {
        score += W_COST_CENTER;
    }
    score += W_PROJECTS * jaccard(&a.project_ids, &b.project_ids);

    score.min(1.0)
}

/// Access and activity patterns. Signals that need activity data score 0
/// when either side has none; entitlement overlap comes from grants and is
/// always available.
pub fn behavioral_proximity(a: &IdentityFeatures, b: &IdentityFeatures) -> f32 {
    let mut score = 0.0;

    if !a.entitlements.is_empty() || !b.entitlements.is_empty() {
        score += W_ENTITLEMENT_JACCARD * jaccard(&a.entitlements, &b.entitlements);
    }

    if !a.activity_vector.is_empty() && !b.activity_vector.is_empty() {
        score += W_USAGE_COSINE * usage_cosine(a, b);
        let intensity_a = mean_intensity(a);
        let intensity_b = mean_intensity(b);
        score += W_INTENSITY * (1.0 - (intensity_a - intensity_b).abs());
    }

    score.min(1.0)
}

/// Career stage: Gaussian-decayed tenure and time-in-role similarity plus a
/// hire-cohort bonus that decays with tenure.
pub fn temporal_proximity(a: &IdentityFeatures, b: &IdentityFeatures) -> f32 {
    let mut score = 0.0;

    if a.tenure_days > 0 && b.tenure_days > 0 {
        let diff = (a.tenure_days - b.tenure_days).abs() as f32;
        score += W_TENURE * gaussian(diff, TENURE_SIGMA_DAYS);
    }

    if a.time_in_role_days > 0 && b.time_in_role_days > 0 {
        let diff = (a.time_in_role_days - b.time_in_role_days).abs() as f32;
        score += W_TIME_IN_ROLE * gaussian(diff, ROLE_SIGMA_DAYS);
    }

    if let (Some(qa), Some(qb)) = (&a.hire_quarter, &b.hire_quarter) {
        if qa == qb {
            let avg_tenure = (a.tenure_days + b.tenure_days) as f32 / 2.0;
            let decay = 0.5_f32.powf(avg_tenure / COHORT_HALF_LIFE_DAYS);
            score += W_COHORT * decay;
        }
    }

    score.min(1.0)
}

// ============================================================================
// Helpers
// ============================================================================

fn matches_some<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

fn jaccard<T: Ord>(a: &std::collections::BTreeSet<T>, b: &std::collections::BTreeSet<T>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f32 / union as f32
}

fn gaussian(diff: f32, sigma: f32) -> f32 {
    (-(diff * diff) / (2.0 * sigma * sigma)).exp()
}

/// Minimum combined hops to a common reporting-line ancestor, if any.
fn chain_distance(a: &IdentityFeatures, b: &IdentityFeatures) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (dist_a, ancestor) in a.manager_chain.iter().enumerate() {
        if let Some(dist_b) = b.manager_chain.iter().position(|m| m == ancestor) {
            let total = dist_a + dist_b;
            best = Some(best.map_or(total, |cur| cur.min(total)));
        }
    }
    best
}

/// Cosine similarity over the pair's usage-intensity vectors.
fn usage_cosine(a: &IdentityFeatures, b: &IdentityFeatures) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (resource, &va) in &a.activity_vector {
        norm_a += va * va;
        if let Some(&vb) = b.activity_vector.get(resource) {
            dot += va * vb;
        }
    }
    for &vb in b.activity_vector.values() {
        norm_b += vb * vb;
    }

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    } else {
        0.0
    }
}

fn mean_intensity(f: &IdentityFeatures) -> f32 {
    if f.activity_vector.is_empty() {
        return 0.0;
    }
    f.activity_vector.values().sum::<f32>() / f.activity_vector.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CampaignScope, Identity};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn calc() -> ProximityCalculator {
        ProximityCalculator::new(ProximityWeights::default()).unwrap()
    }

    fn teammate(id: &str) -> Identity {
        let mut emp = Identity::bare(id);
        emp.manager_id = Some("mgr_1".into());
        emp.team_id = Some("team_a".into());
        emp.sub_lob_id = Some("slob_1".into());
        emp.lob_id = Some("lob_1".into());
        emp.location_id = Some("nyc".into());
        emp.job_title = "Software Engineer".into();
        emp.job_code = "SWE2".into();
        emp.job_family = "Engineering".into();
        emp.cost_center_id = Some("cc_9".into());
        emp.hire_date = NaiveDate::from_ymd_opt(2023, 3, 1);
        emp.role_start_date = NaiveDate::from_ymd_opt(2023, 3, 1);
        emp
    }

    fn features_for(identities: Vec<Identity>) -> FeatureSet {
        let mut scope = CampaignScope::new(
            Uuid::nil(),
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        );
        scope.identities = identities;
        FeatureSet::extract(&scope)
    }

    #[test]
    fn test_proximity_is_symmetric() {
        let set = features_for(vec![teammate("a"), Identity::bare("b")]);
        let fa = set.get(&"a".into()).unwrap();
        let fb = set.get(&"b".into()).unwrap();
        let c = calc();

        let ab = c.proximity(fa, fb);
        let ba = c.proximity(fb, fa);
        assert_eq!(ab, ba, "proximity must be symmetric");
        println!("[PASS] test_proximity_is_symmetric - overall={}", ab.overall);
    }

    #[test]
    fn test_identical_teammates_score_high() {
        let set = features_for(vec![teammate("a"), teammate("b")]);
        let c = calc();
        let p = c.proximity(set.get(&"a".into()).unwrap(), set.get(&"b".into()).unwrap());

        assert!(p.structural > 0.9, "same org placement, got {}", p.structural);
        assert!(p.functional > 0.7, "same job attributes, got {}", p.functional);
        assert!(p.temporal > 0.7, "same career stage, got {}", p.temporal);
        assert!(p.overall > 0.5, "overall should be well above half, got {}", p.overall);
        println!("[PASS] test_identical_teammates_score_high - overall={}", p.overall);
    }

    #[test]
    fn test_strangers_score_near_zero() {
        let set = features_for(vec![Identity::bare("a"), Identity::bare("b")]);
        let c = calc();
        let p = c.proximity(set.get(&"a".into()).unwrap(), set.get(&"b".into()).unwrap());
        assert_eq!(p.overall, 0.0, "bare identities share nothing");
    }

    #[test]
    fn test_region_gives_half_location_credit() {
        let mut a = Identity::bare("a");
        a.location_id = Some("nyc".into());
        a.region_id = Some("amer".into());
        let mut b = Identity::bare("b");
        b.location_id = Some("aus".into());
        b.region_id = Some("amer".into());

        let set = features_for(vec![a, b]);
        let s = structural_proximity(set.get(&"a".into()).unwrap(), set.get(&"b".into()).unwrap());
        assert!((s - W_SAME_LOCATION / 2.0).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn test_chain_distance_common_ancestor() {
        let mut director = Identity::bare("dir");
        director.manager_id = None;
        let mut mgr_a = Identity::bare("mgr_a");
        mgr_a.manager_id = Some("dir".into());
        let mut mgr_b = Identity::bare("mgr_b");
        mgr_b.manager_id = Some("dir".into());
        let mut emp_a = Identity::bare("emp_a");
        emp_a.manager_id = Some("mgr_a".into());
        let mut emp_b = Identity::bare("emp_b");
        emp_b.manager_id = Some("mgr_b".into());

        let set = features_for(vec![director, mgr_a, mgr_b, emp_a, emp_b]);
        let fa = set.get(&"emp_a".into()).unwrap();
        let fb = set.get(&"emp_b".into()).unwrap();
        // dir is 1 hop above each manager: combined distance 1 + 1 = 2.
        assert_eq!(chain_distance(fa, fb), Some(2));
    }

    #[test]
    fn test_behavioral_zero_without_activity() {
        let set = features_for(vec![Identity::bare("a"), Identity::bare("b")]);
        let s = behavioral_proximity(set.get(&"a".into()).unwrap(), set.get(&"b".into()).unwrap());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_lob_blocking_zeroes_cross_lob_pairs() {
        let mut a = teammate("a");
        a.lob_id = Some("lob_1".into());
        let mut b = teammate("b");
        b.lob_id = Some("lob_2".into());
        b.sub_lob_id = Some("slob_2".into());
        let ids: Vec<IdentityId> = vec!["a".into(), "b".into()];

        let set = features_for(vec![a, b]);
        let c = calc();

        let blocked = c.matrix(&ids, &set, true);
        assert_eq!(blocked.proximity(&"a".into(), &"b".into()), Some(0.0));

        let full = c.matrix(&ids, &set, false);
        assert!(full.proximity(&"a".into(), &"b".into()).unwrap() > 0.0);
        println!("[PASS] test_lob_blocking_zeroes_cross_lob_pairs");
    }

    #[test]
    fn test_find_peers_sorted_and_bounded() {
        let mut far = Identity::bare("z_far");
        far.lob_id = Some("lob_9".into());
        let set = features_for(vec![teammate("target"), teammate("peer_1"), teammate("peer_2"), far]);
        let c = calc();

        let peers = c.find_peers(&"target".into(), &set, 10, 0.1);
        assert_eq!(peers.len(), 2, "distant identity filtered by min_proximity");
        assert!(peers[0].proximity >= peers[1].proximity);
        // Equal scores fall back to id order.
        assert_eq!(peers[0].id.as_str(), "peer_1");
        assert!(peers.iter().all(|p| p.id.as_str() != "target"));

        let top_one = c.find_peers(&"target".into(), &set, 1, 0.1);
        assert_eq!(top_one.len(), 1);
        println!("[PASS] test_find_peers_sorted_and_bounded - {} peers", peers.len());
    }

    #[test]
    fn test_matrix_deterministic_across_runs() {
        let set = features_for(vec![teammate("a"), teammate("b"), teammate("c")]);
        let ids: Vec<IdentityId> = vec!["a".into(), "b".into(), "c".into()];
        let c = calc();

        let m1 = c.matrix(&ids, &set, true);
        let m2 = c.matrix(&ids, &set, true);
        for i in 0..m1.len() {
            for j in 0..m1.len() {
                assert_eq!(m1.get(i, j), m2.get(i, j));
            }
        }
        println!("[PASS] test_matrix_deterministic_across_runs");
    }
}
