//! Feature extraction: turns the campaign snapshot into the per-identity
//! feature structs the proximity calculator compares.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{CampaignScope, Identity, IdentityId, ResourceId};

/// Cap on manager-chain depth. Guards against reporting-line cycles in
/// dirty roster data.
const MAX_CHAIN_DEPTH: usize = 20;

/// Extracted features for one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityFeatures {
    pub id: IdentityId,

    // Structural
    pub manager_id: Option<IdentityId>,
    /// Ancestors in the reporting line, nearest first.
    pub manager_chain: Vec<IdentityId>,
    pub team_id: Option<String>,
    pub sub_lob_id: Option<String>,
    pub lob_id: Option<String>,
    pub location_id: Option<String>,
    pub region_id: Option<String>,

    // Functional
    pub title_tokens: BTreeSet<String>,
    /// Hierarchical job path elements: family, then family/code.
    pub job_path: BTreeSet<String>,
    pub cost_center_id: Option<String>,
    pub project_ids: BTreeSet<String>,

    // Behavioral
    pub entitlements: BTreeSet<ResourceId>,
    /// Resource id -> usage intensity in [0,1].
    pub activity_vector: BTreeMap<ResourceId, f32>,

    // Temporal
    pub tenure_days: i64,
    pub time_in_role_days: i64,
    pub hire_quarter: Option<String>,
}

/// Features for the whole campaign population, keyed by identity id.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: HashMap<IdentityId, IdentityFeatures>,
}

impl FeatureSet {
    /// Extract features for every identity in scope.
    ///
    /// All day arithmetic is anchored on `scope.as_of` so repeated runs
    /// over the same snapshot are identical.
    pub fn extract(scope: &CampaignScope) -> Self {
        debug!(identities = scope.identities.len(), "extracting identity features");

        let roster: HashMap<&IdentityId, &Identity> =
            scope.identities.iter().map(|e| (&e.id, e)).collect();

        let mut entitlements: HashMap<&IdentityId, BTreeSet<ResourceId>> = HashMap::new();
        for grant in &scope.grants {
            entitlements
                .entry(&grant.identity_id)
                .or_default()
                .insert(grant.resource_id.clone());
        }

        let mut activity: HashMap<&IdentityId, BTreeMap<ResourceId, f32>> = HashMap::new();
        for summary in &scope.activity {
            activity
                .entry(&summary.identity_id)
                .or_default()
                .insert(summary.resource_id.clone(), summary.intensity());
        }

        let mut features = HashMap::with_capacity(scope.identities.len());
        for identity in &scope.identities {
            let chain = manager_chain(identity, &roster);
            features.insert(
                identity.id.clone(),
                build_features(
                    identity,
                    chain,
                    entitlements.get(&identity.id).cloned().unwrap_or_default(),
                    activity.get(&identity.id).cloned().unwrap_or_default(),
                    scope.as_of,
                ),
            );
        }

        Self { features }
    }

    pub fn get(&self, id: &IdentityId) -> Option<&IdentityFeatures> {
        self.features.get(id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityId, &IdentityFeatures)> {
        self.features.iter()
    }
}

fn build_features(
    identity: &Identity,
    manager_chain: Vec<IdentityId>,
    entitlements: BTreeSet<ResourceId>,
    activity_vector: BTreeMap<ResourceId, f32>,
    as_of: DateTime<Utc>,
) -> IdentityFeatures {
    let as_of_date = as_of.date_naive();

    let tenure_days = identity
        .hire_date
        .map(|d| (as_of_date - d).num_days().max(0))
        .unwrap_or(0);
    let time_in_role_days = identity
        .role_start_date
        .map(|d| (as_of_date - d).num_days().max(0))
        .unwrap_or(0);

    IdentityFeatures {
        id: identity.id.clone(),
        manager_id: identity.manager_id.clone(),
        manager_chain,
        team_id: identity.team_id.clone(),
        sub_lob_id: identity.sub_lob_id.clone(),
        lob_id: identity.lob_id.clone(),
        location_id: identity.location_id.clone(),
        region_id: identity.region_id.clone(),
        title_tokens: tokenize(&identity.job_title),
        job_path: job_path(&identity.job_family, &identity.job_code),
        cost_center_id: identity.cost_center_id.clone(),
        project_ids: identity.project_ids.clone(),
        entitlements,
        activity_vector,
        tenure_days,
        time_in_role_days,
        hire_quarter: identity.hire_quarter(),
    }
}

/// Walk the reporting line upward, nearest ancestor first.
fn manager_chain(
    identity: &Identity,
    roster: &HashMap<&IdentityId, &Identity>,
) -> Vec<IdentityId> {
    let mut chain = Vec::new();
    let mut current = identity.manager_id.clone();

    while let Some(manager) = current {
        if chain.len() >= MAX_CHAIN_DEPTH || chain.contains(&manager) || manager == identity.id {
            break;
        }
        current = roster.get(&manager).and_then(|m| m.manager_id.clone());
        chain.push(manager);
    }

    chain
}

/// Lowercased alphanumeric tokens of a job title.
fn tokenize(title: &str) -> BTreeSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Hierarchical job path elements for Jaccard overlap: the family alone,
/// then family/code.
fn job_path(family: &str, code: &str) -> BTreeSet<String> {
    let mut path = BTreeSet::new();
    if !family.is_empty() {
        path.insert(family.to_lowercase());
        if !code.is_empty() {
            path.insert(format!("{}/{}", family.to_lowercase(), code.to_lowercase()));
        }
    } else if !code.is_empty() {
        path.insert(code.to_lowercase());
    }
    path
}
