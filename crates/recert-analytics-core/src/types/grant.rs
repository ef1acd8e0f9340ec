//! Access grants, activity summaries, and the campaign scope snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{Identity, IdentityId};
use super::resource::{Resource, ResourceId};
use super::review::GrantId;

/// An (identity, resource) access pair under review.
///
/// One grant maps to exactly one review item per campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: GrantId,
    pub identity_id: IdentityId,
    pub resource_id: ResourceId,
    pub granted_at: Option<DateTime<Utc>>,
    pub last_certified_at: Option<DateTime<Utc>>,
}

impl AccessGrant {
    pub fn new(
        id: impl Into<String>,
        identity_id: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            id: GrantId::new(id),
            identity_id: IdentityId::new(identity_id),
            resource_id: ResourceId::new(resource_id),
            granted_at: None,
            last_certified_at: None,
        }
    }
}

/// Per (identity, resource) usage counters. May be absent (cold start);
/// absence is treated as dormant, never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub identity_id: IdentityId,
    pub resource_id: ResourceId,
    pub total_access_count: u32,
    pub access_count_30d: u32,
    pub access_count_90d: u32,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ActivitySummary {
    /// Days since last use as of the given instant; None if never used.
    pub fn days_since_last_use(&self, as_of: DateTime<Utc>) -> Option<i64> {
        self.last_used_at.map(|t| (as_of - t).num_days().max(0))
    }

    /// Usage intensity in [0,1]: 30-day count normalized with a cap of 100.
    pub fn intensity(&self) -> f32 {
        (self.access_count_30d as f32 / 100.0).min(1.0)
    }
}

/// Read-only input snapshot for one campaign run.
///
/// `as_of` anchors all day arithmetic (tenure, usage recency) so a re-run
/// over the same snapshot produces identical output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignScope {
    pub campaign_id: Uuid,
    pub as_of: DateTime<Utc>,
    pub identities: Vec<Identity>,
    pub resources: Vec<Resource>,
    pub grants: Vec<AccessGrant>,
    pub activity: Vec<ActivitySummary>,
}

impl CampaignScope {
    pub fn new(campaign_id: Uuid, as_of: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            as_of,
            identities: Vec::new(),
            resources: Vec::new(),
            grants: Vec::new(),
            activity: Vec::new(),
        }
    }
}
