//! Domain types for the analytics engine.
//!
//! All inputs (identities, resources, grants, activity) are immutable
//! snapshots for the scope of one campaign run. Outputs ([`ReviewItem`],
//! [`AutoCertAuditRecord`]) are created fresh each run.

mod decision;
mod grant;
mod identity;
mod resource;
mod review;

pub use decision::{DecisionEvent, ReviewerDecision};
pub use grant::{AccessGrant, ActivitySummary, CampaignScope};
pub use identity::{Identity, IdentityId};
pub use resource::{AccessCategory, CategoryId, Resource, ResourceId, SensitivityLevel};
pub use review::{
    AutoCertAuditRecord, Classification, GrantId, RecommendedAction, ReviewItem, UsagePattern,
};
