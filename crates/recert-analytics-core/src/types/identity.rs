//! Identity (employee) domain type.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier for an identity, supplied by the external roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An identity in campaign scope.
///
/// Immutable per analytics run; supplied externally as a read-only
/// snapshot. Organizational and job attributes feed the structural and
/// functional proximity dimensions; tenure dates feed the temporal one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,

    // Organizational attributes
    pub manager_id: Option<IdentityId>,
    pub team_id: Option<String>,
    pub sub_lob_id: Option<String>,
    pub lob_id: Option<String>,
    pub location_id: Option<String>,
    pub region_id: Option<String>,

    // Job attributes
    pub job_title: String,
    pub job_code: String,
    pub job_family: String,
    /// Job level on a 1..=7 band scale; 0 means unknown.
    pub job_level: u8,
    pub cost_center_id: Option<String>,
    /// Project assignments, used for functional set overlap.
    #[serde(default)]
    pub project_ids: BTreeSet<String>,

    // Tenure
    pub hire_date: Option<NaiveDate>,
    pub role_start_date: Option<NaiveDate>,
}

impl Identity {
    /// Minimal identity with only an id, everything else unknown.
    /// Intended for tests and cold-start populations.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(id),
            manager_id: None,
            team_id: None,
            sub_lob_id: None,
            lob_id: None,
            location_id: None,
            region_id: None,
            job_title: String::new(),
            job_code: String::new(),
            job_family: String::new(),
            job_level: 0,
            cost_center_id: None,
            project_ids: BTreeSet::new(),
            hire_date: None,
            role_start_date: None,
        }
    }

    /// Hire quarter label, e.g. "2023-Q1". Used for the cohort bonus.
    pub fn hire_quarter(&self) -> Option<String> {
        use chrono::Datelike;
        self.hire_date.map(|d| {
            let quarter = (d.month() - 1) / 3 + 1;
            format!("{}-Q{}", d.year(), quarter)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_id_display() {
        let id = IdentityId::new("emp_042");
        assert_eq!(id.to_string(), "emp_042");
        assert_eq!(id.as_str(), "emp_042");
    }

    #[test]
    fn test_hire_quarter() {
        let mut emp = Identity::bare("emp_1");
        emp.hire_date = NaiveDate::from_ymd_opt(2023, 2, 14);
        assert_eq!(emp.hire_quarter().as_deref(), Some("2023-Q1"));

        emp.hire_date = NaiveDate::from_ymd_opt(2021, 10, 1);
        assert_eq!(emp.hire_quarter().as_deref(), Some("2021-Q4"));
    }

    #[test]
    fn test_hire_quarter_unknown() {
        let emp = Identity::bare("emp_1");
        assert!(emp.hire_quarter().is_none());
    }

    #[test]
    fn test_identity_serde_round_trip() {
        let mut emp = Identity::bare("emp_1");
        emp.job_title = "Staff Engineer".into();
        emp.project_ids.insert("proj_a".into());

        let json = serde_json::to_string(&emp).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, emp);
    }
}
