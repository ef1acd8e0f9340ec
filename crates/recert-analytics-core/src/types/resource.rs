//! Resource catalog types and the sensitivity ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a resource, supplied by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Resource sensitivity, ordered from least to most sensitive.
///
/// The ordering matters: the variant determines a hard ceiling on the
/// assurance score, and `Critical` forces the score to zero regardless of
/// every other signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum SensitivityLevel {
    Public,
    #[default]
    Internal,
    Confidential,
    Critical,
}

impl SensitivityLevel {
    /// All levels, least to most sensitive.
    pub fn all() -> [SensitivityLevel; 4] {
        [
            SensitivityLevel::Public,
            SensitivityLevel::Internal,
            SensitivityLevel::Confidential,
            SensitivityLevel::Critical,
        ]
    }

    /// Display label matching the external catalog values.
    pub fn label(&self) -> &'static str {
        match self {
            SensitivityLevel::Public => "Public",
            SensitivityLevel::Internal => "Internal",
            SensitivityLevel::Confidential => "Confidential",
            SensitivityLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resource in campaign scope. Immutable per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    /// Owning system grouping, e.g. "database", "saas", "fileshare".
    pub system_type: String,
    pub sensitivity: SensitivityLevel,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        system_type: impl Into<String>,
        sensitivity: SensitivityLevel,
    ) -> Self {
        Self {
            id: ResourceId::new(id),
            name: name.into(),
            system_type: system_type.into(),
            sensitivity,
        }
    }

    /// The access category this resource belongs to for graduation tracking.
    pub fn category(&self) -> CategoryId {
        AccessCategory::new(&self.system_type, self.sensitivity).id()
    }
}

/// Key for graduation state: a sensitivity × system-type grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An access category: the unit of graduation.
///
/// Categories group grants whose risk profile is comparable enough to
/// graduate (or roll back) together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessCategory {
    pub system_type: String,
    pub sensitivity: SensitivityLevel,
}

impl AccessCategory {
    pub fn new(system_type: impl Into<String>, sensitivity: SensitivityLevel) -> Self {
        Self {
            system_type: system_type.into(),
            sensitivity,
        }
    }

    /// Stable key, e.g. "database:Confidential".
    pub fn id(&self) -> CategoryId {
        CategoryId(format!("{}:{}", self.system_type, self.sensitivity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitivity_ordering() {
        assert!(SensitivityLevel::Public < SensitivityLevel::Internal);
        assert!(SensitivityLevel::Internal < SensitivityLevel::Confidential);
        assert!(SensitivityLevel::Confidential < SensitivityLevel::Critical);
    }

    #[test]
    fn test_sensitivity_labels() {
        let labels: Vec<&str> = SensitivityLevel::all().iter().map(|s| s.label()).collect();
        assert_eq!(labels, ["Public", "Internal", "Confidential", "Critical"]);
    }

    #[test]
    fn test_category_id_format() {
        let res = Resource::new("res_1", "Payments DB", "database", SensitivityLevel::Critical);
        assert_eq!(res.category().as_str(), "database:Critical");
    }

    #[test]
    fn test_sensitivity_serde() {
        let json = serde_json::to_string(&SensitivityLevel::Confidential).unwrap();
        assert_eq!(json, "\"Confidential\"");
        let back: SensitivityLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SensitivityLevel::Confidential);
    }
}
