//! Project - the contract a bill of quantities belongs to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{require_text, GkError, Result};
use crate::core::identity::{EntityId, EntityPrefix};

/// A construction project; root scope for BoQ items and sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    /// Short unique code, e.g. "BR-2024"
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewProject {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    /// Validate the form and build the record
    pub fn into_project(self, now: DateTime<Utc>) -> Result<Project> {
        let mut errors = Vec::new();
        require_text(&mut errors, "code", &self.code, 50);
        require_text(&mut errors, "name", &self.name, 255);
        if !errors.is_empty() {
            return Err(GkError::Validation { errors });
        }

        Ok(Project {
            id: EntityId::new(EntityPrefix::Prj),
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            created: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_creation() {
        let project = NewProject::new(" BR-1 ", "Bridge").into_project(Utc::now()).unwrap();
        assert!(project.id.to_string().starts_with("PRJ-"));
        assert_eq!(project.code, "BR-1");
        assert_eq!(project.name, "Bridge");
    }

    #[test]
    fn test_project_requires_code_and_name() {
        let err = NewProject::new("", "").into_project(Utc::now()).unwrap_err();
        let fields: Vec<_> = err.validation_errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["code", "name"]);
    }
}
