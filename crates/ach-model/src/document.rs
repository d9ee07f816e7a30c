//! Achievement content held by the document store

use crate::error::ModelError;
use crate::ids::{DocumentKey, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Schema-flexible achievement content supplied by the student
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementContent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-form category, e.g. `competition`, `publication`, `certification`
    pub category: String,
    /// Competition level, e.g. `national`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Proof file references, in upload order
    #[serde(default)]
    pub files: Vec<String>,
}

impl AchievementContent {
    /// Content with the two required fields
    #[must_use]
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_event_date(mut self, date: NaiveDate) -> Self {
        self.event_date = Some(date);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Check required fields
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::MissingField("title"));
        }
        if self.category.trim().is_empty() {
            return Err(ModelError::MissingField("category"));
        }
        if self.files.iter().any(|f| f.trim().is_empty()) {
            return Err(ModelError::MissingField("files[]"));
        }
        Ok(())
    }
}

/// Stored achievement document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDocument {
    pub key: DocumentKey,
    #[serde(flatten)]
    pub content: AchievementContent,
    /// Account that created the achievement
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AchievementDocument {
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Content stamped with its creator, ready to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub content: AchievementContent,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_requires_title_and_category() {
        assert!(AchievementContent::new("Hackathon winner", "competition")
            .validate()
            .is_ok());
        assert_eq!(
            AchievementContent::new("  ", "competition").validate(),
            Err(ModelError::MissingField("title"))
        );
        assert_eq!(
            AchievementContent::new("Paper", "").validate(),
            Err(ModelError::MissingField("category"))
        );
    }

    #[test]
    fn blank_file_reference_is_rejected() {
        let content = AchievementContent::new("Paper", "publication")
            .with_files(vec!["https://files/a.pdf".into(), String::new()]);
        assert_eq!(content.validate(), Err(ModelError::MissingField("files[]")));
    }

    #[test]
    fn document_flattens_content_on_the_wire() {
        let doc = AchievementDocument {
            key: DocumentKey::from_raw("k1"),
            content: AchievementContent::new("Paper", "publication"),
            created_by: UserId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["title"], "Paper");
        assert_eq!(value["key"], "k1");
        assert!(value.get("content").is_none());
    }
}
