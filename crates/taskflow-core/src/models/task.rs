//! Task model

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A task as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique, stable identifier assigned by the server
    pub id: TaskId,
    /// Non-empty title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Completion flag
    #[serde(default)]
    pub is_completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last server-side update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Owning user id (visible to admins listing every task)
    #[serde(default)]
    pub created_by: Option<i64>,
}

impl Task {
    /// Overwrite locally-predicted fields with whatever the server returned.
    ///
    /// Fields the payload omits keep their current value.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
        if patch.updated_at.is_some() {
            self.updated_at = patch.updated_at;
        }
    }
}

/// Reconciliation payload from PATCH/PUT responses. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Validated body for creating or fully replacing a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
}

impl TaskDraft {
    /// Trim both fields, rejecting either one when empty.
    pub fn new(title: &str, description: &str) -> Result<Self, String> {
        let title = crate::util::require_field(title, "Title")?;
        let description = crate::util::require_field(description, "Description")?;
        Ok(Self { title, description })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: TaskId::new(7),
            title: "Write report".to_string(),
            description: "Quarterly numbers".to_string(),
            is_completed: false,
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            updated_at: None,
            created_by: Some(1),
        }
    }

    #[test]
    fn task_parses_server_payload() {
        let payload = r#"{
            "id": 3,
            "title": "Buy milk",
            "description": "2 liters",
            "created_by": 1,
            "created_at": "2024-05-01T10:00:00.123456Z",
            "updated_at": "2024-05-02T08:30:00Z",
            "is_completed": true
        }"#;
        let task: Task = serde_json::from_str(payload).unwrap();
        assert_eq!(task.id, TaskId::new(3));
        assert!(task.is_completed);
        assert_eq!(task.created_by, Some(1));
        assert!(task.updated_at.is_some());
    }

    #[test]
    fn task_requires_id_and_created_at() {
        assert!(serde_json::from_str::<Task>(r#"{"title": "x"}"#).is_err());
    }

    #[test]
    fn apply_patch_keeps_fields_the_payload_omits() {
        let mut task = sample();
        task.is_completed = true;
        task.apply_patch(&TaskPatch {
            title: Some("Write final report".to_string()),
            ..TaskPatch::default()
        });
        assert_eq!(task.title, "Write final report");
        assert_eq!(task.description, "Quarterly numbers");
        assert!(task.is_completed);
    }

    #[test]
    fn task_draft_rejects_blank_fields() {
        assert_eq!(
            TaskDraft::new("   ", "x"),
            Err("Title is required.".to_string())
        );
        assert_eq!(
            TaskDraft::new("x", "\n"),
            Err("Description is required.".to_string())
        );
        let draft = TaskDraft::new(" Title ", " Body ").unwrap();
        assert_eq!(draft.title, "Title");
        assert_eq!(draft.description, "Body");
    }

    #[test]
    fn task_id_parses_from_text() {
        assert_eq!(" 42 ".parse::<TaskId>().unwrap(), TaskId::new(42));
        assert!("abc".parse::<TaskId>().is_err());
    }
}
