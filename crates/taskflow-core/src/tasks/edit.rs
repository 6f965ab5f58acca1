//! Draft state for the task being edited.

use crate::models::{Task, TaskId};

/// Local-only edit session. Nothing is sent until the draft is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub task_id: TaskId,
    pub draft_title: String,
    pub draft_description: String,
}

impl PendingEdit {
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            draft_title: task.title.clone(),
            draft_description: task.description.clone(),
        }
    }

    pub fn update(&mut self, title: Option<&str>, description: Option<&str>) {
        if let Some(title) = title {
            self.draft_title = title.to_string();
        }
        if let Some(description) = description {
            self.draft_description = description.to_string();
        }
    }
}
