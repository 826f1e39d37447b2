use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A persisted task as the client sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskEntry {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub date: DateTime<Utc>,
}

/// One element of a full-replace task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewTask {
    #[validate(
        length(max = 2000, message = "Task text must be under 2000 characters"),
        custom = "not_blank"
    )]
    pub text: String,

    #[serde(default)]
    pub completed: bool,

    pub date: DateTime<Utc>,
}

impl From<&TaskEntry> for NewTask {
    fn from(task: &TaskEntry) -> Self {
        Self {
            text: task.text.clone(),
            completed: task.completed,
            date: task.date,
        }
    }
}

fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Task text must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Newest first; equal dates keep the order they were submitted in.
pub fn sort_by_date_desc(tasks: &mut [TaskEntry]) {
    tasks.sort_by(|a, b| b.date.cmp(&a.date));
}
