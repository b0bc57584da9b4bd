//! Task domain record.
//!
//! # Responsibility
//! - Define the persisted task shape and its wire field names.
//! - Provide the small lifecycle helpers the store relies on.
//!
//! # Invariants
//! - `id` and `created_at` are fixed at creation and never mutated.
//! - `text` satisfies `validate::validate_text` whenever the task is held by
//!   the store.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Strictly positive numeric task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw id, returning `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Wraps a raw id, mapping zero to one.
    pub(crate) fn saturating(value: u64) -> Self {
        Self(value.max(1))
    }

    /// Returns the raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for TaskId {
    type Error = InvalidTaskId;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidTaskId(value))
    }
}

impl From<TaskId> for u64 {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

/// Error for a zero task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTaskId(pub u64);

impl Display for InvalidTaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "task id must be positive, got {}", self.0)
    }
}

impl Error for InvalidTaskId {}

/// One list item.
///
/// Serialized with camelCase field names (`createdAt`) to match the stored
/// envelope schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within the collection.
    pub id: TaskId,
    /// Trimmed, validated item text.
    pub text: String,
    /// Completion flag; the only mutable field.
    pub completed: bool,
    /// ISO-8601 creation timestamp (UTC, millisecond precision).
    pub created_at: String,
}

impl Task {
    /// Creates an open task.
    pub fn new(id: TaskId, text: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: created_at.into(),
        }
    }

    /// Returns whether the task still needs doing.
    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.completed = !self.completed;
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskId};

    #[test]
    fn task_id_rejects_zero() {
        assert!(TaskId::new(0).is_none());
        assert_eq!(TaskId::new(7).map(TaskId::get), Some(7));
    }

    #[test]
    fn task_uses_camel_case_wire_fields() {
        let id = TaskId::new(1_700_000_000_000).expect("positive id");
        let task = Task::new(id, "Buy milk", "2026-10-18T09:00:00.000Z");

        let json = serde_json::to_value(&task).expect("task should serialize");
        assert_eq!(json["id"], 1_700_000_000_000_u64);
        assert_eq!(json["text"], "Buy milk");
        assert_eq!(json["completed"], false);
        assert_eq!(json["createdAt"], "2026-10-18T09:00:00.000Z");

        let decoded: Task = serde_json::from_value(json).expect("task should deserialize");
        assert_eq!(decoded, task);
    }

    #[test]
    fn deserialize_rejects_zero_id() {
        let value = serde_json::json!({
            "id": 0,
            "text": "zero",
            "completed": false,
            "createdAt": "2026-10-18T09:00:00.000Z"
        });
        let err = serde_json::from_value::<Task>(value).unwrap_err();
        assert!(err.to_string().contains("must be positive"), "unexpected error: {err}");
    }

    #[test]
    fn toggle_flips_completion() {
        let id = TaskId::new(1).expect("positive id");
        let mut task = Task::new(id, "walk", "2026-10-18T09:00:00.000Z");
        assert!(task.is_active());
        assert!(task.toggle());
        assert!(!task.is_active());
        assert!(!task.toggle());
    }
}
