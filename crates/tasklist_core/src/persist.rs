//! Persistence gateway between the task store and one durable slot.
//!
//! # Responsibility
//! - Wrap the collection in the versioned envelope and write it to one slot.
//! - Load the slot back, discarding corrupted payloads and malformed records.
//! - Produce and parse the export format.
//!
//! # Invariants
//! - A capacity failure triggers exactly one clear-and-retry, never more.
//! - Corruption is healed by deleting the slot; records are never partially
//!   repaired on load.
//! - A parsed envelope without a `tasks` array is left untouched in storage.
//! - Import is lenient: it repairs fields instead of rejecting records.

use crate::clock::{epoch_millis, iso_millis, Clock, SystemClock};
use crate::model::task::{Task, TaskId};
use crate::repo::slot_repo::{SlotError, SlotRepository};
use crate::sanitize::sanitize;
use crate::validate::{positive_integer, validate_task_shape};
use chrono::{DateTime, TimeZone, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Schema version written into every envelope.
pub const ENVELOPE_VERSION: &str = "1.0";
/// Default slot key for the task collection.
pub const DEFAULT_STORAGE_KEY: &str = "tasklist.tasks";

const PROBE_KEY: &str = "__tasklist_probe__";

#[derive(Serialize)]
struct Envelope<'a> {
    version: &'static str,
    timestamp: u64,
    tasks: &'a [Task],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportEnvelope<'a> {
    version: &'static str,
    timestamp: u64,
    exported_at: String,
    task_count: usize,
    tasks: &'a [Task],
}

/// Gateway write/serialization failure.
#[derive(Debug)]
pub enum GatewayError {
    Serialize(serde_json::Error),
    Slot(SlotError),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize tasks: {err}"),
            Self::Slot(err) => write!(f, "failed to write tasks: {err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Slot(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<SlotError> for GatewayError {
    fn from(value: SlotError) -> Self {
        Self::Slot(value)
    }
}

/// Import payload rejection.
#[derive(Debug)]
pub enum ImportError {
    /// Payload is not valid JSON.
    Parse(serde_json::Error),
    /// Payload has no `tasks` array.
    MissingTasks,
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "import payload is not valid JSON: {err}"),
            Self::MissingTasks => write!(f, "import payload has no tasks array"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::MissingTasks => None,
        }
    }
}

/// How the last load resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No slot yet (first run).
    Missing,
    /// Envelope parsed; `dropped` malformed records were skipped.
    Loaded { dropped: usize },
    /// Payload was not JSON; the slot was removed.
    Corrupted,
    /// JSON without a usable `tasks` array; slot left as is.
    MalformedEnvelope,
    /// The backend failed to read.
    ReadFailed,
}

/// Result of `PersistenceGateway::load_report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub tasks: Vec<Task>,
    pub status: LoadStatus,
}

impl LoadReport {
    fn empty(status: LoadStatus) -> Self {
        Self {
            tasks: Vec::new(),
            status,
        }
    }
}

/// Serializes the task collection into one slot of a `SlotRepository`.
pub struct PersistenceGateway<R: SlotRepository> {
    repo: R,
    key: String,
    clock: Box<dyn Clock>,
}

impl<R: SlotRepository> PersistenceGateway<R> {
    /// Creates a gateway writing to `DEFAULT_STORAGE_KEY` with the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_key(repo, DEFAULT_STORAGE_KEY)
    }

    /// Creates a gateway writing to a caller-chosen slot key.
    pub fn with_key(repo: R, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock used for envelope timestamps and task creation.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current instant from the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Writes `tasks` as a versioned envelope.
    ///
    /// On a quota failure the entire store is cleared and the write retried
    /// once; a second failure is returned to the caller, whose in-memory
    /// state stays authoritative.
    pub fn save(&self, tasks: &[Task]) -> Result<(), GatewayError> {
        let payload = serde_json::to_string(&Envelope {
            version: ENVELOPE_VERSION,
            timestamp: epoch_millis(self.now()),
            tasks,
        })?;

        match self.repo.set(&self.key, &payload) {
            Ok(()) => {
                info!(
                    "event=tasks_save module=persist status=ok count={} bytes={}",
                    tasks.len(),
                    payload.len()
                );
                Ok(())
            }
            Err(err) if err.is_quota_exceeded() => {
                warn!(
                    "event=tasks_save module=persist status=quota_exceeded action=clear_and_retry bytes={}",
                    payload.len()
                );
                self.repo.clear()?;
                self.repo.set(&self.key, &payload).map_err(|retry_err| {
                    error!(
                        "event=tasks_save module=persist status=error stage=retry error={retry_err}"
                    );
                    GatewayError::Slot(retry_err)
                })?;
                info!(
                    "event=tasks_save module=persist status=ok stage=retry count={}",
                    tasks.len()
                );
                Ok(())
            }
            Err(err) => {
                error!("event=tasks_save module=persist status=error error={err}");
                Err(err.into())
            }
        }
    }

    /// Loads the collection, returning an empty one on any failure.
    pub fn load(&self) -> Vec<Task> {
        self.load_report().tasks
    }

    /// Loads the collection and reports how the slot was resolved.
    pub fn load_report(&self) -> LoadReport {
        let raw = match self.repo.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("event=tasks_load module=persist status=missing");
                return LoadReport::empty(LoadStatus::Missing);
            }
            Err(err) => {
                error!("event=tasks_load module=persist status=error error={err}");
                return LoadReport::empty(LoadStatus::ReadFailed);
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                info!(
                    "event=tasks_load module=persist status=corrupted action=discard line={} column={}",
                    err.line(),
                    err.column()
                );
                if let Err(remove_err) = self.repo.remove(&self.key) {
                    warn!(
                        "event=tasks_load module=persist status=error stage=discard error={remove_err}"
                    );
                }
                return LoadReport::empty(LoadStatus::Corrupted);
            }
        };

        let Some(records) = parsed.get("tasks").and_then(Value::as_array) else {
            warn!("event=tasks_load module=persist status=malformed_envelope");
            return LoadReport::empty(LoadStatus::MalformedEnvelope);
        };

        let fallback_created_at = parsed
            .get("timestamp")
            .and_then(Value::as_i64)
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(iso_millis)
            .unwrap_or_else(|| iso_millis(DateTime::<Utc>::default()));

        let mut seen = BTreeSet::new();
        let tasks: Vec<Task> = records
            .iter()
            .filter_map(|record| validate_task_shape(record, &fallback_created_at).ok())
            .filter(|task| seen.insert(task.id))
            .collect();
        let dropped = records.len() - tasks.len();

        info!(
            "event=tasks_load module=persist status=ok count={} dropped={}",
            tasks.len(),
            dropped
        );
        LoadReport {
            tasks,
            status: LoadStatus::Loaded { dropped },
        }
    }

    /// Probes the backend with a throwaway write and delete.
    pub fn is_available(&self) -> bool {
        let probe = self
            .repo
            .set(PROBE_KEY, "1")
            .and_then(|()| self.repo.remove(PROBE_KEY));
        match probe {
            Ok(()) => true,
            Err(err) => {
                error!("event=storage_probe module=persist status=error error={err}");
                false
            }
        }
    }

    /// Renders `tasks` as a pretty-printed export document.
    pub fn export_json(&self, tasks: &[Task]) -> Result<String, GatewayError> {
        let now = self.now();
        let document = serde_json::to_string_pretty(&ExportEnvelope {
            version: ENVELOPE_VERSION,
            timestamp: epoch_millis(now),
            exported_at: iso_millis(now),
            task_count: tasks.len(),
            tasks,
        })?;
        info!("event=tasks_export module=persist status=ok count={}", tasks.len());
        Ok(document)
    }

    /// Parses an export document, repairing records instead of rejecting them.
    ///
    /// Records whose sanitized text is empty are dropped. Missing or
    /// duplicate ids are replaced by fresh ids at or after the current
    /// epoch millisecond, `completed` defaults to `false` and `createdAt`
    /// to now.
    pub fn import_json(&self, document: &str) -> Result<Vec<Task>, ImportError> {
        let parsed: Value = serde_json::from_str(document).map_err(ImportError::Parse)?;
        let records = parsed
            .get("tasks")
            .and_then(Value::as_array)
            .ok_or(ImportError::MissingTasks)?;

        let now = self.now();
        let now_iso = iso_millis(now);

        let candidates: Vec<(Option<TaskId>, String, &Value)> = records
            .iter()
            .filter_map(|record| {
                let text = sanitize(record.get("text")?.as_str()?);
                if text.is_empty() {
                    return None;
                }
                Some((record.get("id").and_then(positive_integer), text, record))
            })
            .collect();

        let max_id = candidates
            .iter()
            .filter_map(|(id, _, _)| id.map(TaskId::get))
            .max()
            .unwrap_or(0);
        let mut next_id = max_id.saturating_add(1).max(epoch_millis(now)).max(1);
        let mut used = BTreeSet::new();

        let tasks: Vec<Task> = candidates
            .into_iter()
            .map(|(id, text, record)| {
                let id = match id {
                    Some(id) if used.insert(id) => id,
                    _ => {
                        let fresh = TaskId::saturating(next_id);
                        next_id = next_id.saturating_add(1);
                        used.insert(fresh);
                        fresh
                    }
                };
                Task {
                    id,
                    text,
                    completed: record
                        .get("completed")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    created_at: record
                        .get("createdAt")
                        .and_then(Value::as_str)
                        .filter(|value| !value.trim().is_empty())
                        .unwrap_or(now_iso.as_str())
                        .to_string(),
                }
            })
            .collect();

        info!(
            "event=tasks_import module=persist status=ok received={} kept={}",
            records.len(),
            tasks.len()
        );
        Ok(tasks)
    }
}
