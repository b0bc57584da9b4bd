//! Task store: the reducer over the in-memory collection.
//!
//! # Responsibility
//! - Apply add/toggle/remove/clear intents atomically to the collection.
//! - Gate every insert through validation and duplicate detection.
//! - Write the collection through the persistence gateway after each change.
//!
//! # Invariants
//! - New tasks are inserted at the head (most recent first).
//! - Ids are strictly increasing: `max(last_id + 1, now_millis)`.
//! - A failed operation leaves the collection unchanged.
//! - A failed save never rolls back memory; it is surfaced as a warning via
//!   `take_save_warning`.

use crate::clock::{epoch_millis, iso_millis};
use crate::model::filter::Filter;
use crate::model::task::{Task, TaskId};
use crate::persist::{GatewayError, ImportError, LoadStatus, PersistenceGateway};
use crate::repo::slot_repo::SlotRepository;
use crate::validate::{check_duplicate, validate_entry, validate_text, ValidationError};
use crate::view::{counts, projection, Projection, ViewCounts};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Task store operation failure.
#[derive(Debug)]
pub enum StoreError {
    /// Text failed validation; nothing changed.
    InvalidInput(ValidationError),
    /// Normalized text already exists; nothing changed.
    DuplicateTask,
    /// No task with this id (stale UI reference).
    NotFound(TaskId),
    /// `clear_completed` found no completed task.
    NothingToClear,
    /// Storage probe failed at initialization.
    StorageUnavailable(String),
    Import(ImportError),
    Export(GatewayError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::DuplicateTask => write!(f, "this task already exists"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::NothingToClear => write!(f, "no completed tasks to clear"),
            Self::StorageUnavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Import(err) => Some(err),
            Self::Export(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome counters for `TaskStore::import_json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub skipped_invalid: usize,
}

/// In-memory task collection with write-through persistence.
pub struct TaskStore<R: SlotRepository> {
    gateway: PersistenceGateway<R>,
    tasks: Vec<Task>,
    filter: Filter,
    last_id: u64,
    load_status: LoadStatus,
    save_warning: Option<GatewayError>,
}

impl<R: SlotRepository> TaskStore<R> {
    /// Probes storage, loads the persisted collection and resets the filter.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the probe write fails. Load failures are
    ///   not errors; they start an empty collection.
    pub fn initialize(gateway: PersistenceGateway<R>) -> StoreResult<Self> {
        if !gateway.is_available() {
            error!("event=store_init module=store status=error error_code=storage_unavailable");
            return Err(StoreError::StorageUnavailable(
                "storage probe write failed".to_string(),
            ));
        }

        let report = gateway.load_report();
        let last_id = report
            .tasks
            .iter()
            .map(|task| task.id.get())
            .max()
            .unwrap_or(0);
        info!(
            "event=store_init module=store status=ok count={} load_status={:?}",
            report.tasks.len(),
            report.status
        );

        Ok(Self {
            gateway,
            tasks: report.tasks,
            filter: Filter::All,
            last_id,
            load_status: report.status,
            save_warning: None,
        })
    }

    /// Validates, deduplicates and prepends a new task.
    ///
    /// Whitespace runs are collapsed first; length, duplicate detection and
    /// the stored text all use that form.
    pub fn add_task(&mut self, raw_text: &str) -> StoreResult<Task> {
        let text = validate_entry(raw_text).map_err(|err| {
            info!(
                "event=task_add module=store status=rejected reason={}",
                err.reason()
            );
            StoreError::InvalidInput(err)
        })?;

        if check_duplicate(&text, &self.tasks) {
            info!("event=task_add module=store status=rejected reason=duplicate");
            return Err(StoreError::DuplicateTask);
        }

        let now = self.gateway.now();
        let task = Task::new(self.allocate_id(now), text, iso_millis(now));
        self.tasks.insert(0, task.clone());
        info!("event=task_add module=store status=ok id={}", task.id);

        self.persist();
        Ok(task)
    }

    /// Flips completion of one task.
    pub fn toggle_completion(&mut self, id: TaskId) -> StoreResult<()> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            warn!("event=task_toggle module=store status=not_found id={id}");
            return Err(StoreError::NotFound(id));
        };

        let completed = task.toggle();
        info!("event=task_toggle module=store status=ok id={id} completed={completed}");
        self.persist();
        Ok(())
    }

    /// Removes one task. Callers confirm with the user first.
    pub fn remove_task(&mut self, id: TaskId) -> StoreResult<Task> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            warn!("event=task_remove module=store status=not_found id={id}");
            return Err(StoreError::NotFound(id));
        };

        let removed = self.tasks.remove(index);
        info!("event=task_remove module=store status=ok id={id}");
        self.persist();
        Ok(removed)
    }

    /// Removes every completed task and returns how many were removed.
    ///
    /// Callers confirm with the user first when `completed_count() > 0`.
    pub fn clear_completed(&mut self) -> StoreResult<usize> {
        let completed = self.completed_count();
        if completed == 0 {
            info!("event=tasks_clear module=store status=nothing_to_clear");
            return Err(StoreError::NothingToClear);
        }

        self.tasks.retain(Task::is_active);
        info!("event=tasks_clear module=store status=ok removed={completed}");
        self.persist();
        Ok(completed)
    }

    /// Changes the view filter. Not persisted.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Merges an export document into the collection.
    ///
    /// Records are repaired by the gateway, then must pass `validate_text`
    /// and must not duplicate an existing or earlier imported text.
    /// Accepted records keep their relative order and are prepended as one
    /// block; ids that collide with existing tasks are reassigned.
    pub fn import_json(&mut self, document: &str) -> StoreResult<ImportSummary> {
        let incoming = self
            .gateway
            .import_json(document)
            .map_err(StoreError::Import)?;

        self.last_id = incoming
            .iter()
            .map(|task| task.id.get())
            .fold(self.last_id, u64::max);

        let now = self.gateway.now();
        let mut taken: HashSet<TaskId> = self.tasks.iter().map(|task| task.id).collect();
        let mut accepted: Vec<Task> = Vec::new();
        let mut summary = ImportSummary::default();

        for mut task in incoming {
            let Ok(text) = validate_text(&task.text) else {
                summary.skipped_invalid += 1;
                continue;
            };
            if check_duplicate(&text, &self.tasks) || check_duplicate(&text, &accepted) {
                summary.skipped_duplicates += 1;
                continue;
            }
            task.text = text;
            if !taken.insert(task.id) {
                task.id = self.allocate_id(now);
                taken.insert(task.id);
            }
            accepted.push(task);
        }

        summary.imported = accepted.len();
        info!(
            "event=tasks_import module=store status=ok imported={} skipped_duplicates={} skipped_invalid={}",
            summary.imported, summary.skipped_duplicates, summary.skipped_invalid
        );

        if !accepted.is_empty() {
            accepted.append(&mut self.tasks);
            self.tasks = accepted;
            self.persist();
        }
        Ok(summary)
    }

    /// Renders the whole collection as an export document.
    pub fn export_json(&self) -> StoreResult<String> {
        self.gateway
            .export_json(&self.tasks)
            .map_err(StoreError::Export)
    }

    /// Final best-effort write at session teardown.
    ///
    /// Failures are logged only; nobody is left to show them to.
    pub fn end_session(&mut self) {
        match self.gateway.save(&self.tasks) {
            Ok(()) => info!(
                "event=session_end module=store status=ok count={}",
                self.tasks.len()
            ),
            Err(err) => warn!("event=session_end module=store status=error error={err}"),
        }
    }

    /// Returns and clears the warning left by the most recent failed save.
    pub fn take_save_warning(&mut self) -> Option<GatewayError> {
        self.save_warning.take()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    pub fn counts(&self) -> ViewCounts {
        counts(&self.tasks)
    }

    /// Projection under the current filter.
    pub fn view(&self) -> Projection {
        projection(&self.tasks, self.filter)
    }

    /// How the collection was resolved at startup.
    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    pub fn gateway(&self) -> &PersistenceGateway<R> {
        &self.gateway
    }

    fn allocate_id(&mut self, now: DateTime<Utc>) -> TaskId {
        let next = self.last_id.saturating_add(1).max(epoch_millis(now));
        self.last_id = next;
        TaskId::saturating(next)
    }

    fn persist(&mut self) {
        if let Err(err) = self.gateway.save(&self.tasks) {
            warn!("event=store_persist module=store status=degraded error={err}");
            self.save_warning = Some(err);
        }
    }
}
