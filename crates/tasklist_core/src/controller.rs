//! Session controller wiring the store to a renderer and confirmation prompt.
//!
//! # Responsibility
//! - Translate user intents into store operations.
//! - Route destructive operations through the confirmation gate.
//! - Re-render after every successful mutation and map failures to messages.
//!
//! # Invariants
//! - Store failures never escape as panics; they become messages or logs.
//! - `NotFound` is logged only; it signals a stale view, not a user mistake.
//! - A save failure after a mutation is a warning; memory stays authoritative.

use crate::confirm::{ConfirmKey, ConfirmOutcome, ConfirmationGate, Resolution};
use crate::debounce::Debouncer;
use crate::model::filter::Filter;
use crate::model::task::{Task, TaskId};
use crate::persist::PersistenceGateway;
use crate::repo::slot_repo::SlotRepository;
use crate::service::task_store::{ImportSummary, StoreError, TaskStore};
use crate::validate::{check_duplicate, validate_entry, ValidationError};
use log::{debug, warn};
use std::time::{Duration, Instant};

const MSG_STORAGE_UNAVAILABLE: &str =
    "Storage is not available. Please reload the page to try again.";
const MSG_SAVE_FAILED: &str =
    "Could not save your changes. They are kept for this session only.";

/// Message severity passed to `Renderer::show_message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
}

/// Presentation collaborator implemented outside the core.
pub trait Renderer {
    fn render_list(&mut self, items: &[Task]);
    fn render_counts(&mut self, total: usize, completed: usize);
    fn render_filter_state(&mut self, active: Filter);
    fn show_message(&mut self, text: &str, severity: Severity);
}

impl<T: Renderer + ?Sized> Renderer for &mut T {
    fn render_list(&mut self, items: &[Task]) {
        (**self).render_list(items);
    }

    fn render_counts(&mut self, total: usize, completed: usize) {
        (**self).render_counts(total, completed);
    }

    fn render_filter_state(&mut self, active: Filter) {
        (**self).render_filter_state(active);
    }

    fn show_message(&mut self, text: &str, severity: Severity) {
        (**self).show_message(text, severity);
    }
}

/// Destructive operation waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    RemoveTask(TaskId),
    ClearCompleted,
}

/// Live validation state of the draft input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftFeedback {
    /// Nothing typed yet; no message is shown.
    Empty,
    Valid,
    Invalid(ValidationError),
    Duplicate,
}

pub struct TaskListController<R: SlotRepository, V: Renderer> {
    store: TaskStore<R>,
    renderer: V,
    gate: ConfirmationGate<PendingAction>,
    draft: Debouncer<String>,
}

impl<R: SlotRepository, V: Renderer> TaskListController<R, V> {
    /// Initializes the store and performs the first render.
    ///
    /// # Errors
    /// - `StorageUnavailable` after showing a blocking reload message.
    pub fn start(
        gateway: PersistenceGateway<R>,
        mut renderer: V,
        draft_debounce: Duration,
    ) -> Result<Self, StoreError> {
        let store = match TaskStore::initialize(gateway) {
            Ok(store) => store,
            Err(err) => {
                renderer.show_message(MSG_STORAGE_UNAVAILABLE, Severity::Error);
                return Err(err);
            }
        };

        let mut controller = Self {
            store,
            renderer,
            gate: ConfirmationGate::new(),
            draft: Debouncer::new(draft_debounce),
        };
        controller.render();
        Ok(controller)
    }

    /// Adds a task from the input field.
    pub fn submit(&mut self, raw_text: &str) -> Option<Task> {
        self.draft.cancel();
        match self.store.add_task(raw_text) {
            Ok(task) => {
                self.renderer.show_message("Task added.", Severity::Success);
                self.after_mutation();
                Some(task)
            }
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    pub fn toggle(&mut self, id: TaskId) -> bool {
        match self.store.toggle_completion(id) {
            Ok(()) => {
                self.after_mutation();
                true
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    /// Opens a delete prompt for `id`. Returns whether a prompt is showing.
    pub fn request_remove(&mut self, id: TaskId) -> bool {
        if self.store.get(id).is_none() {
            self.report(&StoreError::NotFound(id));
            return false;
        }
        self.open_prompt("Delete this task?".to_string(), PendingAction::RemoveTask(id));
        true
    }

    /// Opens a prompt to clear completed tasks, or warns when there are none.
    pub fn request_clear_completed(&mut self) -> bool {
        let completed = self.store.completed_count();
        if completed == 0 {
            self.report(&StoreError::NothingToClear);
            return false;
        }
        self.open_prompt(
            format!("Delete {completed} completed task(s)?"),
            PendingAction::ClearCompleted,
        );
        true
    }

    /// Applies the user's answer to the pending prompt.
    pub fn resolve_confirmation(
        &mut self,
        outcome: ConfirmOutcome,
    ) -> Option<Resolution<PendingAction>> {
        let resolution = self.gate.resolve(outcome)?;
        self.apply_resolution(&resolution);
        Some(resolution)
    }

    /// Keyboard equivalent of the prompt buttons.
    pub fn handle_confirm_key(&mut self, key: ConfirmKey) -> Option<Resolution<PendingAction>> {
        let resolution = self.gate.handle_key(key)?;
        self.apply_resolution(&resolution);
        Some(resolution)
    }

    /// Text of the prompt currently showing.
    pub fn pending_confirmation(&self) -> Option<&str> {
        self.gate.message()
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.store.set_filter(filter);
        self.render();
    }

    /// Records a keystroke in the draft input.
    pub fn draft_input(&mut self, text: impl Into<String>, at: Instant) {
        self.draft.push(text.into(), at);
    }

    /// Validates the draft once typing has paused.
    pub fn poll_draft(&mut self, now: Instant) -> Option<DraftFeedback> {
        let text = self.draft.poll(now)?;
        Some(self.check_draft(&text))
    }

    /// Validates draft text immediately, without changing state.
    pub fn check_draft(&self, text: &str) -> DraftFeedback {
        if text.trim().is_empty() {
            return DraftFeedback::Empty;
        }
        match validate_entry(text) {
            Ok(cleaned) if check_duplicate(&cleaned, self.store.tasks()) => {
                DraftFeedback::Duplicate
            }
            Ok(_) => DraftFeedback::Valid,
            Err(err) => DraftFeedback::Invalid(err),
        }
    }

    pub fn import_json(&mut self, document: &str) -> Option<ImportSummary> {
        match self.store.import_json(document) {
            Ok(summary) => {
                let message = format!(
                    "Imported {} task(s); skipped {} duplicate(s) and {} invalid.",
                    summary.imported, summary.skipped_duplicates, summary.skipped_invalid
                );
                self.renderer.show_message(&message, Severity::Success);
                self.after_mutation();
                Some(summary)
            }
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    pub fn export_json(&mut self) -> Option<String> {
        match self.store.export_json() {
            Ok(document) => Some(document),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    /// Teardown: drops any open prompt and performs the final write.
    pub fn end_session(&mut self) {
        if self.gate.resolve(ConfirmOutcome::Cancelled).is_some() {
            debug!("event=session_end module=controller status=prompt_abandoned");
        }
        self.store.end_session();
    }

    /// Pushes the current projection to the renderer.
    pub fn render(&mut self) {
        let view = self.store.view();
        self.renderer.render_list(&view.items);
        self.renderer
            .render_counts(view.counts.total, view.counts.completed);
        self.renderer.render_filter_state(view.filter);
    }

    pub fn store(&self) -> &TaskStore<R> {
        &self.store
    }

    pub fn renderer(&self) -> &V {
        &self.renderer
    }

    fn open_prompt(&mut self, message: String, action: PendingAction) {
        if let Some(displaced) = self.gate.request(message, action) {
            debug!("event=confirm_request module=controller status=displaced action={displaced:?}");
        }
    }

    fn apply_resolution(&mut self, resolution: &Resolution<PendingAction>) {
        let action = match resolution {
            Resolution::Accepted(action) => *action,
            Resolution::Cancelled(action) => {
                debug!("event=confirm_resolve module=controller status=cancelled action={action:?}");
                return;
            }
        };

        let result = match action {
            PendingAction::RemoveTask(id) => self
                .store
                .remove_task(id)
                .map(|_| "Task deleted.".to_string()),
            PendingAction::ClearCompleted => self
                .store
                .clear_completed()
                .map(|removed| format!("Cleared {removed} completed task(s).")),
        };

        match result {
            Ok(message) => {
                self.renderer.show_message(&message, Severity::Success);
                self.after_mutation();
            }
            Err(err) => self.report(&err),
        }
    }

    fn after_mutation(&mut self) {
        if self.store.take_save_warning().is_some() {
            self.renderer.show_message(MSG_SAVE_FAILED, Severity::Warning);
        }
        self.render();
    }

    fn report(&mut self, err: &StoreError) {
        let severity = match err {
            StoreError::NotFound(id) => {
                warn!("event=controller_report module=controller status=stale_reference id={id}");
                return;
            }
            StoreError::DuplicateTask | StoreError::NothingToClear => Severity::Warning,
            StoreError::InvalidInput(_)
            | StoreError::StorageUnavailable(_)
            | StoreError::Import(_)
            | StoreError::Export(_) => Severity::Error,
        };
        self.renderer.show_message(&err.to_string(), severity);
    }
}
