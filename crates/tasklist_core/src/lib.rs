//! Core logic for a single-user task list.
//! This crate is the single source of truth for task invariants; rendering
//! and input wiring live outside it behind `controller::Renderer`.

pub mod clock;
pub mod config;
pub mod confirm;
pub mod controller;
pub mod db;
pub mod debounce;
pub mod logging;
pub mod model;
pub mod persist;
pub mod repo;
pub mod sanitize;
pub mod service;
pub mod validate;
pub mod view;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, TaskListConfig};
pub use confirm::{ConfirmKey, ConfirmOutcome, ConfirmationGate, Resolution};
pub use controller::{DraftFeedback, PendingAction, Renderer, Severity, TaskListController};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::filter::Filter;
pub use model::task::{Task, TaskId};
pub use persist::{GatewayError, ImportError, LoadReport, LoadStatus, PersistenceGateway};
pub use repo::slot_repo::{
    MemorySlotRepository, SlotError, SlotRepository, SlotResult, SqliteSlotRepository,
};
pub use sanitize::{collapse_whitespace, sanitize};
pub use service::task_store::{ImportSummary, StoreError, StoreResult, TaskStore};
pub use validate::{
    check_duplicate, validate_entry, validate_task_shape, validate_text, ShapeError,
    ValidationError,
};
pub use view::{project, Projection, ViewCounts};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
