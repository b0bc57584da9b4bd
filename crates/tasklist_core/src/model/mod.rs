//! Domain model for the task list.
//!
//! # Responsibility
//! - Define the canonical `Task` record shared by store, gateway and view.
//! - Define the process-local view `Filter`.
//!
//! # Invariants
//! - `TaskId` is strictly positive and never reassigned to another task.
//! - `Filter` is UI state only and is never persisted.

pub mod filter;
pub mod task;
