//! Core use-case services.
//!
//! # Responsibility
//! - Own the in-memory task collection and apply user intents to it.
//! - Keep callers decoupled from validation and persistence details.

pub mod task_store;
