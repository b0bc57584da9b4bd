//! Durable key-value slot storage.
//!
//! # Responsibility
//! - Define the minimal slot contract the persistence gateway writes through.
//! - Provide SQLite-backed and in-memory implementations.
//!
//! # Invariants
//! - A write that would push total stored bytes past the quota fails with
//!   `SlotError::QuotaExceeded` and leaves existing slots untouched.
//! - Exactly one logical actor uses a repository at a time.

pub mod slot_repo;
