//! Domain model for tasks and user settings.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep enumerated values closed so mutation entry points never see
//!   free-form strings.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod settings;
pub mod task;
