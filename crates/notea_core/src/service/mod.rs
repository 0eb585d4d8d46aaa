//! Core use-case services.
//!
//! # Responsibility
//! - Own task state and mediate mutations (`task_store`).
//! - Track bulk-selection state derived from store snapshots (`selection`).

pub mod selection;
pub mod task_store;
