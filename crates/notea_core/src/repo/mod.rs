//! Repository layer: persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the persistence gateway the task store mutates through.
//! - Isolate SQLite query details from store and scheduler logic.
//!
//! # Invariants
//! - Repository writes validate tasks before persistence.
//! - Repositories only accept connections prepared by `db::open_db*`.

pub mod settings_repo;
pub mod task_repo;
