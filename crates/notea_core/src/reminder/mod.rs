//! Reminder scheduling relative to task due dates.
//!
//! # Responsibility
//! - Define the notification collaborator contract.
//! - Compute, register and cancel per-task reminder triggers.
//!
//! # Invariants
//! - Reminder failures are non-fatal and never roll back task data.
//! - A deleted or rescheduled task must not keep dangling triggers.

pub mod memory;
pub mod notifier;
pub mod scheduler;
