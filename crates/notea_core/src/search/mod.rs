//! Query engine for list views.
//!
//! # Responsibility
//! - Expose pure search/filter/sort functions over task snapshots.
//! - Hold no state of its own; callers pass the store's snapshot in.

pub mod filter;
