//! Flutter-facing bindings for the Note-A core.

pub mod api;
