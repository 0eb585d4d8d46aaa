//! User-facing settings value object.
//!
//! # Invariants
//! - Only `notifications_enabled` drives core behavior; `dark_mode_enabled`
//!   is carried for the presentation layer.
//! - Settings are passed explicitly; there is no process-wide instance.

use serde::{Deserialize, Serialize};

/// Persisted user preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Gates reminder scheduling. Defaults to `false`.
    pub notifications_enabled: bool,
    /// Appearance preference. Defaults to `false`.
    pub dark_mode_enabled: bool,
}

impl Settings {
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
    }

    pub fn set_dark_mode_enabled(&mut self, enabled: bool) {
        self.dark_mode_enabled = enabled;
    }

    /// Returns a copy with reminders switched on or off.
    pub fn with_notifications_enabled(mut self, enabled: bool) -> Self {
        self.set_notifications_enabled(enabled);
        self
    }
}
