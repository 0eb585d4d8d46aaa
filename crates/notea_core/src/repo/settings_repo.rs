//! Persisted key/value store for user settings.
//!
//! # Invariants
//! - Missing keys load as `Settings::default()` values.
//! - Boolean values are stored as `"true"` / `"false"` text.

use crate::model::settings::Settings;
use crate::repo::task_repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

const NOTIFICATIONS_ENABLED_KEY: &str = "notifications_enabled";
const DARK_MODE_ENABLED_KEY: &str = "dark_mode_enabled";

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "settings")?;
        Ok(Self { conn })
    }

    /// Loads settings, falling back to defaults for unset keys.
    pub fn load(&self) -> RepoResult<Settings> {
        let defaults = Settings::default();
        Ok(Settings {
            notifications_enabled: self
                .read_bool(NOTIFICATIONS_ENABLED_KEY)?
                .unwrap_or(defaults.notifications_enabled),
            dark_mode_enabled: self
                .read_bool(DARK_MODE_ENABLED_KEY)?
                .unwrap_or(defaults.dark_mode_enabled),
        })
    }

    /// Writes every settings key.
    pub fn save(&self, settings: &Settings) -> RepoResult<()> {
        self.write_bool(NOTIFICATIONS_ENABLED_KEY, settings.notifications_enabled)?;
        self.write_bool(DARK_MODE_ENABLED_KEY, settings.dark_mode_enabled)?;
        Ok(())
    }

    fn read_bool(&self, key: &str) -> RepoResult<Option<bool>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?;

        match value.as_deref() {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(RepoError::InvalidData(format!(
                "invalid boolean `{other}` for settings key `{key}`"
            ))),
        }
    }

    fn write_bool(&self, key: &str, value: bool) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, if value { "true" } else { "false" }],
        )?;
        Ok(())
    }
}
