//! Per-chat moderation settings, persisted as a single JSON object keyed by
//! chat id.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, UserId};

/// Deletion delay applied to a chat whose entry is created without an
/// explicit `/set_delete`.
pub const DEFAULT_DELETE_TIME: u64 = 3600;

/// Moderation settings for a single chat. An entry is created lazily by the
/// first configuring command and lives forever after.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Seconds to wait before deleting a message. Always positive.
    pub delete_time: u64,
    /// Skip messages from administrators and the chat owner.
    pub admin_exclude: bool,
    /// Users exempt from deletion in this chat.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub authorized_users: BTreeSet<UserId>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            delete_time: DEFAULT_DELETE_TIME,
            admin_exclude: false,
            authorized_users: BTreeSet::new(),
        }
    }
}

pub type SettingsTable = BTreeMap<ChatId, ChatSettings>;

/// File-backed settings table. All access goes through this store; the mutex
/// keeps concurrently dispatched handlers from interleaving mutations.
pub struct SettingsStore {
    path: PathBuf,
    table: Mutex<SettingsTable>,
}

impl SettingsStore {
    /// Read the persisted table. A missing file yields an empty table; an
    /// unreadable or corrupt file is a startup error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<SettingsTable>(&text)
                .with_context(|| {
                    format!("parse settings file {}", path.display())
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                SettingsTable::new()
            }
            Err(e) => {
                return Err(e).context(format!(
                    "read settings file {}",
                    path.display()
                ))
            }
        };
        for (chat_id, settings) in &table {
            if settings.delete_time == 0 {
                bail!(
                    "settings file {}: delete_time is 0 for chat {chat_id}",
                    path.display()
                );
            }
        }
        log::info!(
            "Loaded settings for {} chat(s) from {}",
            table.len(),
            path.display()
        );
        Ok(Self { path, table: Mutex::new(table) })
    }

    pub fn get(&self, chat_id: ChatId) -> Option<ChatSettings> {
        self.lock().get(&chat_id).cloned()
    }

    pub fn snapshot(&self) -> SettingsTable {
        self.lock().clone()
    }

    /// Apply a mutation to the table, then rewrite the settings file in
    /// full. The write is a direct overwrite; last writer wins.
    pub fn mutate<T>(
        &self,
        f: impl FnOnce(&mut SettingsTable) -> T,
    ) -> Result<T> {
        let mut table = self.lock();
        let result = f(&mut table);
        let json = serde_json::to_string_pretty(&*table)?;
        std::fs::write(&self.path, json).with_context(|| {
            format!("write settings file {}", self.path.display())
        })?;
        Ok(result)
    }

    fn lock(&self) -> MutexGuard<'_, SettingsTable> {
        self.table.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = ChatSettings::default();
        assert_eq!(settings.delete_time, 3600);
        assert!(!settings.admin_exclude);
        assert!(settings.authorized_users.is_empty());
    }

    #[test]
    fn authorized_users_field_is_optional() {
        let settings: ChatSettings = serde_json::from_str(
            r#"{"delete_time": 60, "admin_exclude": true}"#,
        )
        .unwrap();
        assert!(settings.authorized_users.is_empty());

        let json = serde_json::to_string(&ChatSettings::default()).unwrap();
        assert!(!json.contains("authorized_users"));
    }

    #[test]
    fn save_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");

        let store = SettingsStore::load(path.clone())?;
        store.mutate(|table| {
            let entry = table.entry(ChatId(-1001)).or_default();
            entry.delete_time = 2700;
            entry.authorized_users.insert(UserId(42));
            table.entry(ChatId(-1002)).or_default().admin_exclude = true;
        })?;

        let reloaded = SettingsStore::load(path)?;
        similar_asserts::assert_eq!(store.snapshot(), reloaded.snapshot());
        assert_eq!(reloaded.get(ChatId(-1001)).unwrap().delete_time, 2700);
        assert!(reloaded.get(ChatId(-1003)).is_none());
        Ok(())
    }

    #[test]
    fn missing_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            SettingsStore::load(dir.path().join("nonexistent.json")).unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn zero_delete_time_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"-1001": {"delete_time": 0, "admin_exclude": false}}"#,
        )
        .unwrap();
        assert!(SettingsStore::load(path).is_err());
    }
}
