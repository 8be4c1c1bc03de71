//! # Settings Store
//!
//! Durable per-guild key-value storage backed by a JSON file. Keys are
//! namespaced as `"{guild}-{key}"`; writes persist immediately.

use crate::domain::traits::SettingsStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct FileSettingsStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileSettingsStore {
    pub fn open(path: &Path) -> Self {
        let values = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        }
    }

    fn save(&self, values: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(values) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.path, json) {
                    tracing::warn!("failed to persist settings to {}: {err}", self.path.display());
                }
            }
            Err(err) => tracing::warn!("failed to serialize settings: {err}"),
        }
    }

    fn namespaced(guild: &str, key: &str) -> String {
        format!("{guild}-{key}")
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, guild: &str, key: &str, default: &str) -> String {
        self.values
            .lock()
            .unwrap()
            .get(&Self::namespaced(guild, key))
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    async fn put(&self, guild: &str, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap();
        values.insert(Self::namespaced(guild, key), value.to_string());
        self.save(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_put_roundtrip_and_namespacing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = FileSettingsStore::open(&path);

        assert_eq!(store.get("g1", "volume", "50").await, "50");
        store.put("g1", "volume", "80").await;
        store.put("g2", "volume", "20").await;
        assert_eq!(store.get("g1", "volume", "50").await, "80");
        assert_eq!(store.get("g2", "volume", "50").await, "20");

        // a fresh handle sees the persisted values
        let reopened = FileSettingsStore::open(&path);
        assert_eq!(reopened.get("g1", "volume", "50").await, "80");
    }
}
