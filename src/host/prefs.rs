//! Save-folder preference storage
//!
//! An absent or empty folder means "use the default output location".

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Currently configured save folder, if any
    async fn save_folder(&self) -> Result<Option<String>>;

    /// Replace the save folder; `None` clears it
    async fn set_save_folder(&self, folder: Option<&str>) -> Result<()>;
}

fn normalize(folder: Option<&str>) -> Option<String> {
    folder
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// Preferences held in memory for the lifetime of the process
pub struct MemoryPreferences {
    folder: Mutex<Option<String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self { folder: Mutex::new(None) }
    }

    pub fn with_folder(folder: &str) -> Self {
        Self { folder: Mutex::new(normalize(Some(folder))) }
    }
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn save_folder(&self) -> Result<Option<String>> {
        Ok(self.folder.lock().unwrap().clone())
    }

    async fn set_save_folder(&self, folder: Option<&str>) -> Result<()> {
        *self.folder.lock().unwrap() = normalize(folder);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPrefs {
    #[serde(rename = "saveFolder", default, skip_serializing_if = "Option::is_none")]
    save_folder: Option<String>,
}

/// Preferences persisted as a small JSON document (`{"saveFolder": "..."}`)
///
/// A missing file reads as "no preferences set".
pub struct JsonFilePreferences {
    path: PathBuf,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<StoredPrefs> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::ConfigError(format!("corrupt preferences {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredPrefs::default()),
            Err(e) => Err(Error::ConfigError(format!(
                "cannot read preferences {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferences {
    async fn save_folder(&self) -> Result<Option<String>> {
        Ok(normalize(self.read().await?.save_folder.as_deref()))
    }

    async fn set_save_folder(&self, folder: Option<&str>) -> Result<()> {
        let mut prefs = self.read().await?;
        prefs.save_folder = normalize(folder);
        let raw = serde_json::to_string_pretty(&prefs)
            .map_err(|e| Error::Other(format!("cannot serialize preferences: {}", e)))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::ConfigError(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&self.path, raw).await.map_err(|e| {
            Error::ConfigError(format!("cannot write preferences {}: {}", self.path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_preferences_treat_blank_as_unset() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.save_folder().await.unwrap(), None);

        prefs.set_save_folder(Some("Shots")).await.unwrap();
        assert_eq!(prefs.save_folder().await.unwrap().as_deref(), Some("Shots"));

        prefs.set_save_folder(Some("   ")).await.unwrap();
        assert_eq!(prefs.save_folder().await.unwrap(), None);
    }

    #[tokio::test]
    async fn json_preferences_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let prefs = JsonFilePreferences::new(&path);

        assert_eq!(prefs.save_folder().await.unwrap(), None);
        prefs.set_save_folder(Some("Captures")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"saveFolder\": \"Captures\""));

        let reopened = JsonFilePreferences::new(&path);
        assert_eq!(reopened.save_folder().await.unwrap().as_deref(), Some("Captures"));

        reopened.set_save_folder(None).await.unwrap();
        assert_eq!(reopened.save_folder().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_preference_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonFilePreferences::new(&path).save_folder().await.unwrap_err();
        assert!(err.to_string().contains("corrupt preferences"));
    }
}
