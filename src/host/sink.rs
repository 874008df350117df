//! Output sinks: where finished captures are handed off

use crate::{Error, Result};
use async_trait::async_trait;
use log::info;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Receipt for a saved payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedOutput {
    /// Relative filename the payload was saved under
    pub filename: String,
    /// Where the sink put it (a path for file sinks)
    pub location: String,
    pub size_bytes: usize,
}

/// Accepts an encoded payload under a relative filename such as
/// `shots/full-page-screenshot-2024-01-02T03-04-05-678Z.png`
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn save(&self, filename: &str, payload: &[u8]) -> Result<SavedOutput>;
}

fn save_failure(filename: &str, reason: impl Into<String>) -> Error {
    Error::SaveFailure {
        filename: filename.to_string(),
        reason: reason.into(),
    }
}

/// Writes payloads below a root directory, creating subfolders as needed
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `filename` below the root, refusing anything that would escape it
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let relative = Path::new(filename);
        if filename.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(save_failure(filename, "filename must be a plain relative path"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn save(&self, filename: &str, payload: &[u8]) -> Result<SavedOutput> {
        let path = self.resolve(filename)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| save_failure(filename, format!("cannot create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| save_failure(filename, e.to_string()))?;

        info!("Saved {} ({} bytes)", path.display(), payload.len());
        Ok(SavedOutput {
            filename: filename.to_string(),
            location: path.display().to_string(),
            size_bytes: payload.len(),
        })
    }
}

/// Keeps saved payloads in memory
pub struct MemorySink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    failure: Mutex<Option<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Make every subsequent save fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(reason.into());
    }

    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.saved.lock().unwrap().iter().map(|(f, _)| f.clone()).collect()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn save(&self, filename: &str, payload: &[u8]) -> Result<SavedOutput> {
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(save_failure(filename, reason));
        }
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), payload.to_vec()));
        Ok(SavedOutput {
            filename: filename.to_string(),
            location: format!("memory:{}", filename),
            size_bytes: payload.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_sink_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let saved = sink.save("shots/a.png", b"abc").await.unwrap();

        assert_eq!(saved.size_bytes, 3);
        let written = std::fs::read(dir.path().join("shots").join("a.png")).unwrap();
        assert_eq!(written, b"abc");
    }

    #[tokio::test]
    async fn directory_sink_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        for bad in ["../x.png", "/etc/x.png", "", "./b.png", "a/../../b.png"] {
            let err = sink.save(bad, b"x").await.unwrap_err();
            assert!(matches!(err, Error::SaveFailure { .. }), "{:?} accepted", bad);
        }
    }

    #[tokio::test]
    async fn memory_sink_records_and_fails_on_demand() {
        let sink = MemorySink::new();
        sink.save("a.png", b"1").await.unwrap();
        assert_eq!(sink.filenames(), vec!["a.png".to_string()]);

        sink.fail_with("disk full");
        let err = sink.save("b.png", b"2").await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(err.to_string().contains("b.png"));
        assert_eq!(sink.saved().len(), 1);
    }
}
