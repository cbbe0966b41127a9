use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::recording::{filter, sort, Recording, SortOrder};
use super::store::{RecordingStore, StoredFile};
use crate::audio::AudioFile;
use crate::clock::Clock;
use crate::error::RecorderError;

/// Read-only duration query for one audio asset
#[async_trait::async_trait]
pub trait DurationProbe: Send + Sync {
    /// `Ok(None)` means the asset opened but reported no duration
    async fn probe(&self, locator: &Path) -> Result<Option<Duration>, RecorderError>;
}

/// Probe that reads container headers through [`AudioFile`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderProbe;

#[async_trait::async_trait]
impl DurationProbe for HeaderProbe {
    async fn probe(&self, locator: &Path) -> Result<Option<Duration>, RecorderError> {
        let path = locator.to_path_buf();
        let probe_failed = |reason: String| RecorderError::ProbeFailed {
            path: locator.to_path_buf(),
            reason,
        };

        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| probe_failed(e.to_string()))?
            .map_err(|e| probe_failed(format!("{e:#}")))?;

        Ok(audio.duration)
    }
}

/// Pick a creation time for a stored file
///
/// Preference: the file stem as epoch milliseconds, then the file's modified
/// or created time, then `now`.
pub fn derive_created_at(
    stem: &str,
    metadata: Option<&Metadata>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if let Some(stamp) = stem
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
    {
        return stamp;
    }

    metadata
        .and_then(|m| m.modified().or_else(|_| m.created()).ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or(now)
}

/// The recordings list, rebuilt from the store on every reload
///
/// `load` is a pure read of the directory; `reload` swaps the held snapshot
/// only when the load succeeds, so a failed enumeration keeps the last good
/// list on screen.
pub struct Catalog {
    store: RecordingStore,
    probe: Arc<dyn DurationProbe>,
    clock: Arc<dyn Clock>,
    snapshot: Vec<Recording>,
}

impl Catalog {
    pub fn new(store: RecordingStore, probe: Arc<dyn DurationProbe>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            probe,
            clock,
            snapshot: Vec::new(),
        }
    }

    pub fn store(&self) -> &RecordingStore {
        &self.store
    }

    /// Recordings from the last successful load, newest first
    pub fn recordings(&self) -> &[Recording] {
        &self.snapshot
    }

    pub fn find(&self, id: &str) -> Option<&Recording> {
        self.snapshot.iter().find(|r| r.id == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&Recording> {
        self.snapshot.iter().find(|r| r.title == title)
    }

    /// Search then order the current snapshot
    pub fn view(&self, query: &str, order: SortOrder) -> Vec<Recording> {
        sort(order, &filter(query, &self.snapshot))
    }

    /// Build a fresh list from storage, newest first
    pub async fn load(&self) -> Result<Vec<Recording>, RecorderError> {
        self.store.ensure_dir().await?;

        info!("Loading recordings from {}", self.store.root().display());

        let files = self.store.list().await?;
        let now = self.clock.now();

        let recordings: Vec<Recording> = stream::iter(files)
            .then(|file| self.build_entry(file, now))
            .collect()
            .await;

        let unknown = recordings.iter().filter(|r| r.duration_ms.is_none()).count();
        info!(
            "Loaded {} recordings ({} with unknown duration)",
            recordings.len(),
            unknown
        );

        Ok(sort(SortOrder::Descending, &recordings))
    }

    /// Replace the snapshot with a fresh load
    pub async fn reload(&mut self) -> Result<&[Recording], RecorderError> {
        self.snapshot = self.load().await?;
        Ok(&self.snapshot)
    }

    /// Rename a recording's file, then reload
    ///
    /// Returns the new locator, or `None` when the title was blank and nothing
    /// changed.
    pub async fn rename(
        &mut self,
        recording: &Recording,
        new_title: &str,
    ) -> Result<Option<PathBuf>, RecorderError> {
        let Some(target) = self.store.rename(recording, new_title).await? else {
            return Ok(None);
        };

        self.reload().await?;
        Ok(Some(target))
    }

    /// Delete a recording after `confirm` approves it, then reload
    ///
    /// Returns `false` when the deletion was declined.
    pub async fn delete<F>(&mut self, recording: &Recording, confirm: F) -> Result<bool, RecorderError>
    where
        F: FnOnce(&Recording) -> bool + Send,
    {
        if !confirm(recording) {
            info!("Deletion of {} cancelled", recording.id);
            return Ok(false);
        }

        self.store.delete(recording).await?;
        self.reload().await?;
        Ok(true)
    }

    async fn build_entry(&self, file: StoredFile, now: DateTime<Utc>) -> Recording {
        let title = Path::new(&file.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file.file_name)
            .to_string();

        let created_at = derive_created_at(&title, file.metadata.as_ref(), now);

        let duration_ms = match self.probe.probe(&file.locator).await {
            Ok(duration) => duration.map(|d| d.as_millis() as u64),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        Recording {
            id: file.file_name,
            title,
            created_at,
            duration_ms,
            locator: file.locator,
        }
    }
}
