use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::recording::Recording;
use crate::error::RecorderError;

/// Default subdirectory of the documents area holding recordings
pub const RECORDINGS_SUBDIR: &str = "recordings";

/// A directory entry that may become a catalog entry
#[derive(Debug)]
pub struct StoredFile {
    pub file_name: String,
    pub locator: PathBuf,
    pub metadata: Option<Metadata>,
}

/// The recordings directory: one audio file per recording, no sidecars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Store rooted at `<documents_dir>/<subdir>`
    pub fn new(documents_dir: impl AsRef<Path>, subdir: &str) -> Self {
        Self {
            root: documents_dir.as_ref().join(subdir),
        }
    }

    /// Store rooted directly at `root`
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locator for a recording id; a pure function of the id and the root
    pub fn locator_for(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Create the directory (and parents) if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), RecorderError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| RecorderError::Storage {
                path: self.root.clone(),
                source,
            })
    }

    /// List regular files, sorted by file name
    pub async fn list(&self) -> Result<Vec<StoredFile>, RecorderError> {
        let enumeration_failed = |source| RecorderError::EnumerationFailed {
            path: self.root.clone(),
            source,
        };

        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(enumeration_failed)?;

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(enumeration_failed)? {
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("Skipping non-UTF-8 file name: {:?}", raw);
                    continue;
                }
            };

            let metadata = entry.metadata().await.ok();
            if metadata.as_ref().is_some_and(|m| !m.is_file()) {
                debug!("Skipping non-file entry: {}", file_name);
                continue;
            }

            files.push(StoredFile {
                locator: entry.path(),
                file_name,
                metadata,
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }

    /// Move a finished capture into the store as `<epoch-ms>.<ext>`
    pub async fn relocate_capture(
        &self,
        temp_path: &Path,
        started_at_ms: i64,
        extension: &str,
    ) -> Result<PathBuf, RecorderError> {
        let target = self.root.join(format!("{started_at_ms}.{extension}"));
        let relocation_failed = |source| RecorderError::RelocationFailed {
            temp_path: temp_path.to_path_buf(),
            target: target.clone(),
            source,
        };

        self.ensure_dir().await?;

        if tokio::fs::try_exists(&target).await.map_err(relocation_failed)? {
            return Err(relocation_failed(std::io::Error::new(
                ErrorKind::AlreadyExists,
                "a recording with this timestamp already exists",
            )));
        }

        move_file(temp_path, &target)
            .await
            .map_err(relocation_failed)?;

        info!("Saved recording: {}", target.display());
        Ok(target)
    }

    /// Move a recording to `<new_title>.<ext>`
    ///
    /// Blank titles are ignored and return `Ok(None)`. The original file is
    /// left untouched on any failure.
    pub async fn rename(
        &self,
        recording: &Recording,
        new_title: &str,
    ) -> Result<Option<PathBuf>, RecorderError> {
        let title = new_title.trim();
        if title.is_empty() {
            debug!("Ignoring blank rename for {}", recording.id);
            return Ok(None);
        }

        validate_title(title)?;

        let file_name = match recording.extension() {
            Some(ext) => format!("{title}.{ext}"),
            None => title.to_string(),
        };
        let target = self.locator_for(&file_name);

        if target == recording.locator {
            return Ok(Some(target));
        }

        let rename_failed = |reason: String| RecorderError::RenameFailed {
            from: recording.locator.clone(),
            to: target.clone(),
            reason,
        };

        let collides = match tokio::fs::try_exists(&target).await {
            // On case-insensitive filesystems a case-only rename "exists" as itself
            Ok(true) if is_case_only_change(&recording.id, &file_name) => self
                .has_entry_named(&file_name)
                .await
                .map_err(|e| rename_failed(e.to_string()))?,
            Ok(exists) => exists,
            Err(e) => return Err(rename_failed(e.to_string())),
        };
        if collides {
            return Err(rename_failed("target already exists".to_string()));
        }

        tokio::fs::rename(&recording.locator, &target)
            .await
            .map_err(|e| rename_failed(e.to_string()))?;

        info!("Renamed {} -> {}", recording.id, file_name);
        Ok(Some(target))
    }

    /// Remove a recording's file; a file that is already gone counts as deleted
    ///
    /// Returns whether a file was actually removed.
    pub async fn delete(&self, recording: &Recording) -> Result<bool, RecorderError> {
        match tokio::fs::remove_file(&recording.locator).await {
            Ok(()) => {
                info!("Deleted recording: {}", recording.id);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Recording already gone: {}", recording.id);
                Ok(false)
            }
            Err(source) => Err(RecorderError::DeleteFailed {
                path: recording.locator.clone(),
                source,
            }),
        }
    }
}

impl RecordingStore {
    /// Whether the directory holds an entry spelled exactly `file_name`
    async fn has_entry_named(&self, file_name: &str) -> std::io::Result<bool> {
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_name() == file_name {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Same name apart from letter case
fn is_case_only_change(from: &str, to: &str) -> bool {
    from != to && from.to_lowercase() == to.to_lowercase()
}

fn validate_title(title: &str) -> Result<(), RecorderError> {
    let reserved = title == "." || title == "..";
    let has_separator = title.contains(['/', '\\']) || title.contains('\0');
    if reserved || has_separator {
        return Err(RecorderError::InvalidTitle(title.to_string()));
    }
    Ok(())
}

/// Rename, falling back to copy + remove across filesystems
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!("rename failed ({}), copying instead", e);
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_only_change() {
        assert!(is_case_only_change("standup.wav", "Standup.wav"));
        assert!(is_case_only_change("NOTES.m4a", "notes.m4a"));
        assert!(!is_case_only_change("Standup.wav", "Standup.wav"));
        assert!(!is_case_only_change("standup.wav", "Standup2.wav"));
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Team sync").is_ok());
        assert!(validate_title("a/b").is_err());
        assert!(validate_title("..").is_err());
        assert!(validate_title("nul\0byte").is_err());
    }
}
