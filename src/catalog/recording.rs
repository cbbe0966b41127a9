use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// One audio file in the recordings directory, as seen by a single catalog load
///
/// Recordings are snapshots: rename and delete act on storage and the catalog
/// is rebuilt, nothing is patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Backing file name, unique within one load
    pub id: String,

    /// File name without its extension
    pub title: String,

    /// Capture time, from the file name when it is an epoch-millisecond stamp
    pub created_at: DateTime<Utc>,

    /// Probed length; `None` when the probe could not report one
    pub duration_ms: Option<u64>,

    /// Full path of the backing audio file
    pub locator: PathBuf,
}

impl Recording {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    /// Extension of the backing file, without the dot
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.id).extension().and_then(|e| e.to_str())
    }
}

/// Date ordering for the recordings list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first
    #[serde(rename = "asc")]
    Ascending,
    /// Newest first
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("asc"),
            SortOrder::Descending => f.write_str("desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "oldest" => Ok(SortOrder::Ascending),
            "desc" | "newest" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Case-insensitive substring match on the title; an empty query keeps everything
pub fn filter(query: &str, recordings: &[Recording]) -> Vec<Recording> {
    if query.is_empty() {
        return recordings.to_vec();
    }

    let needle = query.to_lowercase();
    recordings
        .iter()
        .filter(|r| r.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Stable sort by `created_at`; equal timestamps keep their input order
pub fn sort(order: SortOrder, recordings: &[Recording]) -> Vec<Recording> {
    let mut sorted = recordings.to_vec();
    match order {
        SortOrder::Ascending => sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::Descending => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    sorted
}
