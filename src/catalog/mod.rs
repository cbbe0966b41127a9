//! Recording catalog
//!
//! The recordings directory is the only store. This module provides:
//! - `Recording` snapshots derived from file names and probed durations
//! - Search (`filter`) and date ordering (`sort`)
//! - `RecordingStore`: directory layout, capture relocation, rename, delete
//! - `Catalog`: load/reload of the snapshot and the mutate-then-reload flows

mod catalog;
mod recording;
mod store;

pub use catalog::{derive_created_at, Catalog, DurationProbe, HeaderProbe};
pub use recording::{filter, sort, Recording, SortOrder};
pub use store::{RecordingStore, StoredFile, RECORDINGS_SUBDIR};
