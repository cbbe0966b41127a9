// Integration tests for loading the recordings catalog from disk

use anyhow::Result;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use voice_recorder::{Catalog, HeaderProbe, ManualClock, RecorderError, RecordingStore, SortOrder};

const NOW_MS: i64 = 1_800_000_000_000;

fn write_wav(path: &Path, millis: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..(millis * 8) {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn set_modified(path: &Path, epoch_ms: u64) -> Result<()> {
    let file = File::options().write(true).open(path)?;
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_millis(epoch_ms))?;
    Ok(())
}

fn catalog_at(root: &Path) -> Catalog {
    Catalog::new(
        RecordingStore::at(root),
        Arc::new(HeaderProbe),
        Arc::new(ManualClock::at_millis(NOW_MS)),
    )
}

#[tokio::test]
async fn test_load_creates_missing_directory() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().join("documents").join("recordings");
    let catalog = catalog_at(&root);

    let recordings = catalog.load().await?;

    assert!(recordings.is_empty());
    assert!(root.is_dir(), "load should create the recordings directory");

    Ok(())
}

#[tokio::test]
async fn test_load_derives_entries_from_files() -> Result<()> {
    let dir = TempDir::new()?;
    write_wav(&dir.path().join("1700000000000.wav"), 1000)?;
    write_wav(&dir.path().join("Meeting Notes.wav"), 2500)?;
    set_modified(&dir.path().join("Meeting Notes.wav"), 1_750_000_000_000)?;

    let recordings = catalog_at(dir.path()).load().await?;
    assert_eq!(recordings.len(), 2);

    let stamped = recordings
        .iter()
        .find(|r| r.id == "1700000000000.wav")
        .ok_or_else(|| anyhow::anyhow!("missing timestamped recording"))?;
    assert_eq!(stamped.title, "1700000000000");
    assert_eq!(stamped.created_at.timestamp_millis(), 1_700_000_000_000);
    assert_eq!(stamped.duration_ms, Some(1000));
    assert_eq!(stamped.locator, dir.path().join("1700000000000.wav"));

    let renamed = recordings
        .iter()
        .find(|r| r.title == "Meeting Notes")
        .ok_or_else(|| anyhow::anyhow!("missing renamed recording"))?;
    assert_eq!(renamed.created_at.timestamp_millis(), 1_750_000_000_000);
    assert_eq!(renamed.duration_ms, Some(2500));

    Ok(())
}

#[tokio::test]
async fn test_load_orders_newest_first() -> Result<()> {
    let dir = TempDir::new()?;
    for stamp in ["1700000300000", "1700000100000", "1700000200000"] {
        write_wav(&dir.path().join(format!("{stamp}.wav")), 100)?;
    }

    let recordings = catalog_at(dir.path()).load().await?;
    let titles: Vec<&str> = recordings.iter().map(|r| r.title.as_str()).collect();

    assert_eq!(titles, ["1700000300000", "1700000200000", "1700000100000"]);

    Ok(())
}

#[tokio::test]
async fn test_unreadable_file_has_unknown_duration() -> Result<()> {
    let dir = TempDir::new()?;
    write_wav(&dir.path().join("1700000000000.wav"), 500)?;
    std::fs::write(dir.path().join("1700000001000.m4a"), b"truncated upload")?;

    let recordings = catalog_at(dir.path()).load().await?;

    assert_eq!(recordings.len(), 2, "a bad file must not hide the others");
    assert_eq!(recordings[0].id, "1700000001000.m4a");
    assert_eq!(recordings[0].duration_ms, None);
    assert_eq!(recordings[1].duration_ms, Some(500));

    Ok(())
}

#[tokio::test]
async fn test_ids_are_unique_and_subdirectories_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    write_wav(&dir.path().join("take.wav"), 100)?;
    write_wav(&dir.path().join("take.m4a"), 100)?;
    write_wav(&dir.path().join("1700000000000.wav"), 100)?;
    std::fs::create_dir(dir.path().join("nested"))?;

    let recordings = catalog_at(dir.path()).load().await?;
    let ids: HashSet<&str> = recordings.iter().map(|r| r.id.as_str()).collect();

    assert_eq!(recordings.len(), 3);
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains("nested"));

    Ok(())
}

#[tokio::test]
async fn test_view_filters_and_orders() -> Result<()> {
    let dir = TempDir::new()?;
    for title in ["Team Meeting", "meeting prep", "Groceries"] {
        write_wav(&dir.path().join(format!("{title}.wav")), 100)?;
    }
    set_modified(&dir.path().join("Team Meeting.wav"), 1_700_000_000_000)?;
    set_modified(&dir.path().join("meeting prep.wav"), 1_700_000_500_000)?;
    set_modified(&dir.path().join("Groceries.wav"), 1_700_000_900_000)?;

    let mut catalog = catalog_at(dir.path());
    catalog.reload().await?;

    let newest: Vec<String> = catalog
        .view("MEET", SortOrder::Descending)
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(newest, ["meeting prep", "Team Meeting"]);

    let oldest: Vec<String> = catalog
        .view("", SortOrder::Ascending)
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(oldest, ["Team Meeting", "meeting prep", "Groceries"]);

    assert!(catalog.view("zzz", SortOrder::Descending).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().join("recordings");
    std::fs::create_dir(&root)?;
    write_wav(&root.join("1700000000000.wav"), 100)?;

    let mut catalog = catalog_at(&root);
    catalog.reload().await?;
    assert_eq!(catalog.recordings().len(), 1);

    // Replace the directory with a plain file so enumeration cannot succeed
    std::fs::remove_dir_all(&root)?;
    std::fs::write(&root, b"not a directory")?;

    let result = catalog.reload().await;

    assert!(matches!(
        result,
        Err(RecorderError::Storage { .. } | RecorderError::EnumerationFailed { .. })
    ));
    assert_eq!(catalog.recordings().len(), 1);
    assert_eq!(catalog.recordings()[0].title, "1700000000000");

    Ok(())
}
