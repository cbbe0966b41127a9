// Integration tests for renaming and deleting recordings through the catalog

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use voice_recorder::{Catalog, HeaderProbe, ManualClock, RecorderError, Recording, RecordingStore};

fn write_wav(path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..800 {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

async fn loaded_catalog(dir: &TempDir, names: &[&str]) -> Result<Catalog> {
    for name in names {
        write_wav(&dir.path().join(name))?;
    }

    let mut catalog = Catalog::new(
        RecordingStore::at(dir.path()),
        Arc::new(HeaderProbe),
        Arc::new(ManualClock::at_millis(1_800_000_000_000)),
    );
    catalog.reload().await?;
    Ok(catalog)
}

fn by_id(catalog: &Catalog, id: &str) -> Result<Recording> {
    catalog
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("{id} not in catalog"))
}

#[tokio::test]
async fn test_rename_moves_file_and_keeps_extension() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;

    let target = catalog.rename(&recording, "  Standup  ").await?;

    assert_eq!(target, Some(dir.path().join("Standup.wav")));
    assert!(!recording.locator.exists());

    let renamed = by_id(&catalog, "Standup.wav")?;
    assert_eq!(renamed.title, "Standup");
    assert_eq!(renamed.duration_ms, Some(100));
    assert_eq!(catalog.recordings().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_blank_rename_changes_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;

    assert_eq!(catalog.rename(&recording, "").await?, None);
    assert_eq!(catalog.rename(&recording, "   ").await?, None);

    assert!(recording.locator.exists());
    assert_eq!(catalog.recordings(), [recording]);

    Ok(())
}

#[tokio::test]
async fn test_rename_collision_leaves_both_files() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav", "Standup.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;
    let existing = std::fs::read(dir.path().join("Standup.wav"))?;

    let result = catalog.rename(&recording, "Standup").await;

    assert!(matches!(result, Err(RecorderError::RenameFailed { .. })));
    assert!(recording.locator.exists());
    assert_eq!(std::fs::read(dir.path().join("Standup.wav"))?, existing);
    assert_eq!(catalog.recordings().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_rename_rejects_path_separators() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;

    for title in ["../escape", "a/b", "..", "back\\slash"] {
        let result = catalog.rename(&recording, title).await;
        assert!(
            matches!(result, Err(RecorderError::InvalidTitle(_))),
            "{title:?} should be rejected"
        );
    }
    assert!(recording.locator.exists());

    Ok(())
}

#[tokio::test]
async fn test_rename_to_same_title_is_noop() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["Standup.wav"]).await?;
    let recording = by_id(&catalog, "Standup.wav")?;

    let target = catalog.rename(&recording, "Standup").await?;

    assert_eq!(target, Some(recording.locator.clone()));
    assert!(recording.locator.exists());

    Ok(())
}

#[tokio::test]
async fn test_declined_delete_keeps_file() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;

    let mut asked = None;
    let deleted = catalog
        .delete(&recording, |r| {
            asked = Some(r.title.clone());
            false
        })
        .await?;

    assert!(!deleted);
    assert_eq!(asked.as_deref(), Some("1700000000000"));
    assert!(recording.locator.exists());
    assert_eq!(catalog.recordings().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_confirmed_delete_removes_entry() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav", "1700000001000.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;

    assert!(catalog.delete(&recording, |_| true).await?);

    assert!(!recording.locator.exists());
    assert!(catalog.find("1700000000000.wav").is_none());
    assert_eq!(catalog.recordings().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["1700000000000.wav"]).await?;
    let recording = by_id(&catalog, "1700000000000.wav")?;

    assert!(catalog.delete(&recording, |_| true).await?);
    assert!(catalog.delete(&recording, |_| true).await?);

    let store = RecordingStore::at(dir.path());
    assert!(!store.delete(&recording).await?, "file is already gone");
    assert!(catalog.recordings().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rename_changing_only_case() -> Result<()> {
    let dir = TempDir::new()?;
    let mut catalog = loaded_catalog(&dir, &["standup.wav"]).await?;
    let recording = by_id(&catalog, "standup.wav")?;

    let target = catalog.rename(&recording, "Standup").await?;

    assert_eq!(target, Some(dir.path().join("Standup.wav")));
    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .map(|entry| -> Result<String> { Ok(entry?.file_name().to_string_lossy().into_owned()) })
        .collect::<Result<_>>()?;
    assert_eq!(names, ["Standup.wav"]);
    assert_eq!(by_id(&catalog, "Standup.wav")?.title, "Standup");

    Ok(())
}

#[tokio::test]
async fn test_case_only_rename_onto_distinct_file_collides() -> Result<()> {
    let dir = TempDir::new()?;
    write_wav(&dir.path().join("standup.wav"))?;
    if dir.path().join("Standup.wav").exists() {
        // Case-insensitive filesystem: two such files cannot coexist
        return Ok(());
    }

    let mut catalog = loaded_catalog(&dir, &["Standup.wav"]).await?;
    let recording = by_id(&catalog, "standup.wav")?;

    let result = catalog.rename(&recording, "Standup").await;

    assert!(matches!(result, Err(RecorderError::RenameFailed { .. })));
    assert!(dir.path().join("standup.wav").exists());
    assert!(dir.path().join("Standup.wav").exists());

    Ok(())
}
