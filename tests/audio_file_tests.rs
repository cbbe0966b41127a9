// Integration tests for the audio header probe
//
// Fixtures are generated on the fly with hound so the tests do not depend
// on binary files in the repository.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use voice_recorder::audio::AudioFile;

fn write_wav(path: &Path, seconds: f64, sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = (seconds * sample_rate as f64) as usize;
    for _ in 0..frames * channels as usize {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn test_probe_wav_duration() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("1700000000000.wav");
    write_wav(&path, 1.5, 8000, 1)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.duration, Some(Duration::from_millis(1500)));
    assert_eq!(audio.duration_millis(), Some(1500));
    assert_eq!(audio.sample_rate, Some(8000));
    assert_eq!(audio.channels, Some(1));
    assert_eq!(audio.path, path);

    Ok(())
}

#[test]
fn test_probe_stereo_counts_frames_not_samples() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    write_wav(&path, 2.0, 16000, 2)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.duration_millis(), Some(2000));
    assert_eq!(audio.channels, Some(2));

    Ok(())
}

#[test]
fn test_probe_empty_wav_has_zero_duration() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("empty.wav");
    write_wav(&path, 0.0, 44100, 1)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.duration, Some(Duration::ZERO));

    Ok(())
}

#[test]
fn test_probe_nonexistent() {
    let result = AudioFile::open("/nonexistent/path/to/audio.wav");

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_probe_not_audio() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("notes.m4a");
    std::fs::write(&path, b"definitely not an mp4 container")?;

    assert!(AudioFile::open(&path).is_err());

    Ok(())
}
