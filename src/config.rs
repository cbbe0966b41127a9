use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::catalog::{RecordingStore, RECORDINGS_SUBDIR};
use crate::session::SessionConfig;

/// Prefix for environment overrides, e.g. `VOICE_RECORDER__STORAGE__DOCUMENTS_DIR`
pub const ENV_PREFIX: &str = "VOICE_RECORDER";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub audio: AudioConfig,
    pub session: TickConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Application documents area; `~` is expanded
    pub documents_dir: String,
    pub recordings_subdir: String,
    /// Key-value preferences file, relative to `documents_dir`
    pub preferences_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_dir: "~/.voice-recorder".to_string(),
            recordings_subdir: RECORDINGS_SUBDIR.to_string(),
            preferences_file: "preferences.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    /// Where in-progress captures are written; `~` is expanded
    pub temp_dir: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let backend = AudioBackendConfig::default();
        Self {
            sample_rate: backend.sample_rate,
            channels: backend.channels,
            buffer_duration_ms: backend.buffer_duration_ms,
            temp_dir: std::env::temp_dir()
                .join("voice-recorder")
                .display()
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub elapsed_tick_ms: u64,
    pub progress_tick_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            elapsed_tick_ms: session.elapsed_tick.as_millis() as u64,
            progress_tick_ms: session.progress_tick.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `<path>.toml` (optional) with environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn documents_dir(&self) -> PathBuf {
        expand(&self.storage.documents_dir)
    }

    pub fn store(&self) -> RecordingStore {
        RecordingStore::new(self.documents_dir(), &self.storage.recordings_subdir)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.documents_dir().join(&self.storage.preferences_file)
    }

    pub fn temp_dir(&self) -> PathBuf {
        expand(&self.audio.temp_dir)
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            buffer_duration_ms: self.audio.buffer_duration_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            elapsed_tick: Duration::from_millis(self.session.elapsed_tick_ms.max(1)),
            progress_tick: Duration::from_millis(self.session.progress_tick_ms.max(1)),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
