use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::capture::CaptureState;
use super::playback::PlaybackState;
use super::speed::PlaybackSpeed;

/// Point-in-time view of the capture slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub state: CaptureState,

    /// When the active capture started, if any
    pub started_at: Option<DateTime<Utc>>,

    /// Active (unpaused) time captured so far
    pub elapsed_ms: u64,
}

impl CaptureStatus {
    pub fn idle() -> Self {
        Self {
            state: CaptureState::Idle,
            started_at: None,
            elapsed_ms: 0,
        }
    }
}

/// Point-in-time view of the playback slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackProgress {
    /// Recording the report is about; `None` when nothing is loaded
    pub locator: Option<PathBuf>,

    pub state: PlaybackState,

    /// position / duration, always within [0, 1]
    pub fraction: f64,

    pub speed: PlaybackSpeed,

    /// Set on the report that observed natural completion
    pub just_finished: bool,
}

impl PlaybackProgress {
    pub fn idle() -> Self {
        Self {
            locator: None,
            state: PlaybackState::Idle,
            fraction: 0.0,
            speed: PlaybackSpeed::Normal,
            just_finished: false,
        }
    }
}
