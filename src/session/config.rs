use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tick cadences for the session drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How often the capture timer republishes elapsed time while recording
    /// Default: 16ms (one display frame)
    pub elapsed_tick: Duration,

    /// How often playback status is polled while playing
    /// Default: 250ms
    pub progress_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            elapsed_tick: Duration::from_millis(16),
            progress_tick: Duration::from_millis(250),
        }
    }
}
