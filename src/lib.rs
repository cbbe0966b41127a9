pub mod audio;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod preferences;
pub mod session;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    CaptureDevice, PlaybackDevice, PlaybackHandle, PlaybackStatus, TimedPlaybackDevice,
    WavCaptureDevice,
};
pub use catalog::{Catalog, DurationProbe, HeaderProbe, Recording, RecordingStore, SortOrder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::RecorderError;
pub use preferences::{Preferences, Theme};
pub use session::{
    CaptureOutcome, CaptureSession, CaptureState, CaptureStatus, PlaybackProgress,
    PlaybackSession, PlaybackSpeed, PlaybackState, Player, Recorder, SessionConfig,
};
