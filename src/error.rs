use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the recording catalog and the audio sessions
///
/// Capability implementations (devices, frame sources, the audio probe) report
/// failures as `anyhow::Error`; the sessions fold those into the `*Device`
/// variants with the rendered context chain.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Microphone permission was not granted; capture never started
    #[error("microphone permission denied")]
    PermissionDenied,

    /// A capture session is already running
    #[error("a capture session is already active")]
    CaptureAlreadyActive,

    /// The session already ran to `Stopped`; captures are not restartable
    #[error("capture session already stopped; start a new one")]
    CaptureFinished,

    /// The platform capture handle failed
    #[error("capture device error: {0}")]
    CaptureDevice(String),

    /// Duration probe failed for one catalog entry
    #[error("failed to probe {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    /// Listing the storage directory failed
    #[error("failed to enumerate {path}")]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rename target collided or the move failed; the original file is untouched
    #[error("failed to rename {from} to {to}: {reason}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// Title cannot be used as a file name
    #[error("invalid recording title: {0:?}")]
    InvalidTitle(String),

    /// Finished capture could not be moved into the recordings directory
    #[error("failed to move capture {temp_path} to {target}")]
    RelocationFailed {
        temp_path: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The platform playback handle failed
    #[error("playback device error: {0}")]
    PlaybackDevice(String),

    /// Storage directory could not be created or inspected
    #[error("storage error at {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecorderError {
    pub(crate) fn capture(err: anyhow::Error) -> Self {
        Self::CaptureDevice(format!("{err:#}"))
    }

    pub(crate) fn playback(err: anyhow::Error) -> Self {
        Self::PlaybackDevice(format!("{err:#}"))
    }
}
