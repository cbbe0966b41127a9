pub mod backend;
pub mod capture;
pub mod file;
pub mod playback;
pub mod tone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use capture::{CaptureDevice, WavCaptureDevice};
pub use file::AudioFile;
pub use playback::{PlaybackDevice, PlaybackHandle, PlaybackStatus, TimedPlaybackDevice};
pub use tone::ToneBackend;
