//! Audio sessions
//!
//! This module provides the two live interactions with the audio capabilities:
//! - `CaptureSession`: idle -> recording <-> paused -> stopped, saved into the store
//! - `Recorder`: the single capture slot plus its elapsed-time ticker
//! - `PlaybackSession`: one loaded handle, play/pause toggle, per-recording speed
//! - `Player`: the shared playback slot plus its progress ticker

mod capture;
mod config;
mod playback;
mod speed;
mod stats;
mod ticker;
mod timer;

pub use capture::{CaptureOutcome, CaptureSession, CaptureState, Recorder};
pub use config::SessionConfig;
pub use playback::{progress_fraction, PlaybackSession, PlaybackState, Player};
pub use speed::PlaybackSpeed;
pub use stats::{CaptureStatus, PlaybackProgress};
pub use timer::ElapsedTimer;
