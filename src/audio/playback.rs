use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::file::AudioFile;
use crate::clock::Clock;

/// Snapshot reported by a playback handle's status query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    pub position: Duration,
    /// `None` when the asset loaded but reports no length
    pub duration: Option<Duration>,
    pub is_playing: bool,
    /// Set on the first status query after playback reached the end
    pub did_just_finish: bool,
}

/// Audio-playback capability: turns a locator into a loaded handle
#[async_trait::async_trait]
pub trait PlaybackDevice: Send + Sync {
    async fn load(&self, locator: &Path) -> Result<Box<dyn PlaybackHandle>>;
}

/// One loaded audio asset
#[async_trait::async_trait]
pub trait PlaybackHandle: Send + Sync {
    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    /// Apply a playback rate multiplier
    async fn set_rate(&mut self, rate: f32) -> Result<()>;

    async fn status(&mut self) -> Result<PlaybackStatus>;

    /// Release the handle; safe to call more than once
    async fn unload(&mut self) -> Result<()>;
}

/// Clock-driven playback device
///
/// Tracks the media position from elapsed wall time scaled by the playback
/// rate, without rendering audio. Durations come from the header probe.
#[derive(Clone)]
pub struct TimedPlaybackDevice {
    clock: Arc<dyn Clock>,
    open_handles: Arc<AtomicUsize>,
    peak_open_handles: Arc<AtomicUsize>,
}

impl TimedPlaybackDevice {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            open_handles: Arc::new(AtomicUsize::new(0)),
            peak_open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handles currently loaded and not yet unloaded
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously loaded handles seen so far
    pub fn peak_open_handles(&self) -> usize {
        self.peak_open_handles.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlaybackDevice for TimedPlaybackDevice {
    async fn load(&self, locator: &Path) -> Result<Box<dyn PlaybackHandle>> {
        let path = locator.to_path_buf();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .context("Probe task panicked")?
            .with_context(|| format!("Failed to load {}", locator.display()))?;

        let open = self.open_handles.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open_handles.fetch_max(open, Ordering::SeqCst);

        debug!("Loaded {} ({} open handles)", locator.display(), open);

        Ok(Box::new(TimedHandle {
            locator: locator.to_path_buf(),
            duration: audio.duration,
            clock: Arc::clone(&self.clock),
            open_handles: Arc::clone(&self.open_handles),
            rate: 1.0,
            played: Duration::ZERO,
            resumed_at: None,
            finish_reported: false,
            loaded: true,
        }))
    }
}

struct TimedHandle {
    locator: PathBuf,
    duration: Option<Duration>,
    clock: Arc<dyn Clock>,
    open_handles: Arc<AtomicUsize>,
    rate: f32,
    /// Media time accumulated before the current run
    played: Duration,
    /// Wall time the current run started; `None` while paused
    resumed_at: Option<DateTime<Utc>>,
    finish_reported: bool,
    loaded: bool,
}

impl TimedHandle {
    fn position(&self) -> Duration {
        let running = self
            .resumed_at
            .and_then(|at| (self.clock.now() - at).to_std().ok())
            .map(|wall| wall.mul_f32(self.rate))
            .unwrap_or(Duration::ZERO);

        let position = self.played + running;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Fold the current run into `played`
    fn settle(&mut self) {
        self.played = self.position();
        if self.resumed_at.is_some() {
            self.resumed_at = Some(self.clock.now());
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if !self.loaded {
            bail!("{} is not loaded", self.locator.display());
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.loaded {
            self.loaded = false;
            self.resumed_at = None;
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl PlaybackHandle for TimedHandle {
    async fn play(&mut self) -> Result<()> {
        self.ensure_loaded()?;

        if self.resumed_at.is_some() {
            return Ok(());
        }

        if self.duration.is_some_and(|d| self.played >= d) {
            self.played = Duration::ZERO;
            self.finish_reported = false;
        }

        self.resumed_at = Some(self.clock.now());
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.settle();
        self.resumed_at = None;
        Ok(())
    }

    async fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.ensure_loaded()?;
        if !(rate.is_finite() && rate > 0.0) {
            bail!("Invalid playback rate: {}", rate);
        }
        self.settle();
        self.rate = rate;
        Ok(())
    }

    async fn status(&mut self) -> Result<PlaybackStatus> {
        self.ensure_loaded()?;

        let position = self.position();
        let reached_end = self.duration.is_some_and(|d| position >= d);
        let mut did_just_finish = false;

        if reached_end && self.resumed_at.is_some() {
            self.played = position;
            self.resumed_at = None;
            if !self.finish_reported {
                self.finish_reported = true;
                did_just_finish = true;
            }
        }

        Ok(PlaybackStatus {
            position,
            duration: self.duration,
            is_playing: self.resumed_at.is_some(),
            did_just_finish,
        })
    }

    async fn unload(&mut self) -> Result<()> {
        if self.loaded {
            info!("Unloading {}", self.locator.display());
        }
        self.release();
        Ok(())
    }
}

impl Drop for TimedHandle {
    fn drop(&mut self) {
        self.release();
    }
}
