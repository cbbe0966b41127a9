use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::speed::PlaybackSpeed;
use super::stats::PlaybackProgress;
use super::ticker::TickerCount;
use crate::audio::{PlaybackDevice, PlaybackHandle};
use crate::error::RecorderError;

/// Lifecycle of the active playback
///
/// `Finished` is transient: natural completion resets to `Idle` with zero
/// progress in the same status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Finished,
}

/// Fraction of the asset played, clamped to [0, 1]; zero when the length is unknown
pub fn progress_fraction(position: Duration, duration: Option<Duration>) -> f64 {
    match duration {
        Some(duration) if !duration.is_zero() => {
            (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

struct ActivePlayback {
    locator: PathBuf,
    handle: Box<dyn PlaybackHandle>,
    state: PlaybackState,
    fraction: f64,
}

/// The playback slot: at most one loaded handle at any time
///
/// Switching to another locator always unloads the previous handle before the
/// next one is loaded. Speeds are remembered per locator.
pub struct PlaybackSession {
    device: Arc<dyn PlaybackDevice>,
    active: Option<ActivePlayback>,
    speeds: HashMap<PathBuf, PlaybackSpeed>,
    generation: u64,
    progress_tx: watch::Sender<PlaybackProgress>,
}

impl PlaybackSession {
    pub fn new(device: Arc<dyn PlaybackDevice>) -> Self {
        let (progress_tx, _) = watch::channel(PlaybackProgress::idle());
        Self {
            device,
            active: None,
            speeds: HashMap::new(),
            generation: 0,
            progress_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackProgress> {
        self.progress_tx.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.active
            .as_ref()
            .map(|a| a.state)
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn active_locator(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.locator.as_path())
    }

    /// Whether `locator` is loaded and currently playing
    pub fn is_playing(&self, locator: &Path) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.locator == locator && a.state == PlaybackState::Playing)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn speed_for(&self, locator: &Path) -> PlaybackSpeed {
        self.speeds.get(locator).copied().unwrap_or_default()
    }

    pub fn progress(&self) -> PlaybackProgress {
        match &self.active {
            Some(active) => PlaybackProgress {
                locator: Some(active.locator.clone()),
                state: active.state,
                fraction: active.fraction,
                speed: self.speed_for(&active.locator),
                just_finished: false,
            },
            None => PlaybackProgress::idle(),
        }
    }

    /// Play control for one recording
    ///
    /// Toggles pause/resume when `locator` is already loaded; otherwise
    /// unloads whatever is loaded, loads `locator` at its selected speed and
    /// starts playing.
    pub async fn play(&mut self, locator: &Path) -> Result<PlaybackState, RecorderError> {
        if let Some(active) = self.active.as_mut().filter(|a| a.locator == locator) {
            let next = match active.state {
                PlaybackState::Playing => {
                    active.handle.pause().await.map_err(RecorderError::playback)?;
                    PlaybackState::Paused
                }
                _ => {
                    active.handle.play().await.map_err(RecorderError::playback)?;
                    PlaybackState::Playing
                }
            };
            active.state = next;
            debug!("Playback of {} now {:?}", locator.display(), next);

            self.generation += 1;
            self.publish();
            return Ok(next);
        }

        self.unload().await?;

        let mut handle = self
            .device
            .load(locator)
            .await
            .map_err(RecorderError::playback)?;

        let speed = self.speed_for(locator);
        let started = async {
            handle.set_rate(speed.multiplier()).await?;
            handle.play().await
        }
        .await;

        if let Err(e) = started {
            // Never leave a loaded handle behind
            if let Err(unload_err) = handle.unload().await {
                warn!("Failed to unload after failed start: {}", unload_err);
            }
            return Err(RecorderError::playback(e));
        }

        info!("Playing {} at {}", locator.display(), speed);

        self.active = Some(ActivePlayback {
            locator: locator.to_path_buf(),
            handle,
            state: PlaybackState::Playing,
            fraction: 0.0,
        });
        self.generation += 1;
        self.publish();

        Ok(PlaybackState::Playing)
    }

    /// Advance `locator` to the next speed step
    ///
    /// Applied immediately if it is the loaded recording, otherwise kept for
    /// its next `play`.
    pub async fn cycle_speed(&mut self, locator: &Path) -> Result<PlaybackSpeed, RecorderError> {
        let next = self.speed_for(locator).next();

        if let Some(active) = self.active.as_mut().filter(|a| a.locator == locator) {
            active
                .handle
                .set_rate(next.multiplier())
                .await
                .map_err(RecorderError::playback)?;
        }

        self.speeds.insert(locator.to_path_buf(), next);
        info!("Speed for {} set to {}", locator.display(), next);

        self.publish();
        Ok(next)
    }

    /// Status callback: refresh progress from the handle
    ///
    /// On natural completion the handle is released and the slot returns to
    /// `Idle` with zero progress.
    pub async fn poll(&mut self) -> Result<PlaybackProgress, RecorderError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(PlaybackProgress::idle());
        };

        if active.state != PlaybackState::Playing {
            return Ok(self.progress());
        }

        let status = active
            .handle
            .status()
            .await
            .map_err(RecorderError::playback)?;

        if !status.did_just_finish {
            active.fraction = progress_fraction(status.position, status.duration);
            self.publish();
            return Ok(self.progress());
        }

        active.state = PlaybackState::Finished;
        info!("Playback of {} finished", active.locator.display());

        let locator = active.locator.clone();
        let speed = self.speed_for(&locator);
        self.unload().await?;

        let finished = PlaybackProgress {
            locator: Some(locator),
            state: PlaybackState::Idle,
            fraction: 0.0,
            speed,
            just_finished: true,
        };
        self.progress_tx.send_replace(finished.clone());
        Ok(finished)
    }

    /// Release the loaded handle, if any; always safe to call
    pub async fn unload(&mut self) -> Result<(), RecorderError> {
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };

        self.generation += 1;
        self.publish();

        active
            .handle
            .unload()
            .await
            .map_err(RecorderError::playback)
    }

    fn publish(&self) {
        self.progress_tx.send_replace(self.progress());
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        // Unloading is async; hand it to the runtime when there is one, otherwise
        // dropping the handle is all that is left
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                info!("Playback session dropped, unloading {}", active.locator.display());
                runtime.spawn(async move {
                    if let Err(e) = active.handle.unload().await {
                        warn!("Failed to unload {}: {}", active.locator.display(), e);
                    }
                });
            }
            Err(_) => warn!(
                "Playback session dropped outside a runtime, releasing {} without unload",
                active.locator.display()
            ),
        }
    }
}

/// Shared playback slot that drives the status callback while playing
///
/// Dropping the last clone drops the session, which unloads its handle.
#[derive(Clone)]
pub struct Player {
    session: Arc<Mutex<PlaybackSession>>,
    tick: Duration,
    tickers: TickerCount,
}

impl Player {
    pub fn new(device: Arc<dyn PlaybackDevice>, config: &SessionConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(PlaybackSession::new(device))),
            tick: config.progress_tick,
            tickers: TickerCount::default(),
        }
    }

    /// Progress tickers currently running; at most one while playing
    pub fn running_tickers(&self) -> usize {
        self.tickers.get()
    }

    pub async fn subscribe(&self) -> watch::Receiver<PlaybackProgress> {
        self.session.lock().await.subscribe()
    }

    pub async fn state(&self) -> PlaybackState {
        self.session.lock().await.state()
    }

    pub async fn progress(&self) -> PlaybackProgress {
        self.session.lock().await.progress()
    }

    pub async fn speed_for(&self, locator: &Path) -> PlaybackSpeed {
        self.session.lock().await.speed_for(locator)
    }

    /// Play/pause toggle; starts the status ticker when playback (re)starts
    pub async fn play(&self, locator: &Path) -> Result<PlaybackState, RecorderError> {
        let (state, generation) = {
            let mut session = self.session.lock().await;
            let state = session.play(locator).await?;
            (state, session.generation())
        };

        if state == PlaybackState::Playing {
            self.spawn_ticker(generation);
        }
        Ok(state)
    }

    pub async fn cycle_speed(&self, locator: &Path) -> Result<PlaybackSpeed, RecorderError> {
        self.session.lock().await.cycle_speed(locator).await
    }

    pub async fn unload(&self) -> Result<(), RecorderError> {
        self.session.lock().await.unload().await
    }

    /// Poll status every tick until this run stops playing or the player is dropped
    fn spawn_ticker(&self, generation: u64) -> JoinHandle<()> {
        let session = Arc::downgrade(&self.session);
        let tick = self.tick;
        let running = self.tickers.enter();

        tokio::spawn(async move {
            let _running = running;

            loop {
                tokio::time::sleep(tick).await;

                let Some(shared) = session.upgrade() else {
                    debug!("Player dropped, progress ticker stopping");
                    break;
                };

                let mut current = shared.lock().await;
                if current.generation() != generation || current.state() != PlaybackState::Playing {
                    break;
                }

                if let Err(e) = current.poll().await {
                    warn!("Playback status poll failed: {}", e);
                    break;
                }
            }

            debug!("Progress ticker for run {} finished", generation);
        })
    }
}
