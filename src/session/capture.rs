use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::stats::CaptureStatus;
use super::ticker::TickerCount;
use super::timer::ElapsedTimer;
use crate::audio::CaptureDevice;
use crate::catalog::RecordingStore;
use crate::clock::Clock;
use crate::error::RecorderError;

/// Lifecycle of one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

/// Result of stopping a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Capture moved into the recordings directory at this path
    Saved(PathBuf),
    /// The device produced no file; nothing was added to the catalog
    NothingSaved,
}

/// State machine around a single capture device
///
/// `Idle -> Recording <-> Paused -> Stopped`. Callers must not overlap calls
/// on one session; the UI issues the next action only after the previous one
/// returned.
pub struct CaptureSession {
    device: Box<dyn CaptureDevice>,
    clock: Arc<dyn Clock>,
    state: CaptureState,
    timer: Option<ElapsedTimer>,
    /// Bumped on every transition so stale tickers can tell they are done
    generation: u64,
}

impl CaptureSession {
    pub fn new(device: Box<dyn CaptureDevice>, clock: Arc<dyn Clock>) -> Self {
        Self {
            device,
            clock,
            state: CaptureState::Idle,
            timer: None,
            generation: 0,
        }
    }

    /// Continue generation numbering from an earlier session
    ///
    /// Keeps generations unique across back-to-back captures sharing one slot.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timer.map(|t| t.started_at())
    }

    /// Active capture time; frozen while paused and after stop
    pub fn elapsed(&self) -> Duration {
        self.timer
            .map(|t| t.elapsed(self.clock.now()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> CaptureStatus {
        CaptureStatus {
            state: self.state,
            started_at: self.started_at(),
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }

    /// Request permission, switch the audio mode and begin capturing
    ///
    /// On any failure the session stays `Idle` and nothing is written.
    pub async fn start(&mut self) -> Result<(), RecorderError> {
        match self.state {
            CaptureState::Idle => {}
            CaptureState::Stopped => return Err(RecorderError::CaptureFinished),
            CaptureState::Recording | CaptureState::Paused => {
                return Err(RecorderError::CaptureAlreadyActive)
            }
        }

        let granted = self
            .device
            .request_permission()
            .await
            .map_err(RecorderError::capture)?;
        if !granted {
            warn!("Microphone permission denied");
            return Err(RecorderError::PermissionDenied);
        }

        self.device
            .configure_for_capture()
            .await
            .map_err(RecorderError::capture)?;
        self.device.start().await.map_err(RecorderError::capture)?;

        let now = self.clock.now();
        self.timer = Some(ElapsedTimer::new(now));
        self.transition(CaptureState::Recording);

        info!("Capture started on {} at {}", self.device.name(), now);
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<CaptureState, RecorderError> {
        if self.state != CaptureState::Recording {
            warn!("Pause ignored: capture is {:?}", self.state);
            return Ok(self.state);
        }

        self.device.pause().await.map_err(RecorderError::capture)?;
        let now = self.clock.now();
        if let Some(timer) = self.timer.as_mut() {
            timer.pause(now);
        }
        self.transition(CaptureState::Paused);

        info!("Capture paused at {:?}", self.elapsed());
        Ok(self.state)
    }

    pub async fn resume(&mut self) -> Result<CaptureState, RecorderError> {
        if self.state != CaptureState::Paused {
            warn!("Resume ignored: capture is {:?}", self.state);
            return Ok(self.state);
        }

        self.device.resume().await.map_err(RecorderError::capture)?;
        let now = self.clock.now();
        if let Some(timer) = self.timer.as_mut() {
            timer.resume(now);
        }
        self.transition(CaptureState::Recording);

        info!("Capture resumed");
        Ok(self.state)
    }

    /// Finalise the device and move its file into `store` as `<started-ms>.<ext>`
    ///
    /// The session ends `Stopped` even when relocation fails; the error then
    /// carries the temporary path so nothing is silently lost.
    pub async fn stop(&mut self, store: &RecordingStore) -> Result<CaptureOutcome, RecorderError> {
        if !matches!(self.state, CaptureState::Recording | CaptureState::Paused) {
            warn!("Stop ignored: capture is {:?}", self.state);
            return Ok(CaptureOutcome::NothingSaved);
        }

        let now = self.clock.now();
        if let Some(timer) = self.timer.as_mut() {
            timer.pause(now);
        }

        let temp = self.device.stop().await;
        self.transition(CaptureState::Stopped);

        let Some(temp_path) = temp.map_err(RecorderError::capture)? else {
            warn!("Capture stopped without producing a file, nothing saved");
            return Ok(CaptureOutcome::NothingSaved);
        };

        let started_ms = self
            .started_at()
            .map(|t| t.timestamp_millis())
            .unwrap_or_else(|| now.timestamp_millis());

        let target = store
            .relocate_capture(&temp_path, started_ms, self.device.extension())
            .await?;

        info!("Capture stopped after {:?}", self.elapsed());
        Ok(CaptureOutcome::Saved(target))
    }

    fn transition(&mut self, to: CaptureState) {
        debug!("Capture {:?} -> {:?}", self.state, to);
        self.state = to;
        self.generation += 1;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if matches!(self.state, CaptureState::Recording | CaptureState::Paused) {
            warn!("Capture dropped while {:?}, discarding it", self.state);
        }
    }
}

/// Owner of the single capture slot
///
/// Holds at most one live [`CaptureSession`], publishes elapsed time on a
/// watch channel and drives the timer while recording. The session is
/// discarded once stopped. Dropping the last clone drops an unfinished
/// session with it, which releases its device.
#[derive(Clone)]
pub struct Recorder {
    slot: Arc<Mutex<Option<CaptureSession>>>,
    store: RecordingStore,
    clock: Arc<dyn Clock>,
    tick: Duration,
    elapsed_tx: Arc<watch::Sender<Duration>>,
    /// Last generation handed out, carried into the next session
    generation: Arc<AtomicU64>,
    tickers: TickerCount,
}

impl Recorder {
    pub fn new(store: RecordingStore, clock: Arc<dyn Clock>, config: &SessionConfig) -> Self {
        let (elapsed_tx, _) = watch::channel(Duration::ZERO);
        Self {
            slot: Arc::new(Mutex::new(None)),
            store,
            clock,
            tick: config.elapsed_tick,
            elapsed_tx: Arc::new(elapsed_tx),
            generation: Arc::new(AtomicU64::new(0)),
            tickers: TickerCount::default(),
        }
    }

    /// Elapsed-time tickers currently running; at most one while recording
    pub fn running_tickers(&self) -> usize {
        self.tickers.get()
    }

    /// Elapsed-time updates for the capture timer display
    pub fn subscribe_elapsed(&self) -> watch::Receiver<Duration> {
        self.elapsed_tx.subscribe()
    }

    pub async fn is_active(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub async fn status(&self) -> CaptureStatus {
        match self.slot.lock().await.as_ref() {
            Some(session) => session.status(),
            None => CaptureStatus::idle(),
        }
    }

    /// Start capturing on `device`
    ///
    /// Rejected with `CaptureAlreadyActive` while another capture holds the slot.
    /// A failed start (including permission denial) leaves the slot empty.
    pub async fn start(&self, device: Box<dyn CaptureDevice>) -> Result<(), RecorderError> {
        let generation = {
            let mut slot = self.slot.lock().await;
            if slot.is_some() {
                return Err(RecorderError::CaptureAlreadyActive);
            }

            let mut session = CaptureSession::new(device, Arc::clone(&self.clock))
                .with_generation(self.generation.load(Ordering::SeqCst));
            session.start().await?;

            self.elapsed_tx.send_replace(Duration::ZERO);
            let generation = session.generation();
            *slot = Some(session);
            generation
        };

        self.spawn_ticker(generation);
        Ok(())
    }

    pub async fn pause(&self) -> Result<CaptureState, RecorderError> {
        let mut slot = self.slot.lock().await;
        let Some(session) = slot.as_mut() else {
            warn!("Pause ignored: no active capture");
            return Ok(CaptureState::Idle);
        };

        let state = session.pause().await?;
        self.elapsed_tx.send_replace(session.elapsed());
        Ok(state)
    }

    pub async fn resume(&self) -> Result<CaptureState, RecorderError> {
        let (state, generation) = {
            let mut slot = self.slot.lock().await;
            let Some(session) = slot.as_mut() else {
                warn!("Resume ignored: no active capture");
                return Ok(CaptureState::Idle);
            };

            (session.resume().await?, session.generation())
        };

        if state == CaptureState::Recording {
            self.spawn_ticker(generation);
        }
        Ok(state)
    }

    /// Stop the active capture, save it into the store and free the slot
    pub async fn stop(&self) -> Result<CaptureOutcome, RecorderError> {
        let Some(mut session) = self.slot.lock().await.take() else {
            warn!("Stop ignored: no active capture");
            return Ok(CaptureOutcome::NothingSaved);
        };

        let outcome = session.stop(&self.store).await;
        self.generation.store(session.generation(), Ordering::SeqCst);
        self.elapsed_tx.send_replace(session.elapsed());
        outcome
    }

    /// Republish elapsed time every tick until the session leaves this run
    ///
    /// The task exits on its own once the session is paused, stopped or
    /// replaced, or the recorder is dropped; no external cancellation is needed.
    fn spawn_ticker(&self, generation: u64) -> JoinHandle<()> {
        let slot = Arc::downgrade(&self.slot);
        let elapsed_tx = Arc::clone(&self.elapsed_tx);
        let tick = self.tick;
        let running = self.tickers.enter();

        tokio::spawn(async move {
            let _running = running;

            loop {
                tokio::time::sleep(tick).await;

                let Some(shared) = slot.upgrade() else {
                    debug!("Recorder dropped, elapsed ticker stopping");
                    break;
                };

                let current = shared.lock().await;
                match current.as_ref() {
                    Some(session)
                        if session.state() == CaptureState::Recording
                            && session.generation() == generation =>
                    {
                        elapsed_tx.send_replace(session.elapsed());
                    }
                    _ => break,
                }
            }

            debug!("Elapsed ticker for run {} finished", generation);
        })
    }
}
