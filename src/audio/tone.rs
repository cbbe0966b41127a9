// Synthetic frame source
//
// Produces real-time paced PCM frames so the capture pipeline can run
// without a microphone driver. Frames are emitted every
// `buffer_duration_ms` until `stop()` is called.

use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

const TONE_AMPLITUDE: f32 = 0.25;

pub struct ToneBackend {
    config: AudioBackendConfig,
    frequency_hz: Option<f32>,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ToneBackend {
    pub fn new(config: AudioBackendConfig, frequency_hz: f32) -> Self {
        Self {
            config,
            frequency_hz: Some(frequency_hz),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn silence(config: AudioBackendConfig) -> Self {
        Self {
            config,
            frequency_hz: None,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Render the frame starting at `frame_offset` (in sample frames)
    fn render(config: &AudioBackendConfig, frequency_hz: Option<f32>, frame_offset: u64) -> Vec<i16> {
        let channels = config.channels.max(1) as usize;
        let total = config.samples_per_frame();
        let mut samples = Vec::with_capacity(total);

        for i in 0..total / channels {
            let value = match frequency_hz {
                Some(freq) => {
                    let t = (frame_offset + i as u64) as f32 / config.sample_rate as f32;
                    ((TAU * freq * t).sin() * TONE_AMPLITUDE * i16::MAX as f32) as i16
                }
                None => 0,
            };
            samples.extend(std::iter::repeat(value).take(channels));
        }

        samples
    }
}

#[async_trait::async_trait]
impl AudioBackend for ToneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.running.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        info!(
            "Starting {} ({}Hz, {} channels)",
            self.name(),
            self.config.sample_rate,
            self.config.channels
        );

        let (tx, rx) = mpsc::channel(100);
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        let frequency_hz = self.frequency_hz;

        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_millis(config.buffer_duration_ms.max(1));
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let frames_per_buffer = config.samples_per_frame() / config.channels.max(1) as usize;
            let mut frame_offset = 0u64;
            let mut timestamp_ms = 0u64;

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;

                let frame = AudioFrame {
                    samples: ToneBackend::render(&config, frequency_hz, frame_offset),
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    debug!("Frame receiver dropped, stopping tone source");
                    break;
                }

                frame_offset += frames_per_buffer as u64;
                timestamp_ms += config.buffer_duration_ms;
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
            // Aborted tasks report a cancellation error, which is expected here
            let _ = task.await;
        }

        info!("{} stopped", self.name());

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        match self.frequency_hz {
            Some(_) => "tone source",
            None => "silence source",
        }
    }
}

impl Drop for ToneBackend {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            debug!("{} dropped while running, aborting", self.name());
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_renders_zeroes() {
        let config = AudioBackendConfig {
            sample_rate: 8000,
            channels: 2,
            buffer_duration_ms: 10,
        };

        let samples = ToneBackend::render(&config, None, 0);

        assert_eq!(samples.len(), 160);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_tone_duplicates_channels() {
        let config = AudioBackendConfig {
            sample_rate: 8000,
            channels: 2,
            buffer_duration_ms: 10,
        };

        let samples = ToneBackend::render(&config, Some(440.0), 0);

        for pair in samples.chunks_exact(2) {
            assert_eq!(pair[0], pair[1]);
        }
        assert!(samples.iter().any(|&s| s != 0));
    }
}
