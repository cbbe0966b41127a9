use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioFrame};

/// Microphone-capture capability
///
/// One device instance backs one capture session. `stop()` finalises and
/// releases the handle and hands back the temporary file it produced, if any.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Ask for microphone access; `false` means denied
    async fn request_permission(&mut self) -> Result<bool>;

    /// Switch the audio mode into recording
    async fn configure_for_capture(&mut self) -> Result<()>;

    /// Acquire the recording handle and begin capturing
    async fn start(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn resume(&mut self) -> Result<()>;

    /// Finalise the recording and release the handle
    ///
    /// Returns the temporary file location, or `None` when nothing was captured
    async fn stop(&mut self) -> Result<Option<PathBuf>>;

    /// Native file extension of produced recordings (without the dot)
    fn extension(&self) -> &str;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Capture device that writes frames from an [`AudioBackend`] to a temporary WAV file
///
/// The file is created lazily on the first frame, so a source that never
/// delivers audio leaves nothing on disk. Frames that arrive while paused are
/// dropped. A capture that fails mid-stream, or a device dropped before
/// `stop()`, removes its partial file.
pub struct WavCaptureDevice {
    source: Box<dyn AudioBackend>,
    temp_dir: PathBuf,
    permission_granted: bool,
    paused: Arc<AtomicBool>,
    discarded: Arc<AtomicBool>,
    writer_task: Option<JoinHandle<Result<Option<PathBuf>>>>,
}

impl WavCaptureDevice {
    pub fn new(source: Box<dyn AudioBackend>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            temp_dir: temp_dir.into(),
            permission_granted: true,
            paused: Arc::new(AtomicBool::new(false)),
            discarded: Arc::new(AtomicBool::new(false)),
            writer_task: None,
        }
    }

    /// Override the microphone permission answer
    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission_granted = granted;
        self
    }

    async fn write_frames(
        mut audio_rx: mpsc::Receiver<AudioFrame>,
        path: PathBuf,
        paused: Arc<AtomicBool>,
        discarded: Arc<AtomicBool>,
    ) -> Result<Option<PathBuf>> {
        let mut writer: Option<CaptureWriter> = None;

        while let Some(frame) = audio_rx.recv().await {
            if paused.load(Ordering::SeqCst) {
                continue;
            }

            if writer.is_none() {
                writer = Some(CaptureWriter::create(&path, &frame)?);
            }

            if let Some(writer) = writer.as_mut() {
                writer.write_frame(&frame)?;
            }
        }

        if discarded.load(Ordering::SeqCst) {
            // Dropping the unfinished writer removes the file
            drop(writer);
            return Ok(None);
        }

        match writer {
            Some(writer) => {
                let samples = writer.finish()?;
                info!("Capture written: {} ({} samples)", path.display(), samples);
                Ok(Some(path))
            }
            None => {
                warn!("Capture produced no audio, no file written");
                Ok(None)
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavCaptureDevice {
    async fn request_permission(&mut self) -> Result<bool> {
        Ok(self.permission_granted)
    }

    async fn configure_for_capture(&mut self) -> Result<()> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| format!("Failed to create temp dir: {}", self.temp_dir.display()))
    }

    async fn start(&mut self) -> Result<()> {
        if self.writer_task.is_some() {
            bail!("Already capturing");
        }

        let path = self
            .temp_dir
            .join(format!("capture-{}.wav", uuid::Uuid::new_v4()));

        let audio_rx = self
            .source
            .start()
            .await
            .context("Failed to start audio source")?;

        self.paused.store(false, Ordering::SeqCst);
        self.discarded.store(false, Ordering::SeqCst);
        let paused = Arc::clone(&self.paused);
        let discarded = Arc::clone(&self.discarded);
        self.writer_task = Some(tokio::spawn(Self::write_frames(
            audio_rx, path, paused, discarded,
        )));

        info!("{} capturing from {}", self.name(), self.source.name());

        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<Option<PathBuf>> {
        let Some(task) = self.writer_task.take() else {
            return Ok(None);
        };

        // Stopping the source closes the frame channel, which ends the writer
        self.source
            .stop()
            .await
            .context("Failed to stop audio source")?;

        task.await.context("Capture writer task panicked")?
    }

    fn extension(&self) -> &str {
        "wav"
    }

    fn name(&self) -> &str {
        "WAV capture"
    }
}

impl Drop for WavCaptureDevice {
    fn drop(&mut self) {
        if let Some(task) = self.writer_task.take() {
            warn!("{} dropped while capturing, discarding the capture", self.name());
            self.discarded.store(true, Ordering::SeqCst);
            task.abort();
        }
    }
}

/// Writes one capture to disk as a 16-bit WAV file
///
/// Only `finish()` keeps the file. A writer dropped before that (a failed
/// write, a cancelled capture) deletes what it wrote.
struct CaptureWriter {
    path: PathBuf,
    spec: hound::WavSpec,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    sample_count: usize,
}

impl CaptureWriter {
    fn create(path: &Path, first_frame: &AudioFrame) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: first_frame.channels,
            sample_rate: first_frame.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        Ok(Self {
            path: path.to_path_buf(),
            spec,
            writer: Some(writer),
            sample_count: 0,
        })
    }

    fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if frame.sample_rate != self.spec.sample_rate || frame.channels != self.spec.channels {
            bail!(
                "Frame format changed mid-capture: {}Hz/{}ch, expected {}Hz/{}ch",
                frame.sample_rate,
                frame.channels,
                self.spec.sample_rate,
                self.spec.channels
            );
        }

        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.sample_count += frame.samples.len();
        }

        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                std::fs::remove_file(&self.path).ok();
                return Err(e).context("Failed to finalize WAV file");
            }
        }

        Ok(self.sample_count)
    }
}

impl Drop for CaptureWriter {
    fn drop(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };

        drop(writer);
        match std::fs::remove_file(&self.path) {
            Ok(()) => warn!("Discarded partial capture {}", self.path.display()),
            Err(e) => warn!("Failed to remove partial capture {}: {}", self.path.display(), e),
        }
    }
}
