use anyhow::Result;
use tokio::sync::mpsc;

use super::tone::ToneBackend;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Buffer size in milliseconds (one frame per buffer)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,      // Voice memo quality
            channels: 1,             // Mono
            buffer_duration_ms: 100, // 100ms buffers
        }
    }
}

impl AudioBackendConfig {
    /// Interleaved samples in one buffer
    pub fn samples_per_frame(&self) -> usize {
        let frames = self.sample_rate as u64 * self.buffer_duration_ms / 1000;
        frames as usize * self.channels as usize
    }
}

/// Source of raw PCM frames feeding a capture device
///
/// Implementations:
/// - Tone: synthetic sine tone (demo and tests)
/// - Silence: zeroed frames
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start producing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop producing audio; the frame channel closes afterwards
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently producing frames
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create a frame source for the given source type
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Box<dyn AudioBackend> {
        match source {
            AudioSource::Tone { frequency_hz } => Box::new(ToneBackend::new(config, frequency_hz)),
            AudioSource::Silence => Box::new(ToneBackend::silence(config)),
        }
    }
}

/// Audio source type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioSource {
    /// Sine tone at the given frequency
    Tone { frequency_hz: f32 },
    /// Digital silence
    Silence,
}
