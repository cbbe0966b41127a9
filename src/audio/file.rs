use anyhow::{anyhow, Context, Result};
use hound::WavReader;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Header-level facts about an audio file
///
/// Opening an `AudioFile` only reads container headers; samples are never
/// decoded, so probing a long recording is cheap.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    /// `None` when the container does not report a length
    pub duration: Option<Duration>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Probing audio file: {}", path.display());

        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

        if is_wav {
            Self::open_wav(path)
        } else {
            Self::open_container(path)
        }
    }

    fn open_wav(path: &Path) -> Result<Self> {
        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        let spec = reader.spec();

        // `duration()` counts frames per channel
        let frames = u64::from(reader.duration());
        let duration = (spec.sample_rate > 0)
            .then(|| Duration::from_secs_f64(frames as f64 / f64::from(spec.sample_rate)));

        Ok(Self {
            path: path.to_path_buf(),
            duration,
            sample_rate: Some(spec.sample_rate),
            channels: Some(spec.channels),
        })
    }

    fn open_container(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unrecognised audio container")?;

        let track = probed
            .format
            .default_track()
            .ok_or_else(|| anyhow!("no default track"))?;
        let params = &track.codec_params;

        let duration = match (params.n_frames, params.time_base, params.sample_rate) {
            (Some(frames), Some(time_base), _) => {
                let time = time_base.calc_time(frames);
                Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
            }
            (Some(frames), None, Some(rate)) if rate > 0 => {
                Some(Duration::from_secs_f64(frames as f64 / f64::from(rate)))
            }
            _ => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            duration,
            sample_rate: params.sample_rate,
            channels: params.channels.map(|c| c.count() as u16),
        })
    }

    pub fn duration_millis(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}
