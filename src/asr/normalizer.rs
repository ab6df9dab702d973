//! Turns uploaded audio bytes into mono PCM.
//!
//! WAV is read directly. Anything else (browser `webm`/`ogg` recordings,
//! mp3, ...) is transcoded by ffmpeg to 16 kHz mono 16-bit WAV first.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{FftFixedIn, Resampler};
use std::io::Cursor;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::VoiceError;

pub const TRANSCODE_SAMPLE_RATE: u32 = 16_000;

const RESAMPLE_CHUNK: usize = 1024;

/// Mono samples in `[-1.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Encode as a 16-bit mono WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                let clamped = sample.clamp(-1.0, 1.0);
                writer.write_sample((clamped * i16::MAX as f32) as i16)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

/// Average interleaved channels into one. Frame count is preserved.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample mono audio to `target_rate`. Output length is the input
/// length scaled by the rate ratio.
pub fn resample(audio: &PcmAudio, target_rate: u32) -> Result<PcmAudio, VoiceError> {
    if audio.sample_rate == target_rate || audio.samples.is_empty() {
        return Ok(audio.clone());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        audio.sample_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .map_err(|e| VoiceError::Transcode(format!("Failed to create resampler: {e}")))?;
    let resample_err = |e: rubato::ResampleError| VoiceError::Transcode(format!("Resampling failed: {e}"));

    let expected =
        (audio.samples.len() as f64 * target_rate as f64 / audio.sample_rate as f64).round() as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut chunks = audio.samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        let block: [&[f32]; 1] = [chunk];
        let frames = resampler.process(&block[..], None).map_err(resample_err)?;
        out.extend_from_slice(&frames[0]);
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let block: [&[f32]; 1] = [rest];
        let frames = resampler
            .process_partial(Some(&block[..]), None)
            .map_err(resample_err)?;
        out.extend_from_slice(&frames[0]);
    }
    // Flush the filter delay
    while out.len() < expected + delay {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_err)?;
        if frames[0].is_empty() {
            break;
        }
        out.extend_from_slice(&frames[0]);
    }

    out.drain(..delay.min(out.len()));
    out.truncate(expected);
    debug!(
        "Resampled {} Hz -> {} Hz ({} samples)",
        audio.sample_rate,
        target_rate,
        out.len()
    );

    Ok(PcmAudio {
        samples: out,
        sample_rate: target_rate,
    })
}

/// Read a WAV container and downmix it to mono.
pub fn read_wav(bytes: &[u8]) -> Result<PcmAudio, hound::Error> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(PcmAudio {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/// Decodes uploads, falling back to ffmpeg for non-WAV containers
#[derive(Debug, Clone)]
pub struct AudioNormalizer {
    ffmpeg_path: String,
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl AudioNormalizer {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn normalize(&self, bytes: &[u8]) -> Result<PcmAudio, VoiceError> {
        match read_wav(bytes) {
            Ok(audio) => {
                debug!(
                    "Read WAV directly: {} samples at {} Hz",
                    audio.samples.len(),
                    audio.sample_rate
                );
                Ok(audio)
            }
            Err(e) => {
                debug!("Direct decode failed ({}), transcoding with ffmpeg", e);
                self.transcode(bytes).await
            }
        }
    }

    /// Convert arbitrary audio to 16 kHz mono s16 WAV via temp files.
    /// Both files are removed when this returns, on success or failure.
    async fn transcode(&self, bytes: &[u8]) -> Result<PcmAudio, VoiceError> {
        let input = tempfile::Builder::new()
            .suffix(".webm")
            .tempfile()
            .map_err(|e| VoiceError::Transcode(format!("Failed to create temp file: {e}")))?;
        let output = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .map_err(|e| VoiceError::Transcode(format!("Failed to create temp file: {e}")))?;

        tokio::fs::write(input.path(), bytes)
            .await
            .map_err(|e| VoiceError::Transcode(format!("Failed to write temp file: {e}")))?;

        let result = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(input.path())
            .arg("-ar")
            .arg(TRANSCODE_SAMPLE_RATE.to_string())
            .args(["-ac", "1", "-sample_fmt", "s16"])
            .arg(output.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VoiceError::Transcode(format!("ffmpeg not found at '{}'", self.ffmpeg_path))
                } else {
                    VoiceError::Transcode(format!("Failed to run ffmpeg: {e}"))
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!("ffmpeg failed: {}", stderr.trim());
            return Err(VoiceError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let wav = tokio::fs::read(output.path())
            .await
            .map_err(|e| VoiceError::Transcode(format!("Failed to read ffmpeg output: {e}")))?;

        read_wav(&wav)
            .map_err(|e| VoiceError::Transcode(format!("ffmpeg produced unreadable WAV: {e}")))
    }
}
