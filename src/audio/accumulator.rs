use std::path::Path;

use tracing::{info, warn};

use super::backend::AudioFrame;

/// Accumulates the audio frames of one recording session.
///
/// Frames are appended in arrival order and written to disk in a single
/// concatenation at session end. `flush_to_wav` consumes the accumulator,
/// so a session's audio can only be flushed once.
pub struct AudioAccumulator {
    frames: Vec<AudioFrame>,
    sample_rate: u32,
    channels: u16,
}

impl AudioAccumulator {
    /// `sample_rate`/`channels` name the requested capture format; the
    /// session format is adopted from the first frame that arrives, since
    /// the device may not support the requested rate exactly.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            frames: Vec::new(),
            sample_rate,
            channels,
        }
    }

    /// Append one captured frame.
    ///
    /// A frame whose format does not match the session's is dropped, since
    /// concatenating it would corrupt the output file.
    pub fn push(&mut self, frame: AudioFrame) {
        if self.frames.is_empty() {
            self.sample_rate = frame.sample_rate;
            self.channels = frame.channels;
        }
        if frame.sample_rate != self.sample_rate {
            warn!(
                "frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.sample_rate, frame.sample_rate
            );
            return;
        }
        if frame.channels != self.channels {
            warn!(
                "frame channel count mismatch: expected {}, got {}. Dropping frame.",
                self.channels, frame.channels
            );
            return;
        }
        self.frames.push(frame);
    }

    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|f| f.samples.len()).sum()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Concatenate every accumulated frame into one 16-bit PCM WAV file.
    pub fn flush_to_wav(self, path: &Path) -> Result<usize, hound::Error> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;
        let mut written = 0usize;
        for frame in &self.frames {
            for &sample in &frame.samples {
                let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(scaled)?;
                written += 1;
            }
        }
        writer.finalize()?;

        info!(
            "audio flushed: {} ({} samples, {:.1}s)",
            path.display(),
            written,
            written as f64 / (self.sample_rate as f64 * self.channels as f64)
        );

        Ok(written)
    }
}
