use anyhow::Result;
use tokio::sync::mpsc;

/// A block of captured audio samples.
///
/// Samples are normalized floats in `[-1.0, 1.0]`, interleaved when
/// `channels > 1`. A frame is immutable once captured; whoever receives it
/// from the channel owns it.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Normalized sample amplitudes
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Requested sample rate (the backend picks the closest supported rate)
    pub sample_rate: u32,
    /// Requested channel count (1 = mono)
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
        }
    }
}

/// Audio capture backend trait
///
/// The real implementation is the cpal microphone backend; tests substitute
/// scripted backends that replay a fixed frame sequence.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The
    /// channel closes once the backend has stopped and its capture context
    /// has exited.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    ///
    /// Does not return until the capture context has fully terminated and
    /// the input device has been released.
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
