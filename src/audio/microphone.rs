// Microphone backend built on cpal.
//
// The cpal stream is owned by a dedicated capture thread; the stream
// callback forwards frames into a tokio channel, and stopping the backend
// joins the thread so the device is released before `stop` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioFrame, CaptureConfig};

/// Default audio input device, captured on its own thread.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("already capturing");
        }

        let (tx, rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = oneshot::channel();
        self.stop.store(false, Ordering::SeqCst);

        let config = self.config.clone();
        let stop = Arc::clone(&self.stop);
        let handle = std::thread::spawn(move || capture_thread(config, tx, ready_tx, stop));
        self.thread = Some(handle);

        // The thread reports back once the stream is playing (or failed to
        // open), so a device error surfaces here rather than later.
        ready_rx
            .await
            .context("capture thread exited before reporting status")??;

        self.capturing = true;
        info!("microphone capture started ({}Hz requested)", self.config.sample_rate);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .context("join task failed")?
                .map_err(|_| anyhow!("capture thread panicked"))?;
        }

        self.capturing = false;
        info!("microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

/// List the names of all available audio input devices.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("failed to enumerate input devices")?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown Device".to_string()))
        .collect())
}

fn capture_thread(
    config: CaptureConfig,
    tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<()>>,
    stop: Arc<AtomicBool>,
) {
    let stream = match open_input_stream(&config, tx, Arc::clone(&stop)) {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream releases the device before the thread exits.
    drop(stream);
}

fn open_input_stream(
    config: &CaptureConfig,
    tx: mpsc::Sender<AudioFrame>,
    stop: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no default audio input device found"))?;

    let (stream_config, sample_format) = closest_input_config(&device, config.sample_rate)?;
    let native_channels = stream_config.channels;
    let sample_rate = stream_config.sample_rate.0;
    let target_channels = config.channels;
    if target_channels != 1 && target_channels != native_channels {
        warn!(
            "requested {} channels, device delivers {}; capturing at native count",
            target_channels, native_channels
        );
    }

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(
            &device, &stream_config, sample_rate, target_channels, tx, stop,
        ),
        SampleFormat::I16 => build_stream::<i16>(
            &device, &stream_config, sample_rate, target_channels, tx, stop,
        ),
        SampleFormat::U16 => build_stream::<u16>(
            &device, &stream_config, sample_rate, target_channels, tx, stop,
        ),
        other => bail!("unsupported input sample format: {other:?}"),
    }?;

    stream.play().context("failed to start input stream")?;
    Ok(stream)
}

/// Pick the supported input config whose rate range lies closest to the
/// requested rate, then pin the rate within that range.
fn closest_input_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<(cpal::StreamConfig, SampleFormat)> {
    let ranges = device
        .supported_input_configs()
        .context("failed to query input configurations")?;

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    let mut best_diff = u32::MAX;
    for range in ranges {
        let clamped = target_rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        let diff = clamped.abs_diff(target_rate);
        if diff < best_diff {
            best_diff = diff;
            best = Some(range);
        }
    }

    let range = best.ok_or_else(|| anyhow!("no supported input configuration found"))?;
    let rate = target_rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    let supported = range.with_sample_rate(cpal::SampleRate(rate));
    let sample_format = supported.sample_format();
    Ok((supported.into(), sample_format))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_rate: u32,
    target_channels: u16,
    tx: mpsc::Sender<AudioFrame>,
    stop: Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let native_channels = config.channels;
    let started = Instant::now();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            let samples: Vec<f32> = data
                .iter()
                .map(|&s| cpal::Sample::from_sample(s))
                .collect();
            let (samples, channels) = downmix(samples, native_channels, target_channels);
            let frame = AudioFrame {
                samples,
                sample_rate,
                channels,
                timestamp_ms: started.elapsed().as_millis() as u64,
            };
            // A lagging receiver drops frames rather than blocking the
            // audio callback.
            let _ = tx.try_send(frame);
        },
        move |err| error!("audio input stream error: {err}"),
        None,
    )?;

    Ok(stream)
}

/// Average interleaved channels down to mono when requested; any other
/// combination passes through at the native channel count.
fn downmix(samples: Vec<f32>, native: u16, target: u16) -> (Vec<f32>, u16) {
    if target == native || native == 0 || target != 1 {
        return (samples, native);
    }
    let n = native as usize;
    let mono: Vec<f32> = samples
        .chunks_exact(n)
        .map(|group| group.iter().sum::<f32>() / n as f32)
        .collect();
    (mono, 1)
}
