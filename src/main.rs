use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use sleepwatch::audio::{list_input_devices, CaptureConfig, MicrophoneBackend};
use sleepwatch::events::{self, ShellEvent};
use sleepwatch::monitor::SpikeMonitor;
use sleepwatch::recording::{RecordError, SynchronizedRecorder};
use sleepwatch::video::CameraSource;
use sleepwatch::Config;

/// Spike-triggered synchronized A/V clip recorder
#[derive(Parser, Debug)]
#[command(name = "sleepwatch", version, about)]
struct Args {
    /// Loudness threshold in dBFS that triggers a recording
    #[arg(long, default_value_t = -30, allow_negative_numbers = true)]
    threshold_db: i32,

    /// Length of each recorded clip in seconds
    #[arg(long, default_value_t = 10)]
    duration: u64,

    /// Configuration file (built-in defaults apply when absent)
    #[arg(long, default_value = "config/sleepwatch")]
    config: String,

    /// Emit shell events as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// List audio input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.list_devices {
        for name in list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let cfg = Config::load(&args.config)?;
    std::fs::create_dir_all(&cfg.recording.output_dir)?;

    info!("sleepwatch v{}", env!("CARGO_PKG_VERSION"));

    let recorder = Arc::new(SynchronizedRecorder::new(cfg.recorder_config()));
    let duration = Duration::from_secs(args.duration);
    let capture = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
    };

    let mut monitor = SpikeMonitor::new(args.threshold_db as f32);
    let mut spikes = monitor
        .start(Box::new(MicrophoneBackend::new(capture.clone())))
        .await?;
    info!(
        "listening (threshold {} dB, clip length {}s)",
        args.threshold_db, args.duration
    );

    let mut rec_task: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            event = spikes.recv() => {
                let Some(spike) = event else { break };
                // At most one recording runs at a time. The monitor keeps
                // listening; crossings that arrive while the session task is
                // unfinished are ignored.
                if rec_task.as_ref().is_some_and(|task| !task.is_finished()) {
                    debug!(
                        "spike at {:.1} dB ignored, recording in progress",
                        spike.level_db
                    );
                    continue;
                }

                info!("spike detected: {:.1} dB", spike.level_db);
                if args.json {
                    events::emit(&ShellEvent::spike_detected(&spike));
                }

                let recorder = Arc::clone(&recorder);
                let capture = capture.clone();
                let video = cfg.video.clone();
                let json = args.json;
                rec_task = Some(tokio::spawn(async move {
                    run_recording(recorder, capture, video, duration, json).await;
                }));
            }
        }
    }

    monitor.stop().await?;
    if let Some(task) = rec_task {
        if !task.is_finished() {
            info!("waiting for in-flight recording to finish");
        }
        let _ = task.await;
    }

    Ok(())
}

/// One recording session, spike to notification.
async fn run_recording(
    recorder: Arc<SynchronizedRecorder>,
    capture: CaptureConfig,
    video: sleepwatch::config::VideoSection,
    duration: Duration,
    json: bool,
) {
    let session_id = uuid::Uuid::new_v4().to_string();
    if json {
        events::emit(&ShellEvent::recording_started(&session_id, duration));
    }

    let result = async {
        let camera = tokio::task::spawn_blocking(move || {
            CameraSource::open(video.device_index, video.width, video.height, video.target_fps)
        })
        .await
        .map_err(|e| RecordError::DeviceUnavailable(e.to_string()))?
        .map_err(|e| RecordError::DeviceUnavailable(e.to_string()))?;

        let microphone = MicrophoneBackend::new(capture);
        recorder
            .record(Box::new(camera), Box::new(microphone), duration)
            .await
    }
    .await;

    match result {
        Ok(stats) => {
            info!(
                "saved {} ({} frames, {:.2} fps{})",
                stats.final_path.display(),
                stats.frames_written,
                stats.actual_fps,
                if stats.retimed { ", retimed" } else { "" }
            );
            if json {
                events::emit(&ShellEvent::recording_complete(&session_id, &stats));
            }
        }
        Err(e) => {
            error!("recording failed: {e}");
            if json {
                events::emit(&ShellEvent::recording_failed(&session_id, &e));
            }
        }
    }
}
