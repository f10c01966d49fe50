use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::audio::{AudioAccumulator, AudioBackend};
use crate::video::{FfmpegWriter, VideoSource};

use super::config::RecorderConfig;
use super::error::RecordError;
use super::mux::Muxer;
use super::retime::FrameRateCorrector;
use super::stats::RecordingStats;

/// Records one fixed-duration, audio/video-synchronized clip.
///
/// Video frames and audio samples are captured on independent timelines:
/// a paced pump reads camera frames against a monotonic-clock deadline
/// while the audio backend delivers blocks on its own cadence. The two are
/// reconciled afterwards by retiming the video to the measured frame rate
/// and muxing both streams into a single container.
pub struct SynchronizedRecorder {
    config: RecorderConfig,
    corrector: FrameRateCorrector,
    muxer: Muxer,
}

impl SynchronizedRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        let corrector = FrameRateCorrector::new(config.ffmpeg.clone());
        let muxer = Muxer::new(config.ffmpeg.clone());
        Self {
            config,
            corrector,
            muxer,
        }
    }

    /// Replace the external tool components, e.g. with stubs under test.
    pub fn with_tools(
        config: RecorderConfig,
        corrector: FrameRateCorrector,
        muxer: Muxer,
    ) -> Self {
        Self {
            config,
            corrector,
            muxer,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Run one recording session.
    ///
    /// The caller opens the camera; the audio device is opened here, first,
    /// so a device failure aborts before any file exists. On external-tool
    /// failure the temporary files are left in place for diagnosis.
    pub async fn record(
        &self,
        video: Box<dyn VideoSource>,
        mut audio: Box<dyn AudioBackend>,
        duration: Duration,
    ) -> Result<RecordingStats, RecordError> {
        let started_at = Utc::now();
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let video_tmp = self.config.output_dir.join(format!("v_{ts}.mp4"));
        let audio_tmp = self.config.output_dir.join(format!("a_{ts}.wav"));
        let final_path = self.config.output_dir.join(format!("sleep_{ts}.mp4"));

        let mut audio_rx = audio
            .start()
            .await
            .map_err(|e| RecordError::DeviceUnavailable(e.to_string()))?;

        info!(
            "recording {:.0}s clip -> {}",
            duration.as_secs_f64(),
            final_path.display()
        );

        // Audio side: append every delivered frame, no pacing. The channel
        // closes when the backend stops, ending the task.
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;
        let accumulate = tokio::spawn(async move {
            let mut accumulator = AudioAccumulator::new(sample_rate, channels);
            while let Some(frame) = audio_rx.recv().await {
                accumulator.push(frame);
            }
            accumulator
        });

        // Video side: paced pump on a blocking thread.
        let sink = FfmpegWriter::spawn(
            &self.config.ffmpeg,
            &video_tmp,
            self.config.width,
            self.config.height,
            self.config.target_fps,
        )?;
        let target_fps = self.config.target_fps;
        let pump_result =
            tokio::task::spawn_blocking(move || pump_frames(video, sink, target_fps, duration))
                .await;

        // Stop the audio side whether or not the pump succeeded, so the
        // device is always released and the accumulator task ends. Both
        // capture sources are fully stopped before the audio is flushed;
        // the video source was dropped when the pump returned.
        let audio_stopped = audio.stop().await;
        let accumulator = accumulate.await?;
        let frames_written = pump_result??;
        audio_stopped.map_err(|e| RecordError::DeviceUnavailable(e.to_string()))?;

        // The pump exits on a time-based condition, so the nominal duration
        // is exact by construction and the measured rate is attributed
        // entirely to the frame count.
        let duration_secs = duration.as_secs_f64();
        let actual_fps = frames_written as f64 / duration_secs;
        info!(
            "capture finished: {} frames in {:.0}s ({:.2} fps, target {})",
            frames_written, duration_secs, actual_fps, target_fps
        );

        let corrector = self.corrector.clone();
        let muxer = self.muxer.clone();
        let finalize = tokio::task::spawn_blocking(move || -> Result<(PathBuf, bool), RecordError> {
            accumulator.flush_to_wav(&audio_tmp)?;

            let (mux_video, retimed) = if corrector.needs_correction(target_fps as f64, actual_fps)
            {
                let fixed = corrector.retime(&video_tmp, actual_fps)?;
                fs::remove_file(&video_tmp)?;
                (fixed, true)
            } else {
                (video_tmp, false)
            };

            muxer.mux(&mux_video, &audio_tmp, &final_path)?;

            fs::remove_file(&mux_video)?;
            fs::remove_file(&audio_tmp)?;
            Ok((final_path, retimed))
        });
        let (final_path, retimed) = finalize.await??;

        info!("recording complete: {}", final_path.display());

        Ok(RecordingStats {
            final_path,
            started_at,
            duration_secs,
            frames_written,
            target_fps,
            actual_fps,
            retimed,
        })
    }
}

/// Paced video pump.
///
/// One read per iteration; a successful read is written to the encoder and
/// counted, a failed read is skipped. The virtual next-frame deadline
/// advances by one interval every iteration, read success or not, and the
/// thread sleeps until that deadline unless it has already passed. The loop
/// exits when the monotonic clock reaches the session end.
fn pump_frames(
    mut video: Box<dyn VideoSource>,
    mut sink: FfmpegWriter,
    target_fps: u32,
    duration: Duration,
) -> Result<u64, RecordError> {
    let interval = Duration::from_secs_f64(1.0 / target_fps as f64);
    let start = Instant::now();
    let end = start + duration;
    let mut next_deadline = start;
    let mut frames_written: u64 = 0;

    while Instant::now() < end {
        match video.read_frame() {
            Ok(frame) => {
                sink.write_frame(&frame)?;
                frames_written += 1;
            }
            Err(e) => debug!("frame read failed, skipping: {e}"),
        }

        next_deadline += interval;
        let now = Instant::now();
        if next_deadline > now {
            std::thread::sleep(next_deadline - now);
        }
    }

    drop(video);

    let status = sink.finish()?;
    if !status.success() {
        return Err(RecordError::ExternalTool {
            tool: "video encoder",
            status,
        });
    }
    Ok(frames_written)
}
