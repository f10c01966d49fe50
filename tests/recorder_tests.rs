// Integration tests for the synchronized recording session.
//
// The external tool is replaced with stub shell scripts so the pipeline can
// be exercised without a real encoder, and fake sources stand in for the
// camera and microphone.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sleepwatch::audio::{AudioBackend, AudioFrame};
use sleepwatch::recording::{
    FrameRateCorrector, Muxer, RecordError, RecorderConfig, SynchronizedRecorder,
};
use sleepwatch::video::{VideoFrame, VideoSource};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const WIDTH: u32 = 8;
const HEIGHT: u32 = 6;
const FPS: u32 = 20;

/// Stub standing in for the external tool: drains stdin, creates its last
/// argument (the output file), exits 0.
const STUB_OK: &str = "#!/bin/sh\nwhile [ $# -gt 1 ]; do shift; done\ncat >/dev/null\n: > \"$1\"\nexit 0\n";

/// Stub that drains stdin and fails.
const STUB_FAIL: &str = "#!/bin/sh\ncat >/dev/null\nexit 1\n";

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_config(output_dir: &Path, tool: &Path) -> RecorderConfig {
    RecorderConfig {
        width: WIDTH,
        height: HEIGHT,
        target_fps: FPS,
        sample_rate: 8_000,
        channels: 1,
        output_dir: output_dir.to_path_buf(),
        ffmpeg: tool.to_string_lossy().into_owned(),
    }
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Solid-color frame source; optionally fails every Nth read to simulate a
/// flaky capture device.
struct FakeVideoSource {
    frame: VideoFrame,
    reads: u64,
    fail_every: Option<u64>,
}

impl FakeVideoSource {
    fn new() -> Self {
        Self {
            frame: VideoFrame {
                data: vec![0x40; (WIDTH * HEIGHT * 3) as usize],
                width: WIDTH,
                height: HEIGHT,
            },
            reads: 0,
            fail_every: None,
        }
    }

    fn failing_every(n: u64) -> Self {
        let mut source = Self::new();
        source.fail_every = Some(n);
        source
    }
}

impl VideoSource for FakeVideoSource {
    fn read_frame(&mut self) -> Result<VideoFrame> {
        self.reads += 1;
        if let Some(n) = self.fail_every {
            if self.reads % n == 0 {
                return Err(anyhow!("simulated dropout"));
            }
        }
        Ok(self.frame.clone())
    }
}

/// Delivers a steady mono tone until stopped.
#[derive(Default)]
struct ToneBackend {
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl AudioBackend for ToneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(64);
        self.task = Some(tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            loop {
                let frame = AudioFrame {
                    samples: vec![0.1; 80],
                    sample_rate: 8_000,
                    channels: 1,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    return;
                }
                timestamp_ms += 10;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }));
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "tone"
    }
}

/// Backend whose device can never be opened.
struct UnavailableBackend;

#[async_trait]
impl AudioBackend for UnavailableBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        Err(anyhow!("device busy"))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

#[tokio::test]
async fn session_produces_final_file_and_cleans_temps() -> Result<()> {
    let tools = TempDir::new()?;
    let out = TempDir::new()?;
    let stub = write_stub(tools.path(), "ffmpeg-ok", STUB_OK);

    let recorder = SynchronizedRecorder::new(test_config(out.path(), &stub));
    let stats = recorder
        .record(
            Box::new(FakeVideoSource::new()),
            Box::new(ToneBackend::default()),
            Duration::from_secs(1),
        )
        .await?;

    let final_name = stats.final_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(final_name.starts_with("sleep_") && final_name.ends_with(".mp4"));
    assert!(stats.final_path.exists());
    assert!(
        (18..=21).contains(&stats.frames_written),
        "paced pump wrote {} frames",
        stats.frames_written
    );

    let leftovers: Vec<String> = dir_names(out.path())
        .into_iter()
        .filter(|name| !name.starts_with("sleep_"))
        .collect();
    assert!(leftovers.is_empty(), "residual temp files: {leftovers:?}");
    Ok(())
}

#[tokio::test]
async fn dropped_frames_trigger_retiming() -> Result<()> {
    let tools = TempDir::new()?;
    let out = TempDir::new()?;
    let stub = write_stub(tools.path(), "ffmpeg-ok", STUB_OK);

    let recorder = SynchronizedRecorder::new(test_config(out.path(), &stub));
    let stats = recorder
        .record(
            Box::new(FakeVideoSource::failing_every(2)),
            Box::new(ToneBackend::default()),
            Duration::from_secs(1),
        )
        .await?;

    assert!(stats.retimed, "half the reads failed, retime expected");
    assert!(
        stats.actual_fps < 15.0,
        "actual fps {} should reflect skipped frames",
        stats.actual_fps
    );
    assert!(stats.final_path.exists());

    let leftovers: Vec<String> = dir_names(out.path())
        .into_iter()
        .filter(|name| !name.starts_with("sleep_"))
        .collect();
    assert!(leftovers.is_empty(), "residual temp files: {leftovers:?}");
    Ok(())
}

#[tokio::test]
async fn failed_retime_preserves_temp_files() -> Result<()> {
    let tools = TempDir::new()?;
    let out = TempDir::new()?;
    let ok = write_stub(tools.path(), "ffmpeg-ok", STUB_OK);
    let fail = write_stub(tools.path(), "ffmpeg-fail", STUB_FAIL);

    let recorder = SynchronizedRecorder::with_tools(
        test_config(out.path(), &ok),
        FrameRateCorrector::new(fail.to_string_lossy().into_owned()),
        Muxer::new(ok.to_string_lossy().into_owned()),
    );
    let err = recorder
        .record(
            Box::new(FakeVideoSource::failing_every(2)),
            Box::new(ToneBackend::default()),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RecordError::ExternalTool { tool: "retime", .. }));

    // evidence of the failed invocation stays on disk
    let names = dir_names(out.path());
    assert!(names.iter().any(|n| n.starts_with("v_")), "raw video deleted: {names:?}");
    assert!(names.iter().any(|n| n.starts_with("a_")), "audio temp deleted: {names:?}");
    assert!(!names.iter().any(|n| n.starts_with("sleep_")));
    Ok(())
}

#[tokio::test]
async fn failed_mux_preserves_temp_files() -> Result<()> {
    let tools = TempDir::new()?;
    let out = TempDir::new()?;
    let ok = write_stub(tools.path(), "ffmpeg-ok", STUB_OK);
    let fail = write_stub(tools.path(), "ffmpeg-fail", STUB_FAIL);

    let recorder = SynchronizedRecorder::with_tools(
        test_config(out.path(), &ok),
        FrameRateCorrector::new(ok.to_string_lossy().into_owned()),
        Muxer::new(fail.to_string_lossy().into_owned()),
    );
    let err = recorder
        .record(
            Box::new(FakeVideoSource::new()),
            Box::new(ToneBackend::default()),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RecordError::ExternalTool { tool: "mux", .. }));

    let names = dir_names(out.path());
    assert!(names.iter().any(|n| n.starts_with("a_")), "audio temp deleted: {names:?}");
    assert!(
        names.iter().any(|n| n.starts_with("v_") || n.starts_with("vfix_")),
        "video temp deleted: {names:?}"
    );
    assert!(!names.iter().any(|n| n.starts_with("sleep_")));
    Ok(())
}

#[tokio::test]
async fn unavailable_audio_device_creates_no_files() -> Result<()> {
    let tools = TempDir::new()?;
    let out = TempDir::new()?;
    let stub = write_stub(tools.path(), "ffmpeg-ok", STUB_OK);

    let recorder = SynchronizedRecorder::new(test_config(out.path(), &stub));
    let err = recorder
        .record(
            Box::new(FakeVideoSource::new()),
            Box::new(UnavailableBackend),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RecordError::DeviceUnavailable(_)));
    assert!(dir_names(out.path()).is_empty(), "session left files behind");
    Ok(())
}

#[tokio::test]
async fn consecutive_sessions_produce_distinct_files() -> Result<()> {
    let tools = TempDir::new()?;
    let out = TempDir::new()?;
    let stub = write_stub(tools.path(), "ffmpeg-ok", STUB_OK);

    let recorder = SynchronizedRecorder::new(test_config(out.path(), &stub));

    let first = recorder
        .record(
            Box::new(FakeVideoSource::new()),
            Box::new(ToneBackend::default()),
            Duration::from_secs(1),
        )
        .await?;
    // the timestamp-derived name has one-second resolution
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = recorder
        .record(
            Box::new(FakeVideoSource::new()),
            Box::new(ToneBackend::default()),
            Duration::from_secs(1),
        )
        .await?;

    assert_ne!(first.final_path, second.final_path);
    assert!(first.final_path.exists());
    assert!(second.final_path.exists());

    let leftovers: Vec<String> = dir_names(out.path())
        .into_iter()
        .filter(|name| !name.starts_with("sleep_"))
        .collect();
    assert!(leftovers.is_empty(), "residual temp files: {leftovers:?}");
    Ok(())
}
