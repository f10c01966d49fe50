use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;

use crate::recording::RecorderConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub audio: AudioSection,
    pub video: VideoSection,
    pub recording: RecordingSection,
    pub tools: ToolsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSection {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoSection {
    pub device_index: u32,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingSection {
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// External transcoding tool; a bare name resolves via PATH
    pub ffmpeg: String,
}

impl Config {
    /// Load configuration, merging an optional file over built-in defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("audio.sample_rate", 44_100)?
            .set_default("audio.channels", 1)?
            .set_default("video.device_index", 0)?
            .set_default("video.width", 640)?
            .set_default("video.height", 480)?
            .set_default("video.target_fps", 20)?
            .set_default("recording.output_dir", ".")?
            .set_default("tools.ffmpeg", "ffmpeg")?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session-level configuration for the recorder.
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            width: self.video.width,
            height: self.video.height,
            target_fps: self.video.target_fps,
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            output_dir: self.recording.output_dir.clone(),
            ffmpeg: self.tools.ffmpeg.clone(),
        }
    }
}
