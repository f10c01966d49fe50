use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Capture width in pixels
    pub width: u32,

    /// Capture height in pixels
    pub height: u32,

    /// Frame rate the video pump paces itself to
    pub target_fps: u32,

    /// Requested audio sample rate
    pub sample_rate: u32,

    /// Requested audio channel count (1 = mono)
    pub channels: u16,

    /// Directory receiving temporary and final files
    pub output_dir: PathBuf,

    /// External transcoding tool program
    pub ffmpeg: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            target_fps: 20,
            sample_rate: 44_100,
            channels: 1,
            output_dir: PathBuf::from("."),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}
