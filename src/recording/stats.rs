use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a completed recording session
#[derive(Debug, Clone, Serialize)]
pub struct RecordingStats {
    /// Final muxed container file
    pub final_path: PathBuf,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Requested clip length in seconds
    pub duration_secs: f64,

    /// Frames actually written by the paced video pump
    pub frames_written: u64,

    /// Frame rate the pump paced itself to
    pub target_fps: u32,

    /// frames_written / duration
    pub actual_fps: f64,

    /// Whether the video stream was retimed before muxing
    pub retimed: bool,
}
