// Shell-facing notification messages.
//
// The graphical shell is an external caller; in the headless binary its
// notifications are JSON lines on stdout, one object per event.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::monitor::SpikeEvent;
use crate::recording::{RecordError, RecordingStats};

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ShellEvent {
    SpikeDetected {
        level_db: f32,
        threshold_db: f32,
        timestamp: String, // RFC3339
    },
    RecordingStarted {
        session_id: String,
        duration_secs: u64,
        timestamp: String,
    },
    RecordingComplete {
        session_id: String,
        path: String,
        frames_written: u64,
        actual_fps: f64,
        retimed: bool,
        timestamp: String,
    },
    RecordingFailed {
        session_id: String,
        error: String,
        timestamp: String,
    },
}

impl ShellEvent {
    pub fn spike_detected(spike: &SpikeEvent) -> Self {
        Self::SpikeDetected {
            level_db: spike.level_db,
            threshold_db: spike.threshold_db,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn recording_started(session_id: &str, duration: Duration) -> Self {
        Self::RecordingStarted {
            session_id: session_id.to_string(),
            duration_secs: duration.as_secs(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn recording_complete(session_id: &str, stats: &RecordingStats) -> Self {
        Self::RecordingComplete {
            session_id: session_id.to_string(),
            path: stats.final_path.display().to_string(),
            frames_written: stats.frames_written,
            actual_fps: stats.actual_fps,
            retimed: stats.retimed,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn recording_failed(session_id: &str, err: &RecordError) -> Self {
        Self::RecordingFailed {
            session_id: session_id.to_string(),
            error: err.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Write one event to stdout as a JSON line.
pub fn emit(event: &ShellEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("failed to serialize shell event: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_event_serializes_with_tag() {
        let event = ShellEvent::SpikeDetected {
            level_db: -12.5,
            threshold_db: -30.0,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"spike_detected\""));
        assert!(json.contains("\"threshold_db\":-30.0"));
    }

    #[test]
    fn completion_event_carries_path() {
        let event = ShellEvent::RecordingComplete {
            session_id: "abc".to_string(),
            path: "sleep_20250101_000000.mp4".to_string(),
            frames_written: 200,
            actual_fps: 20.0,
            retimed: false,
            timestamp: "2025-01-01T00:00:10Z".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"recording_complete\""));
        assert!(json.contains("sleep_20250101_000000.mp4"));
    }
}
