use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::info;

use super::error::RecordError;

/// Deviation between target and measured frame rate beyond which the video
/// stream is retimed before muxing.
pub const FPS_TOLERANCE: f64 = 0.1;

/// Rewrites a video file's declared frame rate to match the rate frames
/// were actually captured at.
#[derive(Debug, Clone)]
pub struct FrameRateCorrector {
    program: String,
}

impl FrameRateCorrector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn needs_correction(&self, target_fps: f64, actual_fps: f64) -> bool {
        (actual_fps - target_fps).abs() > FPS_TOLERANCE
    }

    /// Produce a retimed copy of `video` declaring `actual_fps`.
    ///
    /// The original file is left in place for the caller to delete. The
    /// tool's output streams are suppressed; only the exit status is
    /// checked.
    pub fn retime(&self, video: &Path, actual_fps: f64) -> Result<PathBuf, RecordError> {
        let output = retimed_path(video);
        info!(
            "retiming {} to {:.4} fps -> {}",
            video.display(),
            actual_fps,
            output.display()
        );

        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-r")
            .arg(format!("{actual_fps:.4}"))
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(RecordError::ExternalTool {
                tool: "retime",
                status,
            });
        }
        Ok(output)
    }
}

/// `v_<ts>.mp4` -> `vfix_<ts>.mp4`, keeping the file next to the original.
pub(crate) fn retimed_path(video: &Path) -> PathBuf {
    let name = video
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("video.mp4");
    let fixed = match name.strip_prefix("v_") {
        Some(rest) => format!("vfix_{rest}"),
        None => format!("vfix_{name}"),
    };
    video.with_file_name(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_needed_when_rate_drifts() {
        let corrector = FrameRateCorrector::new("ffmpeg");
        assert!(corrector.needs_correction(20.0, 18.0));
        assert!(corrector.needs_correction(20.0, 20.2));
    }

    #[test]
    fn no_correction_within_tolerance() {
        let corrector = FrameRateCorrector::new("ffmpeg");
        assert!(!corrector.needs_correction(20.0, 20.0));
        assert!(!corrector.needs_correction(20.0, 19.95));
        assert!(!corrector.needs_correction(20.0, 20.1));
    }

    #[test]
    fn rate_is_formatted_to_four_decimals() {
        assert_eq!(format!("{:.4}", 18.0_f64), "18.0000");
        assert_eq!(format!("{:.4}", 19.87654_f64), "19.8765");
    }

    #[test]
    fn retimed_name_follows_prefix_convention() {
        let fixed = retimed_path(Path::new("/tmp/out/v_20250101_120000.mp4"));
        assert_eq!(
            fixed,
            Path::new("/tmp/out/vfix_20250101_120000.mp4")
        );
    }

    #[test]
    fn retimed_name_without_expected_prefix() {
        let fixed = retimed_path(Path::new("clip.mp4"));
        assert_eq!(fixed, Path::new("vfix_clip.mp4"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_external_tool_error() {
        let corrector = FrameRateCorrector::new("false");
        let err = corrector
            .retime(Path::new("/nonexistent/v_x.mp4"), 18.0)
            .unwrap_err();
        assert!(matches!(err, RecordError::ExternalTool { tool: "retime", .. }));
    }
}
