use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use super::error::RecordError;

/// Combines a video stream and an audio file into one container.
///
/// Thin wrapper over the external tool: video is stream-copied, audio is
/// re-encoded to AAC, the index is front-loaded for immediate playback, and
/// the output is clipped to the shorter input. Opaque and replaceable.
#[derive(Debug, Clone)]
pub struct Muxer {
    program: String,
}

impl Muxer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), RecordError> {
        info!(
            "muxing {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );

        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy", "-c:a", "aac", "-movflags", "+faststart", "-shortest"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(RecordError::ExternalTool {
                tool: "mux",
                status,
            });
        }
        Ok(())
    }
}
