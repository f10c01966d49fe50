use std::process::ExitStatus;

use thiserror::Error;

/// Fatal recording-session failures.
///
/// A failed mid-session frame read is not represented here: it is logged,
/// skipped, and lowers the written-frame count instead of aborting.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Camera or audio device could not be opened; nothing was written.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The external tool exited non-zero; temp files are left in place.
    #[error("{tool} invocation failed with {status}")]
    ExternalTool {
        tool: &'static str,
        status: ExitStatus,
    },

    #[error("file i/o failure: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("wav encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("recording task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
