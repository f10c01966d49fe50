pub mod config;
pub mod error;
pub mod mux;
pub mod retime;
pub mod session;
pub mod stats;

pub use config::RecorderConfig;
pub use error::RecordError;
pub use mux::Muxer;
pub use retime::{FrameRateCorrector, FPS_TOLERANCE};
pub use session::SynchronizedRecorder;
pub use stats::RecordingStats;
