pub mod audio;
pub mod config;
pub mod events;
pub mod monitor;
pub mod recording;
pub mod video;

pub use audio::{
    level_db, AudioAccumulator, AudioBackend, AudioFrame, CaptureConfig, MicrophoneBackend,
};
pub use config::Config;
pub use events::ShellEvent;
pub use monitor::{SpikeEvent, SpikeMonitor};
pub use recording::{
    FrameRateCorrector, Muxer, RecordError, RecorderConfig, RecordingStats, SynchronizedRecorder,
};
pub use video::{CameraSource, VideoFrame, VideoSource};
