pub mod accumulator;
pub mod backend;
pub mod meter;
pub mod microphone;

pub use accumulator::AudioAccumulator;
pub use backend::{AudioBackend, AudioFrame, CaptureConfig};
pub use meter::{level_db, RMS_FLOOR};
pub use microphone::{list_input_devices, MicrophoneBackend};
