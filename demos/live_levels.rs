// Prints the microphone's per-block RMS level, for picking a spike
// threshold before running the recorder.

use anyhow::Result;
use sleepwatch::audio::{level_db, AudioBackend, CaptureConfig, MicrophoneBackend};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut backend = MicrophoneBackend::new(CaptureConfig::default());
    let mut frames = backend.start().await?;
    info!("sampling microphone levels, Ctrl-C to exit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                println!(
                    "{:7.1} dB  ({} samples @ {} Hz)",
                    level_db(&frame.samples),
                    frame.samples.len(),
                    frame.sample_rate
                );
            }
        }
    }

    backend.stop().await?;
    Ok(())
}
