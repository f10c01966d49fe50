// Spike monitoring session.
//
// A monitor owns a continuous audio input stream and evaluates every
// arriving frame against a decibel threshold. Crossings raise edge-style
// events: each qualifying frame fires again, and deduplication against an
// in-flight recording is the caller's job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{level_db, AudioBackend};

/// A loudness crossing observed while listening.
#[derive(Debug, Clone)]
pub struct SpikeEvent {
    /// Measured level of the triggering frame
    pub level_db: f32,
    /// Threshold that was crossed
    pub threshold_db: f32,
    /// Capture timestamp of the triggering frame
    pub timestamp_ms: u64,
}

/// Listens on an audio input stream and emits [`SpikeEvent`]s while active.
pub struct SpikeMonitor {
    threshold_db: f32,
    active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl SpikeMonitor {
    pub fn new(threshold_db: f32) -> Self {
        Self {
            threshold_db,
            active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            task: None,
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn is_listening(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a monitoring session on the given input backend.
    ///
    /// Returns the spike event channel. Events are delivered only while the
    /// session is active; the channel closes once the session ends. A
    /// consumer that lags behind drops crossings rather than stalling the
    /// capture path.
    pub async fn start(
        &mut self,
        mut backend: Box<dyn AudioBackend>,
    ) -> Result<mpsc::Receiver<SpikeEvent>> {
        if self.task.is_some() {
            bail!("monitor already listening");
        }

        let mut audio_rx = backend.start().await.context("failed to start audio input")?;
        self.active.store(true, Ordering::SeqCst);
        // Fresh Notify per session: a permit left over from a previous
        // session's stop must not leak into this one.
        self.shutdown = Arc::new(Notify::new());
        info!("monitoring started (threshold {} dB)", self.threshold_db);

        let (event_tx, event_rx) = mpsc::channel(16);
        let active = Arc::clone(&self.active);
        let shutdown = Arc::clone(&self.shutdown);
        let threshold_db = self.threshold_db;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    frame = audio_rx.recv() => {
                        let Some(frame) = frame else { break };
                        if !active.load(Ordering::SeqCst) {
                            break;
                        }
                        let level = level_db(&frame.samples);
                        if level > threshold_db {
                            debug!(
                                "spike: {:.1} dB > {:.1} dB at {}ms",
                                level, threshold_db, frame.timestamp_ms
                            );
                            let event = SpikeEvent {
                                level_db: level,
                                threshold_db,
                                timestamp_ms: frame.timestamp_ms,
                            };
                            if event_tx.try_send(event).is_err() {
                                debug!("spike event dropped, consumer lagging");
                            }
                        }
                    }
                }
            }

            active.store(false, Ordering::SeqCst);
            if let Err(e) = backend.stop().await {
                warn!("audio backend stop failed: {e}");
            }
        });

        self.task = Some(task);
        Ok(event_rx)
    }

    /// Stop the monitoring session.
    ///
    /// Blocks until the evaluation task has exited and the input stream has
    /// been released; no event is observable after this returns.
    pub async fn stop(&mut self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();

        if let Some(task) = self.task.take() {
            task.await.context("monitor task panicked")?;
            info!("monitoring stopped");
        }

        Ok(())
    }
}
