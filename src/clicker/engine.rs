//! Click engine
//!
//! Runs at most one click session at a time on a dedicated worker thread.
//! A session clicks immediately on start, then alternates wait and click
//! until it is stopped or a click cannot be produced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, trace, warn};

use super::mouse::ClickBackend;
use super::settings::ClickSettings;

/// Errors that can occur in the click engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClickError {
    #[error("clicking is already running")]
    AlreadyRunning,

    #[error("synthetic click failed: {0}")]
    SynthesisFailed(String),

    #[error("click interval must be a positive number of milliseconds, got {0}")]
    InvalidInterval(u64),

    #[error("jitter percent must be between 0 and 100, got {0}")]
    InvalidJitterPercent(u8),

    #[error("failed to spawn click worker: {0}")]
    ThreadSpawn(String),

    #[error("click worker panicked")]
    WorkerPanicked,
}

/// What a finished session did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub clicks: u64,
    pub elapsed: Duration,
}

/// A running click session
struct ClickSession {
    running: Arc<AtomicBool>,
    wake_tx: mpsc::Sender<()>,
    handle: JoinHandle<Result<SessionSummary, ClickError>>,
}

/// Periodic left-click runner
pub struct ClickEngine {
    backend: Arc<dyn ClickBackend>,
    settings: Arc<ClickSettings>,
    session: Option<ClickSession>,
    failure_tx: Option<UnboundedSender<ClickError>>,
}

impl ClickEngine {
    pub fn new(backend: impl ClickBackend + 'static, settings: Arc<ClickSettings>) -> Self {
        Self {
            backend: Arc::new(backend),
            settings,
            session: None,
            failure_tx: None,
        }
    }

    /// Report sessions that end on their own through `failure_tx`
    pub fn with_failure_channel(mut self, failure_tx: UnboundedSender<ClickError>) -> Self {
        self.failure_tx = Some(failure_tx);
        self
    }

    pub fn settings(&self) -> &Arc<ClickSettings> {
        &self.settings
    }

    /// Start a click session
    ///
    /// Fails with [`ClickError::AlreadyRunning`] while a worker is alive;
    /// no second worker is spawned.
    pub fn start(&mut self) -> Result<(), ClickError> {
        self.reap_finished();
        if self.session.is_some() {
            return Err(ClickError::AlreadyRunning);
        }

        let running = Arc::new(AtomicBool::new(true));
        let (wake_tx, wake_rx) = mpsc::channel();

        let worker = Worker {
            backend: Arc::clone(&self.backend),
            settings: Arc::clone(&self.settings),
            running: Arc::clone(&running),
            wake_rx,
            failure_tx: self.failure_tx.clone(),
        };

        let handle = thread::Builder::new()
            .name("click-worker".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ClickError::ThreadSpawn(e.to_string()))?;

        let config = self.settings.snapshot();
        info!(
            interval_ms = config.interval_ms,
            jitter_enabled = config.jitter_enabled,
            jitter_percent = config.jitter_percent,
            "click session started"
        );

        self.session = Some(ClickSession {
            running,
            wake_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the current session and wait for the worker to exit
    ///
    /// No click is produced after this returns. Returns `Ok(None)` when
    /// nothing was running, and the session's error if it ended on a
    /// failed click.
    pub fn stop(&mut self) -> Result<Option<SessionSummary>, ClickError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        session.running.store(false, Ordering::SeqCst);
        // wakes a sleeping worker; fails harmlessly if it already exited
        let _ = session.wake_tx.send(());

        let summary = session
            .handle
            .join()
            .map_err(|_| ClickError::WorkerPanicked)??;

        info!(
            clicks = summary.clicks,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "click session stopped"
        );
        Ok(Some(summary))
    }

    /// Check if a worker is currently clicking
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::SeqCst) && !s.handle.is_finished())
    }

    /// Takes effect from the next wait, not the one in progress
    pub fn set_interval(&self, interval_ms: u64) -> Result<(), ClickError> {
        self.settings.set_interval(interval_ms)
    }

    pub fn set_jitter_enabled(&self, enabled: bool) {
        self.settings.set_jitter_enabled(enabled);
    }

    pub fn set_jitter_percent(&self, percent: u8) -> Result<(), ClickError> {
        self.settings.set_jitter_percent(percent)
    }

    /// Drop a session whose worker already exited by itself
    fn reap_finished(&mut self) {
        let finished = self
            .session
            .as_ref()
            .is_some_and(|s| s.handle.is_finished());
        if !finished {
            return;
        }

        if let Some(session) = self.session.take() {
            match session.handle.join() {
                Ok(Ok(summary)) => debug!(clicks = summary.clicks, "reaped finished session"),
                Ok(Err(e)) => debug!(%e, "reaped failed session"),
                Err(_) => warn!("reaped panicked click worker"),
            }
        }
    }
}

impl Drop for ClickEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(%e, "click session ended with error");
        }
    }
}

/// State moved onto the worker thread
struct Worker {
    backend: Arc<dyn ClickBackend>,
    settings: Arc<ClickSettings>,
    running: Arc<AtomicBool>,
    wake_rx: mpsc::Receiver<()>,
    failure_tx: Option<UnboundedSender<ClickError>>,
}

impl Worker {
    fn run(self) -> Result<SessionSummary, ClickError> {
        let started = Instant::now();
        let result = self.click_loop();
        self.running.store(false, Ordering::SeqCst);

        match result {
            Ok(clicks) => Ok(SessionSummary {
                clicks,
                elapsed: started.elapsed(),
            }),
            Err(e) => {
                error!(%e, "click session aborted");
                if let Some(tx) = &self.failure_tx {
                    let _ = tx.send(e.clone());
                }
                Err(e)
            }
        }
    }

    fn click_loop(&self) -> Result<u64, ClickError> {
        let mut clicker = self.backend.open()?;
        let mut rng = rand::thread_rng();
        let mut clicks = 0u64;

        while self.running.load(Ordering::SeqCst) {
            clicker.left_click()?;
            clicks += 1;

            let wait = self.settings.wait_duration(&mut rng);
            trace!(clicks, wait_ms = wait.as_millis() as u64, "clicked");

            match self.wake_rx.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(clicks)
    }
}
