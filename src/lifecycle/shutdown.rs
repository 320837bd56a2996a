//! Signal handling for graceful shutdown

use std::fmt;

use tokio::signal::unix::{signal, SignalKind};
use tracing::debug;

/// Why the daemon is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// SIGTERM, e.g. from the session manager
    Terminate,
    /// SIGINT, e.g. Ctrl+C in a terminal
    Interrupt,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shutdown::Terminate => write!(f, "SIGTERM"),
            Shutdown::Interrupt => write!(f, "SIGINT"),
        }
    }
}

/// Waits for SIGTERM or SIGINT
#[derive(Debug, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    /// Wait for the first shutdown signal
    ///
    /// Fails only if the signal handlers cannot be registered.
    pub async fn wait(&self) -> std::io::Result<Shutdown> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => Shutdown::Terminate,
            _ = sigint.recv() => Shutdown::Interrupt,
        };
        debug!(signal = %received, "shutdown signal received");
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_display() {
        assert_eq!(Shutdown::Terminate.to_string(), "SIGTERM");
        assert_eq!(Shutdown::Interrupt.to_string(), "SIGINT");
    }

    #[test]
    fn test_wait_is_pending_without_signal() {
        tokio_test::block_on(async {
            let shutdown = ShutdownSignal::new();
            let mut wait = tokio_test::task::spawn(shutdown.wait());
            tokio_test::assert_pending!(wait.poll());
        });
    }
}
