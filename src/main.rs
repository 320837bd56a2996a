//! autoclicker-daemon: Background daemon for a hotkey-toggled auto clicker
//!
//! This daemon provides:
//! - A click engine that left-clicks at the cursor on a fixed or jittered interval
//! - Global hotkey detection for keyboard and mouse-button chords
//! - A controller that toggles clicking whenever the hotkey fires
//! - IPC server for the control panel and tray icon
//!
//! The window, tray icon, and settings persistence live in the UI process.

mod clicker;
mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::clicker::{ClickEngine, ClickSettings, EnigoBackend};
use crate::config::Config;
use crate::events::ClickerEvent;
use crate::hotkey::{HotkeyError, HotkeyListener, RdevHook};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::state::Controller;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "autoclicker-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        ?config.socket_path,
        interval_ms = config.click.interval_ms,
        hotkey = %config.hotkey,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Hotkey listener -> controller
    let (hotkey_tx, hotkey_rx) = mpsc::channel(32);
    // IPC server -> controller
    let (command_tx, command_rx) = mpsc::channel(32);
    // Click worker -> controller (session failures)
    let (failure_tx, failure_rx) = mpsc::unbounded_channel();
    // Controller -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<ClickerEvent>(64);

    let settings = ClickSettings::new(config.click).context("invalid click settings")?;
    let clicker = ClickEngine::new(EnigoBackend, Arc::new(settings)).with_failure_channel(failure_tx);
    let hotkeys = HotkeyListener::new(RdevHook, hotkey_tx);

    let mut controller = Controller::new(clicker, hotkeys, event_tx.clone());

    // Install the global hook and start detecting the configured chord
    match controller.set_hotkey(&config.hotkey) {
        Ok(()) => {}
        Err(e @ HotkeyError::InvalidChordSpec(_)) => {
            error!(%e, "configured hotkey is unusable");
            warn!("continuing without hotkey support - set AUTOCLICKER_HOTKEY or change it from the UI");
        }
        Err(e) => {
            error!(%e, "failed to start hotkey detection");
            warn!("continuing without hotkey support - check input permissions");
        }
    }

    let server = Server::bind(&config.socket_path, command_tx, event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the controller (hotkey triggers, commands, failures)
        _ = controller.run(hotkey_rx, command_rx, failure_rx) => {
            info!("controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(signal) => info!(%signal, "shutdown signal received"),
                Err(e) => error!(?e, "failed to listen for shutdown signals"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    tokio::task::block_in_place(|| controller.shutdown());
    server.shutdown().await;

    info!("autoclicker-daemon stopped");

    Ok(())
}
