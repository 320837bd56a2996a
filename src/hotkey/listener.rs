//! Global hotkey listener
//!
//! The OS hook delivers raw presses and releases on its own thread. Each
//! event is passed through a single dispatch function that updates the
//! held-key state under one lock and, when the configured chord completes,
//! posts a [`HotkeyEvent::Triggered`] message to the controller. A hook
//! that dies after installation is reported the same way, as
//! [`HotkeyEvent::HookFailed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::chord::HotkeyChord;
use super::keys::InputEvent;
use super::tracker::ChordTracker;

/// Where an installed OS hook delivers what it observes
#[derive(Clone)]
pub struct EventSink {
    dispatcher: Arc<Dispatcher>,
}

impl EventSink {
    /// A normalized press or release
    pub fn input(&self, event: InputEvent) {
        self.dispatcher.dispatch(event);
    }

    /// The hook stopped delivering events after it was installed
    pub fn hook_failed(&self, message: String) {
        self.dispatcher.hook_failed(message);
    }
}

/// Source of system-wide keyboard and mouse events
pub trait InputHook: Send + Sync {
    /// Install the OS-level subscription delivering events to `sink`
    ///
    /// Failing to install is fatal for hotkey support; there is no
    /// degraded fallback. A hook that dies later reports through
    /// [`EventSink::hook_failed`].
    fn install(&self, sink: EventSink) -> Result<(), HotkeyError>;
}

/// Events sent from the hotkey listener to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The configured chord has just become fully held
    Triggered,

    /// The OS hook stopped delivering events; detection is off
    HookFailed(String),
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("failed to install global input hook: {0}")]
    HookInstallFailed(String),

    #[error("hotkey {0:?} does not name any key")]
    InvalidChordSpec(String),

    #[error("failed to spawn input hook thread: {0}")]
    ThreadSpawn(String),
}

/// Shared between the listener and the OS delivery thread
struct Dispatcher {
    tracker: Mutex<Option<ChordTracker>>,
    hook_installed: AtomicBool,
    event_tx: mpsc::Sender<HotkeyEvent>,
}

impl Dispatcher {
    fn dispatch(&self, event: InputEvent) {
        let fired = {
            let mut guard = self.tracker.lock();
            let Some(tracker) = guard.as_mut() else {
                return;
            };
            match event {
                InputEvent::Pressed(key) => tracker.press(&key.token()),
                InputEvent::Released(key) => {
                    tracker.release(&key.token());
                    false
                }
            }
        };

        if fired {
            debug!("hotkey triggered");
            self.send(HotkeyEvent::Triggered);
        }
    }

    fn hook_failed(&self, message: String) {
        error!(%message, "global input hook died");
        self.hook_installed.store(false, Ordering::SeqCst);
        self.tracker.lock().take();
        self.send(HotkeyEvent::HookFailed(message));
    }

    // Never block the OS delivery thread
    fn send(&self, event: HotkeyEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "hotkey event dropped - controller is not keeping up");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(?event, "hotkey event dropped - controller has exited");
            }
        }
    }
}

/// Global hotkey listener detecting one configurable chord
pub struct HotkeyListener {
    hook: Box<dyn InputHook>,
    dispatcher: Arc<Dispatcher>,
    install_lock: Mutex<()>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(hook: impl InputHook + 'static, event_tx: mpsc::Sender<HotkeyEvent>) -> Self {
        Self {
            hook: Box::new(hook),
            dispatcher: Arc::new(Dispatcher {
                tracker: Mutex::new(None),
                hook_installed: AtomicBool::new(false),
                event_tx,
            }),
            install_lock: Mutex::new(()),
        }
    }

    /// Start detecting `chord` with an empty held-key set
    ///
    /// Installs the OS hook on first use, and again after it has died.
    /// Calling it again replaces the
    /// active chord and discards any held-key state.
    pub fn start(&self, chord: HotkeyChord) -> Result<(), HotkeyError> {
        self.ensure_hook()?;

        info!(chord = %chord, hotkey = chord.source(), "hotkey listener started");
        *self.dispatcher.tracker.lock() = Some(ChordTracker::new(chord));
        Ok(())
    }

    /// Stop detecting and release the held-key set
    ///
    /// Events that still arrive from the OS afterwards are discarded.
    pub fn stop(&self) {
        if let Some(mut tracker) = self.dispatcher.tracker.lock().take() {
            tracker.clear();
            info!(chord = %tracker.chord(), "hotkey listener stopped");
        }
    }

    /// Replace the hotkey, restarting detection from a clean state
    ///
    /// An unusable spec leaves the current hotkey in place.
    pub fn set_hotkey(&self, spec: &str) -> Result<HotkeyChord, HotkeyError> {
        let chord = HotkeyChord::parse(spec)?;
        self.stop();
        self.start(chord.clone())?;
        Ok(chord)
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.dispatcher.tracker.lock().is_some()
    }

    /// The chord currently being detected
    pub fn chord(&self) -> Option<HotkeyChord> {
        self.dispatcher
            .tracker
            .lock()
            .as_ref()
            .map(|tracker| tracker.chord().clone())
    }

    fn ensure_hook(&self) -> Result<(), HotkeyError> {
        let _guard = self.install_lock.lock();
        if self.dispatcher.hook_installed.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.hook.install(EventSink {
            dispatcher: Arc::clone(&self.dispatcher),
        })?;

        self.dispatcher.hook_installed.store(true, Ordering::SeqCst);
        info!("global input hook installed");
        Ok(())
    }
}
