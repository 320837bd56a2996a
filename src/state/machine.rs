//! Click controller
//!
//! Owns both engines and is the only place they meet: a hotkey trigger
//! toggles clicking, and IPC commands adjust settings or the hotkey. All
//! inputs arrive as messages and are handled one at a time.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::clicker::{ClickEngine, ClickError};
use crate::events::ClickerEvent;
use crate::hotkey::{HotkeyError, HotkeyEvent, HotkeyListener};
use crate::ipc::{DaemonStatus, Response};

/// Whether a click session is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for ClickState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClickState::Stopped => write!(f, "Stopped"),
            ClickState::Running => write!(f, "Running"),
        }
    }
}

/// Operations the UI can ask the controller to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetStatus,
    Toggle,
    Start,
    Stop,
    SetInterval(u64),
    SetJitter { enabled: bool, percent: Option<u8> },
    SetHotkey(String),
}

/// A command plus the channel its response goes back on
#[derive(Debug)]
pub struct ControlRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Response>,
}

/// Wires hotkey triggers and UI commands to the click engine
pub struct Controller {
    state: ClickState,
    clicker: ClickEngine,
    hotkeys: HotkeyListener,
    /// Hotkey string as the user last set it
    hotkey: String,
    hotkey_error: Option<String>,
    started_at: Instant,
    event_tx: broadcast::Sender<ClickerEvent>,
}

impl Controller {
    pub fn new(
        clicker: ClickEngine,
        hotkeys: HotkeyListener,
        event_tx: broadcast::Sender<ClickerEvent>,
    ) -> Self {
        Self {
            state: ClickState::Stopped,
            clicker,
            hotkeys,
            hotkey: String::new(),
            hotkey_error: None,
            started_at: Instant::now(),
            event_tx,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ClickState {
        self.state
    }

    /// Run the controller until every input channel has closed
    ///
    /// Engine calls that join the click worker run under `block_in_place`,
    /// so this needs the multi-threaded runtime.
    pub async fn run(
        &mut self,
        mut hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        mut command_rx: mpsc::Receiver<ControlRequest>,
        mut failure_rx: mpsc::UnboundedReceiver<ClickError>,
    ) {
        info!(state = %self.state, "controller started");

        loop {
            tokio::select! {
                Some(event) = hotkey_rx.recv() => {
                    tokio::task::block_in_place(|| self.handle_hotkey(event));
                }
                Some(request) = command_rx.recv() => {
                    let response = tokio::task::block_in_place(|| self.handle_command(request.command));
                    if request.reply.send(response).is_err() {
                        debug!("command requester went away");
                    }
                }
                Some(error) = failure_rx.recv() => {
                    tokio::task::block_in_place(|| self.handle_click_failure(error));
                }
                else => break,
            }
        }

        info!("controller stopped");
    }

    /// Start hotkey detection for `spec`
    ///
    /// A failure is recorded in the status and broadcast before it is
    /// returned.
    pub fn set_hotkey(&mut self, spec: &str) -> Result<(), HotkeyError> {
        match self.hotkeys.set_hotkey(spec) {
            Ok(chord) => {
                info!(hotkey = spec, chord = %chord, "hotkey set");
                self.hotkey = chord.source().to_string();
                self.hotkey_error = None;
                self.emit(ClickerEvent::HotkeyChanged {
                    hotkey: self.hotkey.clone(),
                });
                Ok(())
            }
            Err(e @ HotkeyError::InvalidChordSpec(_)) => {
                warn!(hotkey = spec, %e, "hotkey rejected");
                // the previous hotkey stays in effect if there is one
                if !self.hotkeys.is_running() {
                    self.hotkey = spec.trim().to_string();
                    self.hotkey_error = Some(e.to_string());
                }
                Err(e)
            }
            Err(e) => {
                error!(%e, "hotkey detection unavailable");
                self.hotkey_error = Some(e.to_string());
                self.emit(ClickerEvent::HotkeyFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Start clicking if stopped, stop if running
    ///
    /// Goes by the session the user started, so a session whose failure
    /// is still queued is stopped rather than replaced.
    pub fn toggle(&mut self) -> Result<ClickState, ClickError> {
        if self.state == ClickState::Running {
            self.stop_clicking()?;
        } else {
            self.start_clicking()?;
        }
        Ok(self.state)
    }

    pub fn start_clicking(&mut self) -> Result<(), ClickError> {
        self.clicker.start()?;
        self.state = ClickState::Running;
        self.emit(ClickerEvent::ClickingStarted {
            interval_ms: self.clicker.settings().snapshot().interval_ms,
        });
        Ok(())
    }

    /// Stop clicking, waiting for the worker to exit
    pub fn stop_clicking(&mut self) -> Result<(), ClickError> {
        let result = self.clicker.stop();
        self.state = ClickState::Stopped;

        match result {
            Ok(Some(summary)) => {
                self.emit(ClickerEvent::ClickingStopped {
                    clicks: summary.clicks,
                    duration_ms: summary.elapsed.as_millis() as u64,
                });
                Ok(())
            }
            Ok(None) => Ok(()),
            // already reported through the failure channel
            Err(ClickError::SynthesisFailed(message)) => {
                debug!(%message, "stopped a session that had failed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn set_interval(&mut self, interval_ms: u64) -> Result<(), ClickError> {
        self.clicker.set_interval(interval_ms)?;
        info!(interval_ms, "click interval updated");
        Ok(())
    }

    pub fn set_jitter(&mut self, enabled: bool, percent: Option<u8>) -> Result<(), ClickError> {
        if let Some(percent) = percent {
            self.clicker.set_jitter_percent(percent)?;
        }
        self.clicker.set_jitter_enabled(enabled);
        info!(enabled, ?percent, "jitter updated");
        Ok(())
    }

    /// Snapshot for the UI
    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: self.state,
            click: self.clicker.settings().snapshot(),
            hotkey: self.hotkey.clone(),
            hotkey_chord: self.hotkeys.chord().map(|chord| chord.to_string()),
            hotkey_active: self.hotkeys.is_running(),
            hotkey_error: self.hotkey_error.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Stop clicking and hotkey detection
    pub fn shutdown(&mut self) {
        if let Err(e) = self.stop_clicking() {
            warn!(%e, "click session ended with error during shutdown");
        }
        self.hotkeys.stop();
    }

    fn handle_hotkey(&mut self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::Triggered => match self.toggle() {
                Ok(state) => info!(%state, "hotkey toggled clicking"),
                Err(e) => error!(%e, "hotkey toggle failed"),
            },
            HotkeyEvent::HookFailed(message) => {
                error!(%message, "hotkey detection lost");
                self.hotkey_error = Some(message.clone());
                self.emit(ClickerEvent::HotkeyFailed { message });
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Response {
        debug!(?command, "handling command");

        let result = match command {
            Command::GetStatus => Ok(()),
            Command::Toggle => self.toggle().map(|_| ()).map_err(error_response),
            Command::Start => self.start_clicking().map_err(error_response),
            Command::Stop => self.stop_clicking().map_err(error_response),
            Command::SetInterval(interval_ms) => {
                self.set_interval(interval_ms).map_err(error_response)
            }
            Command::SetJitter { enabled, percent } => {
                self.set_jitter(enabled, percent).map_err(error_response)
            }
            Command::SetHotkey(spec) => self.set_hotkey(&spec).map_err(|e| Response::Error {
                code: hotkey_error_code(&e).to_string(),
                message: e.to_string(),
            }),
        };

        match result {
            Ok(()) => Response::Status(self.status()),
            Err(response) => response,
        }
    }

    /// A session ended on its own because a click failed
    fn handle_click_failure(&mut self, error: ClickError) {
        warn!(%error, "click session failed");

        // the session may already have been replaced by a new one
        if self.state == ClickState::Running && !self.clicker.is_running() {
            let _ = self.clicker.stop();
            self.state = ClickState::Stopped;
        }

        self.emit(ClickerEvent::ClickFailed {
            message: error.to_string(),
        });
    }

    fn emit(&self, event: ClickerEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

fn error_response(error: ClickError) -> Response {
    let code = match error {
        ClickError::AlreadyRunning => "already_running",
        ClickError::SynthesisFailed(_) => "synthesis_failed",
        ClickError::InvalidInterval(_) => "invalid_interval",
        ClickError::InvalidJitterPercent(_) => "invalid_jitter_percent",
        ClickError::ThreadSpawn(_) | ClickError::WorkerPanicked => "internal",
    };
    Response::Error {
        code: code.to_string(),
        message: error.to_string(),
    }
}

fn hotkey_error_code(error: &HotkeyError) -> &'static str {
    match error {
        HotkeyError::HookInstallFailed(_) => "hook_install_failed",
        HotkeyError::InvalidChordSpec(_) => "invalid_hotkey",
        HotkeyError::ThreadSpawn(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::clicker::testing::RecordingBackend;
    use crate::clicker::{ClickConfig, ClickSettings};
    use crate::hotkey::testing::ManualHook;
    use crate::hotkey::{InputEvent, InputKey, MouseButton, NamedKey};

    const F6: InputKey = InputKey::Named(NamedKey::F(6));

    struct Harness {
        controller: Controller,
        backend: RecordingBackend,
        hook: ManualHook,
        hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        failure_rx: mpsc::UnboundedReceiver<ClickError>,
        events: broadcast::Receiver<ClickerEvent>,
    }

    fn harness_with(backend: RecordingBackend, hook: ManualHook) -> Harness {
        let settings = ClickSettings::new(ClickConfig {
            interval_ms: 20,
            jitter_enabled: false,
            jitter_percent: 10,
        })
        .unwrap();
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let clicker =
            ClickEngine::new(backend.clone(), Arc::new(settings)).with_failure_channel(failure_tx);

        let (hotkey_tx, hotkey_rx) = mpsc::channel(32);
        let hotkeys = HotkeyListener::new(hook.clone(), hotkey_tx);

        let (event_tx, events) = broadcast::channel(64);
        Harness {
            controller: Controller::new(clicker, hotkeys, event_tx),
            backend,
            hook,
            hotkey_rx,
            failure_rx,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingBackend::default(), ManualHook::default())
    }

    fn drain(rx: &mut broadcast::Receiver<ClickerEvent>) -> Vec<ClickerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_initial_state() {
        let h = harness();
        assert_eq!(h.controller.state(), ClickState::Stopped);
        assert!(!h.controller.status().hotkey_active);
    }

    #[test]
    fn test_toggle_starts_and_stops() {
        let mut h = harness();

        assert_eq!(h.controller.toggle().unwrap(), ClickState::Running);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(h.controller.toggle().unwrap(), ClickState::Stopped);

        let clicks = h.backend.clicks();
        assert!(clicks >= 1);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(h.backend.clicks(), clicks);

        let events = drain(&mut h.events);
        assert_eq!(events[0], ClickerEvent::ClickingStarted { interval_ms: 20 });
        assert!(matches!(
            events[1],
            ClickerEvent::ClickingStopped { clicks: n, .. } if n as usize == clicks
        ));
    }

    #[test]
    fn test_hotkey_trigger_toggles_clicking() {
        let mut h = harness();
        h.controller.set_hotkey("F6").unwrap();

        h.hook.emit(InputEvent::Pressed(F6));
        let event = h.hotkey_rx.try_recv().unwrap();
        h.controller.handle_hotkey(event);
        assert_eq!(h.controller.state(), ClickState::Running);

        h.hook.emit(InputEvent::Released(F6));
        h.hook.emit(InputEvent::Pressed(F6));
        let event = h.hotkey_rx.try_recv().unwrap();
        h.controller.handle_hotkey(event);
        assert_eq!(h.controller.state(), ClickState::Stopped);
    }

    #[test]
    fn test_set_hotkey_updates_status_and_broadcasts() {
        let mut h = harness();
        h.controller.set_hotkey("Ctrl+mouse_x1").unwrap();

        let status = h.controller.status();
        assert_eq!(status.hotkey, "Ctrl+mouse_x1");
        assert_eq!(status.hotkey_chord.as_deref(), Some("ctrl_l+mouse_x1"));
        assert!(status.hotkey_active);
        assert_eq!(status.hotkey_error, None);
        assert_eq!(
            drain(&mut h.events),
            vec![ClickerEvent::HotkeyChanged {
                hotkey: "Ctrl+mouse_x1".to_string()
            }]
        );

        h.hook.emit(InputEvent::Pressed(InputKey::Named(NamedKey::CtrlLeft)));
        h.hook.emit(InputEvent::Pressed(InputKey::Mouse(MouseButton::X1)));
        assert_eq!(h.hotkey_rx.try_recv().unwrap(), HotkeyEvent::Triggered);
    }

    #[test]
    fn test_hook_failure_is_surfaced() {
        let mut h = harness_with(
            RecordingBackend::default(),
            ManualHook::failing("not permitted"),
        );

        let result = h.controller.set_hotkey("F6");
        assert!(matches!(result, Err(HotkeyError::HookInstallFailed(_))));

        let status = h.controller.status();
        assert!(!status.hotkey_active);
        assert!(status.hotkey_error.unwrap().contains("not permitted"));
        assert!(matches!(
            drain(&mut h.events).as_slice(),
            [ClickerEvent::HotkeyFailed { .. }]
        ));
    }

    #[test]
    fn test_dead_hook_is_surfaced() {
        let mut h = harness();
        h.controller.set_hotkey("F6").unwrap();
        drain(&mut h.events);

        h.hook.die("input hook exited");
        let event = h.hotkey_rx.try_recv().unwrap();
        h.controller.handle_hotkey(event);

        let status = h.controller.status();
        assert!(!status.hotkey_active);
        assert_eq!(status.hotkey_error.as_deref(), Some("input hook exited"));
        assert_eq!(
            drain(&mut h.events),
            vec![ClickerEvent::HotkeyFailed {
                message: "input hook exited".to_string()
            }]
        );
    }

    #[test]
    fn test_unusable_startup_hotkey_is_reported() {
        let mut h = harness();

        let result = h.controller.set_hotkey("   ");
        assert!(matches!(result, Err(HotkeyError::InvalidChordSpec(_))));

        let status = h.controller.status();
        assert!(!status.hotkey_active);
        assert!(status.hotkey_error.is_some());
    }

    #[test]
    fn test_unusable_hotkey_change_keeps_current_one() {
        let mut h = harness();
        h.controller.set_hotkey("F6").unwrap();

        assert!(h.controller.set_hotkey("").is_err());

        let status = h.controller.status();
        assert_eq!(status.hotkey, "F6");
        assert!(status.hotkey_active);
        assert_eq!(status.hotkey_error, None);
    }

    #[test]
    fn test_toggle_stops_session_with_queued_failure() {
        let mut h = harness_with(RecordingBackend::failing_after(1), ManualHook::default());

        h.controller.start_clicking().unwrap();
        std::thread::sleep(Duration::from_millis(150));
        // the failure is queued but not handled yet
        let error = h.failure_rx.try_recv().unwrap();

        assert_eq!(h.controller.toggle().unwrap(), ClickState::Stopped);
        assert_eq!(h.backend.opens(), 1);

        h.controller.handle_click_failure(error);
        assert_eq!(h.controller.state(), ClickState::Stopped);
        assert!(matches!(
            drain(&mut h.events).last(),
            Some(ClickerEvent::ClickFailed { .. })
        ));
    }

    #[test]
    fn test_click_failure_stops_session() {
        let mut h = harness_with(RecordingBackend::failing_after(1), ManualHook::default());

        h.controller.start_clicking().unwrap();
        std::thread::sleep(Duration::from_millis(150));

        let error = h.failure_rx.try_recv().unwrap();
        h.controller.handle_click_failure(error);
        assert_eq!(h.controller.state(), ClickState::Stopped);

        let events = drain(&mut h.events);
        assert!(matches!(events.last(), Some(ClickerEvent::ClickFailed { .. })));

        // clicking can be started again afterwards
        h.controller.start_clicking().unwrap();
        assert_eq!(h.controller.state(), ClickState::Running);
    }

    #[test]
    fn test_commands_return_status_or_error() {
        let mut h = harness();

        match h.controller.handle_command(Command::SetInterval(250)) {
            Response::Status(status) => assert_eq!(status.click.interval_ms, 250),
            other => panic!("unexpected response: {other:?}"),
        }

        match h.controller.handle_command(Command::SetInterval(0)) {
            Response::Error { code, .. } => assert_eq!(code, "invalid_interval"),
            other => panic!("unexpected response: {other:?}"),
        }

        match h.controller.handle_command(Command::SetJitter {
            enabled: true,
            percent: Some(30),
        }) {
            Response::Status(status) => {
                assert!(status.click.jitter_enabled);
                assert_eq!(status.click.jitter_percent, 30);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        match h.controller.handle_command(Command::SetHotkey(" ".to_string())) {
            Response::Error { code, .. } => assert_eq!(code, "invalid_hotkey"),
            other => panic!("unexpected response: {other:?}"),
        }

        h.controller.handle_command(Command::Start);
        match h.controller.handle_command(Command::Start) {
            Response::Error { code, .. } => assert_eq!(code, "already_running"),
            other => panic!("unexpected response: {other:?}"),
        }
        h.controller.handle_command(Command::Stop);
        assert_eq!(h.controller.state(), ClickState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_processes_hotkey_and_commands() {
        let h = harness();
        let Harness {
            mut controller,
            backend,
            ..
        } = h;

        let (hotkey_tx, hotkey_rx) = mpsc::channel(8);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        hotkey_tx.send(HotkeyEvent::Triggered).await.unwrap();

        let task = tokio::spawn(async move {
            controller.run(hotkey_rx, command_rx, failure_rx).await;
            controller
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let (reply, response) = oneshot::channel();
        command_tx
            .send(ControlRequest {
                command: Command::GetStatus,
                reply,
            })
            .await
            .unwrap();
        match response.await.unwrap() {
            Response::Status(status) => assert_eq!(status.state, ClickState::Running),
            other => panic!("unexpected response: {other:?}"),
        }

        let (reply, response) = oneshot::channel();
        command_tx
            .send(ControlRequest {
                command: Command::Toggle,
                reply,
            })
            .await
            .unwrap();
        match response.await.unwrap() {
            Response::Status(status) => assert_eq!(status.state, ClickState::Stopped),
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(backend.clicks() >= 1);

        drop(hotkey_tx);
        drop(command_tx);
        drop(failure_tx);
        let controller = task.await.unwrap();
        assert_eq!(controller.state(), ClickState::Stopped);
    }
}
