//! Session host: drives one [`SessionMachine`] against a terminal.
//!
//! The host is the only place where a session does I/O. It pulls events
//! from the transport in order, feeds them to the machine, performs the
//! effects the machine requests and writes a fresh frame after every
//! change.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use yoshimi_core::{ActionResult, Result, SessionId};
use yoshimi_terminal::frame::{ENTER_ALT_SCREEN, HIDE_CURSOR, LEAVE_ALT_SCREEN, SHOW_CURSOR};

use crate::invoker::{LocalActions, ScriptInvoker};
use crate::machine::{Effect, InputEvent, SessionMachine};
use crate::manager::SessionRegistry;
use crate::render::render;

/// Output side of a session's terminal.
#[async_trait]
pub trait FrameSink: Send {
    /// Write raw terminal bytes.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the terminal; no writes follow.
    async fn close(&mut self) -> Result<()>;
}

/// Handlers for the effects a machine can request.
#[derive(Clone)]
pub struct ActionSet {
    /// Form submission
    pub script: Arc<dyn ScriptInvoker>,
    /// Menu actions
    pub local: Arc<LocalActions>,
}

impl std::fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSet")
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    /// The user pressed Ctrl+C
    Quit,
    /// The connection went away
    Disconnected,
    /// The server is shutting down
    Shutdown,
}

impl std::fmt::Display for HostExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HostExit::Quit => "quit",
            HostExit::Disconnected => "disconnected",
            HostExit::Shutdown => "shutdown",
        })
    }
}

/// Runs one session to completion.
pub struct SessionHost<S> {
    id: SessionId,
    machine: SessionMachine,
    actions: ActionSet,
    sink: S,
    events: mpsc::UnboundedReceiver<InputEvent>,
    shutdown: CancellationToken,
    registry: Option<Arc<SessionRegistry>>,
}

impl<S: FrameSink> SessionHost<S> {
    /// Create a host reading `events` and drawing to `sink`.
    pub fn new(
        id: SessionId,
        machine: SessionMachine,
        actions: ActionSet,
        sink: S,
        events: mpsc::UnboundedReceiver<InputEvent>,
    ) -> Self {
        Self {
            id,
            machine,
            actions,
            sink,
            events,
            shutdown: CancellationToken::new(),
            registry: None,
        }
    }

    /// End the session when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Report stage changes to `registry` and deregister on exit.
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run until the user quits, the connection closes or shutdown is forced.
    pub async fn run(mut self) -> HostExit {
        let started = Instant::now();
        info!("Session {} started", self.id);

        let exit = match self.open_screen().await {
            Ok(()) => self.event_loop().await,
            Err(e) => {
                warn!("Session {}: initial draw failed: {}", self.id, e);
                HostExit::Disconnected
            }
        };

        self.finish(exit).await;
        info!(
            "Session {} ended ({}) at {} after {:?}",
            self.id,
            exit,
            self.machine.stage(),
            started.elapsed()
        );
        exit
    }

    async fn event_loop(&mut self) -> HostExit {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return HostExit::Shutdown,
                event = self.events.recv() => event,
            };
            let Some(event) = event else {
                return HostExit::Disconnected;
            };

            match self.step(event).await {
                Ok(None) => {}
                Ok(Some(exit)) => return exit,
                Err(e) => {
                    debug!("Session {}: write failed: {}", self.id, e);
                    return HostExit::Disconnected;
                }
            }
        }
    }

    async fn step(&mut self, event: InputEvent) -> Result<Option<HostExit>> {
        let closed = event == InputEvent::ConnectionClosed;
        let before = self.machine.stage();

        match self.machine.handle(event) {
            Some(Effect::Quit) if closed => return Ok(Some(HostExit::Disconnected)),
            Some(Effect::Quit) => return Ok(Some(HostExit::Quit)),
            Some(effect) => {
                let result = tokio::select! {
                    result = perform(&self.actions, effect) => result,
                    _ = self.shutdown.cancelled() => return Ok(Some(HostExit::Shutdown)),
                };
                self.machine.complete(result);
            }
            None => {}
        }

        let after = self.machine.stage();
        if after != before {
            debug!("Session {}: {} -> {}", self.id, before, after);
            if let Some(registry) = &self.registry {
                if let Err(e) = registry.update_stage(&self.id, after) {
                    debug!("Session {}: {}", self.id, e);
                }
            }
        }

        self.redraw().await?;
        Ok(None)
    }

    async fn open_screen(&mut self) -> Result<()> {
        let mut bytes = Vec::from(ENTER_ALT_SCREEN.as_bytes());
        bytes.extend_from_slice(HIDE_CURSOR.as_bytes());
        bytes.extend(render(&self.machine).to_ansi());
        self.sink.write(&bytes).await
    }

    async fn redraw(&mut self) -> Result<()> {
        let frame = render(&self.machine).to_ansi();
        self.sink.write(&frame).await
    }

    async fn finish(&mut self, exit: HostExit) {
        if let Some(registry) = &self.registry {
            registry.remove(&self.id);
        }
        if exit == HostExit::Disconnected {
            return;
        }

        let restore = format!("{SHOW_CURSOR}{LEAVE_ALT_SCREEN}");
        if let Err(e) = self.sink.write(restore.as_bytes()).await {
            debug!("Session {}: restore failed: {}", self.id, e);
        }
        if let Err(e) = self.sink.close().await {
            debug!("Session {}: close failed: {}", self.id, e);
        }
    }

    /// The session's ID.
    pub fn id(&self) -> SessionId {
        self.id
    }
}

async fn perform(actions: &ActionSet, effect: Effect) -> ActionResult {
    match effect {
        Effect::RunScript { title, body } => actions.script.invoke(&title, &body).await,
        Effect::ReadPublicKey => actions.local.read_public_key().await,
        Effect::LaunchTyping => actions.local.launch_typing().await,
        // Handled by the caller before dispatch
        Effect::Quit => ActionResult::success(String::new()),
    }
}
