//! SSH transport glue.
//!
//! One [`ConnectionHandler`] exists per TCP connection. It accepts any user,
//! records the PTY size, and on `shell` starts a [`SessionHost`] for the
//! channel. Channel data is decoded into keys and forwarded to the host in
//! arrival order; frames travel back through a [`ChannelSink`].

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use russh::server::{self, Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use yoshimi_core::{Dimensions, Error, Result, ServerConfig};
use yoshimi_session::{
    ActionSet, FrameSink, InputEvent, LocalActions, MachineConfig, ProcessInvoker,
    SessionHost, SessionMachine, SessionRegistry,
};
use yoshimi_terminal::InputDecoder;

/// Shown to clients that connect without a terminal.
pub const PTY_REQUIRED: &str = "Requires an active PTY";
/// Shown when the session limit is reached.
pub const SERVER_BUSY: &str = "Too many sessions, try again later.";

/// State shared by every connection of one server.
#[derive(Debug)]
pub struct ServerShared {
    machine_config: Arc<MachineConfig>,
    actions: ActionSet,
    registry: Arc<SessionRegistry>,
    force: CancellationToken,
    tracker: TaskTracker,
}

impl ServerShared {
    /// Build shared state from configuration.
    pub fn new(config: &ServerConfig, force: CancellationToken, tracker: TaskTracker) -> Self {
        let actions = ActionSet {
            script: Arc::new(ProcessInvoker::from_settings(&config.script)),
            local: Arc::new(LocalActions::from_settings(&config.menu)),
        };
        Self {
            machine_config: Arc::new(MachineConfig::from(config)),
            actions,
            registry: Arc::new(SessionRegistry::new(config.server.max_sessions)),
            force,
            tracker,
        }
    }

    /// Registry of live sessions.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}

struct ChannelState {
    id: ChannelId,
    pty: Option<Dimensions>,
    events: Option<mpsc::UnboundedSender<InputEvent>>,
    decoder: InputDecoder,
}

/// Per-connection SSH handler.
pub struct ConnectionHandler {
    shared: Arc<ServerShared>,
    peer: Option<SocketAddr>,
    user: String,
    channel: Option<ChannelState>,
}

impl ConnectionHandler {
    /// Create a handler for a connection from `peer`.
    pub fn new(shared: Arc<ServerShared>, peer: Option<SocketAddr>) -> Self {
        Self {
            shared,
            peer,
            user: String::new(),
            channel: None,
        }
    }

    fn accept(&mut self, user: &str, method: &str) -> Auth {
        debug!("Accepting {} auth for '{}' from {:?}", method, user, self.peer);
        self.user = user.to_string();
        Auth::Accept
    }

    fn channel_mut(&mut self, id: ChannelId) -> Option<&mut ChannelState> {
        self.channel.as_mut().filter(|state| state.id == id)
    }

    fn send(&mut self, id: ChannelId, event: InputEvent) {
        if let Some(tx) = self.channel_mut(id).and_then(|state| state.events.as_ref()) {
            // The host may already be gone; its exit is logged there.
            let _ = tx.send(event);
        }
    }

    fn refuse(&self, channel: ChannelId, session: &mut Session, message: &str) {
        warn!("Refusing session from {:?}: {}", self.peer, message);
        let _ = session.data(channel, CryptoVec::from_slice(format!("{message}\r\n").as_bytes()));
        let _ = session.exit_status_request(channel, 1);
        let _ = session.close(channel);
    }
}

impl server::Handler for ConnectionHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> std::result::Result<Auth, Self::Error> {
        Ok(self.accept(user, "none"))
    }

    async fn auth_password(
        &mut self,
        user: &str,
        _password: &str,
    ) -> std::result::Result<Auth, Self::Error> {
        Ok(self.accept(user, "password"))
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &russh::keys::ssh_key::PublicKey,
    ) -> std::result::Result<Auth, Self::Error> {
        Ok(self.accept(user, "publickey"))
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> std::result::Result<bool, Self::Error> {
        if self.channel.is_some() {
            debug!("Rejecting second session channel from {:?}", self.peer);
            return Ok(false);
        }
        // Input arrives through `data`; the Channel's own queue is never read,
        // so it is dropped here instead of being left to fill up.
        self.channel = Some(ChannelState {
            id: channel.id(),
            pty: None,
            events: None,
            decoder: InputDecoder::new(),
        });
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let Some(state) = self.channel_mut(channel) else {
            session.channel_failure(channel)?;
            return Ok(());
        };
        // Some clients report 0x0 and follow up with a window change.
        state.pty = Some(Dimensions::from_ssh(col_width, row_height).unwrap_or_default());
        debug!("PTY {} {}x{} for {:?}", term, col_width, row_height, self.peer);
        session.channel_success(channel)?;
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let peer = self.peer;
        let user = self.user.clone();
        let shared = Arc::clone(&self.shared);

        let Some(state) = self.channel_mut(channel) else {
            session.channel_failure(channel)?;
            return Ok(());
        };
        let Some(size) = state.pty else {
            session.channel_success(channel)?;
            self.refuse(channel, session, PTY_REQUIRED);
            return Ok(());
        };
        if state.events.is_some() {
            session.channel_failure(channel)?;
            return Ok(());
        }

        let id = match shared.registry.register(peer, &user) {
            Ok(id) => id,
            Err(Error::SessionLimitReached(max)) => {
                session.channel_success(channel)?;
                warn!("Session limit ({}) reached", max);
                self.refuse(channel, session, SERVER_BUSY);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        state.events = Some(tx);

        let sink = ChannelSink {
            handle: session.handle(),
            channel,
        };
        let mut machine = SessionMachine::new(Arc::clone(&shared.machine_config));
        machine.handle(InputEvent::Resize(size));
        let host = SessionHost::new(id, machine, shared.actions.clone(), sink, rx)
            .with_shutdown(shared.force.clone())
            .with_registry(Arc::clone(&shared.registry));

        info!("Session {} for '{}' from {:?}", id, user, peer);
        shared.tracker.spawn(host.run());
        session.channel_success(channel)?;
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        session.channel_success(channel)?;
        self.refuse(channel, session, PTY_REQUIRED);
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        let Some(state) = self.channel_mut(channel) else {
            return Ok(());
        };
        if state.events.is_none() {
            return Ok(());
        }
        let keys = state.decoder.decode(data);
        for key in keys {
            self.send(channel, InputEvent::KeyPress(key));
        }
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        match Dimensions::from_ssh(col_width, row_height) {
            Ok(dims) => {
                if let Some(state) = self.channel_mut(channel) {
                    state.pty = Some(dims);
                }
                self.send(channel, InputEvent::Resize(dims));
            }
            Err(e) => debug!("Ignoring window change: {}", e),
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        self.send(channel, InputEvent::ConnectionClosed);
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> std::result::Result<(), Self::Error> {
        self.send(channel, InputEvent::ConnectionClosed);
        if let Some(state) = self.channel_mut(channel) {
            state.events = None;
        }
        Ok(())
    }
}

/// Writes frames to one SSH channel.
pub struct ChannelSink {
    handle: server::Handle,
    channel: ChannelId,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.handle
            .data(self.channel, CryptoVec::from_slice(bytes))
            .await
            .map_err(|_| Error::Transport(format!("channel {:?} closed", self.channel)))
    }

    async fn close(&mut self) -> Result<()> {
        let _ = self.handle.exit_status_request(self.channel, 0).await;
        self.handle
            .close(self.channel)
            .await
            .map_err(|_| Error::Transport(format!("channel {:?} already closed", self.channel)))
    }
}
