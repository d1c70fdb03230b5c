//! Server lifecycle: start listening, accept connections, stop within a bound.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use russh::server;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use yoshimi_core::{Error, Result, ServerConfig};
use yoshimi_session::SessionRegistry;

use crate::server::{ConnectionHandler, ServerShared};

/// Time a connection gets to flush its final frame once shutdown is forced.
const FORCE_CLOSE_GRACE: Duration = Duration::from_millis(500);
/// Time `stop` waits for connections after forcing them closed.
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(2);
/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How a stop completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every session ended on its own within the bound
    Graceful,
    /// Remaining sessions were closed when the bound elapsed
    Forced,
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: CancellationToken,
    force: CancellationToken,
    tracker: TaskTracker,
    accept_task: JoinHandle<()>,
    shared: Arc<ServerShared>,
}

impl ServerHandle {
    /// Load the host key, bind the listener and start accepting connections.
    ///
    /// The configuration is used as given; callers validate it first.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let key_path = &config.server.host_key;
        let key = russh::keys::load_secret_key(key_path, None)
            .map_err(|e| Error::HostKey(format!("{}: {}", key_path.display(), e)))?;

        let ssh_config = Arc::new(server::Config {
            keys: vec![key],
            inactivity_timeout: config.server.inactivity_timeout(),
            auth_rejection_time: Duration::from_secs(1),
            auth_rejection_time_initial: Some(Duration::ZERO),
            ..Default::default()
        });

        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let stop = CancellationToken::new();
        let force = CancellationToken::new();
        let tracker = TaskTracker::new();
        let shared = Arc::new(ServerShared::new(&config, force.clone(), tracker.clone()));

        info!("Starting SSH server on {}", local_addr);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            ssh_config,
            Arc::clone(&shared),
            stop.clone(),
            force.clone(),
            tracker.clone(),
        ));

        Ok(Self {
            local_addr,
            stop,
            force,
            tracker,
            accept_task,
            shared,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registry of live sessions.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.shared.registry()
    }

    /// Stop accepting, let sessions finish for up to `timeout`, then close
    /// whatever remains.
    pub async fn stop(self, timeout: Duration) -> ShutdownOutcome {
        info!(
            "Stopping SSH server ({} live sessions, timeout {:?})",
            self.registry().count(),
            timeout
        );
        self.stop.cancel();
        if let Err(e) = self.accept_task.await {
            warn!("Accept loop ended abnormally: {}", e);
        }
        self.tracker.close();

        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            info!("All sessions ended");
            return ShutdownOutcome::Graceful;
        }

        warn!(
            "Shutdown timeout reached; closing {} sessions",
            self.shared.registry().count()
        );
        self.force.cancel();
        if tokio::time::timeout(FORCE_CLOSE_WAIT, self.tracker.wait())
            .await
            .is_err()
        {
            warn!("{} connections still open after forced close", self.tracker.len());
        }
        ShutdownOutcome::Forced
    }
}

async fn accept_loop(
    listener: TcpListener,
    ssh_config: Arc<server::Config>,
    shared: Arc<ServerShared>,
    stop: CancellationToken,
    force: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            _ = stop.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Accept failed: {}", e);
                if backoff(&stop).await {
                    continue;
                }
                break;
            }
        };

        debug!("Connection from {}", peer);
        let handler = ConnectionHandler::new(Arc::clone(&shared), Some(peer));
        tracker.spawn(serve_connection(
            Arc::clone(&ssh_config),
            stream,
            peer,
            handler,
            force.clone(),
        ));
    }
    debug!("No longer accepting connections");
}

/// Wait out [`ACCEPT_BACKOFF`]. Returns `false` if stopped meanwhile.
async fn backoff(stop: &CancellationToken) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

async fn serve_connection(
    ssh_config: Arc<server::Config>,
    stream: TcpStream,
    peer: SocketAddr,
    handler: ConnectionHandler,
    force: CancellationToken,
) {
    let connection = async move {
        let running = server::run_stream(ssh_config, stream, handler).await?;
        running.await
    };
    tokio::pin!(connection);

    let result = tokio::select! {
        result = &mut connection => result,
        _ = force.cancelled() => {
            // Hosts restore their terminals on the same signal; give the
            // final frames a moment to reach the client.
            match tokio::time::timeout(FORCE_CLOSE_GRACE, &mut connection).await {
                Ok(result) => result,
                Err(_) => {
                    debug!("Dropping connection {}", peer);
                    return;
                }
            }
        }
    };

    match result {
        Ok(()) => debug!("Connection {} closed", peer),
        Err(e) => debug!("Connection {} ended: {}", peer, e),
    }
}
