//! Registry of live sessions.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use tracing::debug;

use yoshimi_core::{Error, Result, SessionId, Stage};

/// Registry of live sessions, shared by every connection.
///
/// Sessions never see each other's state; the registry only holds the
/// metadata needed to enforce the session limit and to log shutdown.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionInfo>>,
    max_sessions: usize,
}

impl SessionRegistry {
    /// Create a registry admitting at most `max_sessions` sessions.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Register a new session at the secret gate.
    pub fn register(&self, peer: Option<SocketAddr>, user: &str) -> Result<SessionId> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.len() >= self.max_sessions {
            return Err(Error::SessionLimitReached(self.max_sessions));
        }

        let session_id = SessionId::new();
        sessions.insert(
            session_id,
            SessionInfo {
                session_id,
                peer,
                user: user.to_string(),
                stage: Stage::AwaitingSecret,
                started_at: SystemTime::now(),
            },
        );
        debug!("Registered session {} ({} live)", session_id, sessions.len());
        Ok(session_id)
    }

    /// Record a stage change.
    pub fn update_stage(&self, session_id: &SessionId, stage: Stage) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let info = sessions
            .get_mut(session_id)
            .ok_or(Error::SessionNotFound(*session_id))?;
        info.stage = stage;
        Ok(())
    }

    /// Look up a session.
    pub fn get(&self, session_id: &SessionId) -> Result<SessionInfo> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session_id)
            .cloned()
            .ok_or(Error::SessionNotFound(*session_id))
    }

    /// Remove a session, returning its last known state.
    pub fn remove(&self, session_id: &SessionId) -> Option<SessionInfo> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id)
    }

    /// Snapshot of all live sessions.
    pub fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.values().cloned().collect()
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Configured session limit.
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

/// Metadata about a live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session ID
    pub session_id: SessionId,
    /// Remote address, when known
    pub peer: Option<SocketAddr>,
    /// User name presented at authentication
    pub user: String,
    /// Last recorded stage
    pub stage: Stage,
    /// Start timestamp
    pub started_at: SystemTime,
}
