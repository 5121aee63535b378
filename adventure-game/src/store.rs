//! Session persistence contract.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::session::{NewSession, Session, SessionError, SessionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session record could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored session {id} is corrupt: {reason}")]
    Corrupt { id: SessionId, reason: SessionError },
    #[error("{0} is not a valid session id")]
    InvalidId(SessionId),
    #[error("session storage is unavailable: {0}")]
    Unavailable(String),
}

/// Whole-record persistence for sessions. Writes overwrite; the last write
/// wins.
pub trait SessionStore: Send + Sync {
    /// Persist a fresh session and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn create(&self, fields: NewSession) -> Result<Session, StoreError>;

    /// `Ok(None)` when no session has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read.
    fn load(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Every stored session, for administration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be enumerated.
    fn list(&self) -> Result<Vec<Session>, StoreError>;

    /// Delete every session and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if records cannot be deleted.
    fn clear(&self) -> Result<usize, StoreError>;
}

/// In-memory store for tests and simulations.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<SessionId, Session>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("session map lock poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, fields: NewSession) -> Result<Session, StoreError> {
        let session = Session::new(SessionId::generate(), fields);
        self.sessions()?
            .insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions()?.get(id).cloned())
    }

    fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions()?
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self.sessions()?.values().cloned().collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(sessions)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut sessions = self.sessions()?;
        let deleted = sessions.len();
        sessions.clear();
        Ok(deleted)
    }
}
