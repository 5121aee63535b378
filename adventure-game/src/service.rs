//! Authoritative server-side operations over a [`SessionStore`].
use thiserror::Error;

use crate::constants::LOG_TARGET_SYNC;
use crate::manifest::Manifest;
use crate::progress::{Transition, apply_report};
use crate::protocol::{ResultReport, StartSessionRequest};
use crate::session::{Session, SessionId};
use crate::store::{SessionStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session {0} is a client-local offline session")]
    OfflineSession(SessionId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Whether the caller asked for a session the server does not hold.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::OfflineSession(_))
    }
}

/// Progression service: the only writer of stored sessions.
#[derive(Debug)]
pub struct ProgressService<S> {
    store: S,
    manifest: Manifest,
}

impl<S: SessionStore> ProgressService<S> {
    #[must_use]
    pub const fn new(store: S, manifest: Manifest) -> Self {
        Self { store, manifest }
    }

    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// # Errors
    ///
    /// Returns an error if the new session cannot be persisted.
    pub fn start_session(&self, request: StartSessionRequest) -> Result<Session, ServiceError> {
        let session = self.store.create(request.into())?;
        log::info!(
            target: LOG_TARGET_SYNC,
            "started session {} for {} ({}, {})",
            session.session_id,
            session.profile_name,
            session.character_id,
            session.theme_id
        );
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn session(&self, id: &SessionId) -> Result<Session, ServiceError> {
        if id.is_offline() {
            return Err(ServiceError::OfflineSession(id.clone()));
        }
        self.store
            .load(id)?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Apply a client-reported result and persist the new state.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for unknown or offline ids and store errors
    /// when the record cannot be read or written.
    pub fn apply_result(
        &self,
        id: &SessionId,
        report: &ResultReport,
    ) -> Result<(Session, Transition), ServiceError> {
        let mut session = self.session(id)?;
        let transition = apply_report(&mut session, report);
        if transition.advanced() {
            self.store.save(&session)?;
        }
        log::debug!(target: LOG_TARGET_SYNC, "session {id}: {transition:?}");
        Ok((session, transition))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    pub fn sessions(&self) -> Result<Vec<Session>, ServiceError> {
        Ok(self.store.list()?)
    }

    /// # Errors
    ///
    /// Returns an error if sessions cannot be deleted.
    pub fn clear_sessions(&self) -> Result<usize, ServiceError> {
        let deleted = self.store.clear()?;
        log::warn!(target: LOG_TARGET_SYNC, "cleared {deleted} sessions");
        Ok(deleted)
    }
}
