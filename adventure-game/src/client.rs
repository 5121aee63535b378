//! Client-side mirror of a session.
//!
//! The client keeps a read-only copy of the server's session, the per-node
//! failure counter, and the attempt gate. Advances are decided by the server;
//! when no server can be reached at start the client plays a local
//! `offline-` session instead, which is never reconciled.
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::challenge::Stage;
use crate::constants::LOG_TARGET_SYNC;
use crate::engine::{Attempt, AttemptError, AttemptGate, AttemptId, ProgressionEngine};
use crate::manifest::Manifest;
use crate::progress::{
    FailureCount, FailureStep, PlayState, ProgressEvent, Transition, apply_report,
    observed_transition, reduce,
};
use crate::protocol::{ResultReport, StartSessionRequest, UpdateRequest, UpdateResponse};
use crate::service::{ProgressService, ServiceError};
use crate::session::{Session, SessionId};
use crate::store::SessionStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("server unreachable: {0}")]
    Transport(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("server error: {0}")]
    Server(String),
}

impl ApiError {
    /// Failures worth falling back to offline play for.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Server(err.to_string())
        }
    }
}

/// The three calls a client makes to the server.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn manifest(&self) -> Result<Manifest, ApiError>;
    async fn start(&self, request: StartSessionRequest) -> Result<Session, ApiError>;
    async fn update(&self, request: UpdateRequest) -> Result<UpdateResponse, ApiError>;
}

/// In-process adapter that talks to a [`ProgressService`] directly.
#[derive(Debug)]
pub struct LocalApi<S> {
    service: Arc<ProgressService<S>>,
}

impl<S> Clone for LocalApi<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: SessionStore> LocalApi<S> {
    #[must_use]
    pub const fn new(service: Arc<ProgressService<S>>) -> Self {
        Self { service }
    }

    #[must_use]
    pub fn service(&self) -> &ProgressService<S> {
        &self.service
    }
}

#[async_trait]
impl<S: SessionStore> SessionApi for LocalApi<S> {
    async fn manifest(&self) -> Result<Manifest, ApiError> {
        Ok(self.service.manifest().clone())
    }

    async fn start(&self, request: StartSessionRequest) -> Result<Session, ApiError> {
        Ok(self.service.start_session(request)?)
    }

    async fn update(&self, request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
        let (state, _) = self
            .service
            .apply_result(&request.session_id, &request.result)?;
        Ok(UpdateResponse::ok(state))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Online,
    Offline,
}

#[derive(Debug)]
pub struct ClientSession<A> {
    api: A,
    state: PlayState,
    gate: AttemptGate,
    mode: SyncMode,
}

impl<A: SessionApi> ClientSession<A> {
    /// Ask the server for a new session, falling back to an offline session
    /// if the server cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns non-transient API errors.
    pub async fn start(api: A, request: StartSessionRequest) -> Result<Self, ClientError> {
        let (session, mode) = match api.start(request.clone()).await {
            Ok(session) => (session, SyncMode::Online),
            Err(err) if err.is_transient() => {
                log::warn!(target: LOG_TARGET_SYNC, "starting offline session: {err}");
                (
                    Session::new(SessionId::offline(), request.into()),
                    SyncMode::Offline,
                )
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            api,
            state: PlayState::new(session),
            gate: AttemptGate::new(),
            mode,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.state.session
    }

    #[must_use]
    pub const fn failures(&self) -> FailureCount {
        self.state.failures
    }

    #[must_use]
    pub const fn mode(&self) -> SyncMode {
        self.mode
    }

    #[must_use]
    pub const fn gate(&self) -> &AttemptGate {
        &self.gate
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Start the challenge at `node`, which must be the current node.
    ///
    /// # Errors
    ///
    /// See [`ProgressionEngine::begin_attempt`].
    pub fn begin(
        &mut self,
        engine: &ProgressionEngine,
        node: u32,
        stage: &mut dyn Stage,
    ) -> Result<Attempt, ClientError> {
        Ok(engine.begin_attempt(&self.state.session, &mut self.gate, node, stage)?)
    }

    /// Close an attempt without waiting for its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if `attempt` is not outstanding.
    pub fn abandon(&mut self, attempt: AttemptId) -> Result<(), ClientError> {
        Ok(self.gate.release(attempt)?)
    }

    /// Apply the outcome the attempt's module reported. Retries stay local;
    /// clears and mercy advances are sent to the server and the cached
    /// session is replaced by its answer.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown, pending or abandoned attempts (see
    /// [`AttemptGate::settle`]) or a failed server call. In every case the
    /// cached session and failure counter are left as they were.
    pub async fn complete(&mut self, attempt: &mut Attempt) -> Result<Transition, ClientError> {
        let outcome = self.gate.settle(attempt)?;
        if self.mode == SyncMode::Offline || self.state.session.is_finished() {
            let (state, transition) = reduce(
                self.state.clone(),
                ProgressEvent::from(outcome.is_success()),
            );
            self.state = state;
            return Ok(transition);
        }

        let report = if outcome.is_success() {
            ResultReport::success()
        } else {
            match self.state.failures.record() {
                FailureStep::Retry(failures) => {
                    self.state.failures = failures;
                    return Ok(Transition::Retry {
                        failures: failures.get(),
                    });
                }
                FailureStep::Mercy => ResultReport::mercy(),
            }
        };
        self.sync(report).await
    }

    async fn sync(&mut self, report: ResultReport) -> Result<Transition, ClientError> {
        let request = UpdateRequest {
            session_id: self.state.session.session_id.clone(),
            result: report,
        };
        let response = self.api.update(request).await.map_err(|err| {
            log::warn!(target: LOG_TARGET_SYNC, "progress update failed: {err}");
            err
        })?;

        let mut expected = self.state.session.clone();
        let mut transition = apply_report(&mut expected, &report);
        if expected != response.state {
            log::warn!(
                target: LOG_TARGET_SYNC,
                "server state for {} differs from local prediction; adopting server copy",
                response.state.session_id
            );
            transition = observed_transition(&self.state.session, &response.state);
        }
        self.state = PlayState::new(response.state);
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Answer;
    use crate::challenges::testing::{FAIL, HeldStage, PASS, verdict_engine};
    use crate::store::MemorySessionStore;

    /// Server that is never reachable.
    struct Down;

    #[async_trait]
    impl SessionApi for Down {
        async fn manifest(&self) -> Result<Manifest, ApiError> {
            Err(ApiError::Transport("connection refused".into()))
        }

        async fn start(&self, _request: StartSessionRequest) -> Result<Session, ApiError> {
            Err(ApiError::Transport("connection refused".into()))
        }

        async fn update(&self, _request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
            Err(ApiError::Transport("connection refused".into()))
        }
    }

    /// Reachable for `start`, unreachable for every update.
    struct DropsUpdates(LocalApi<MemorySessionStore>);

    #[async_trait]
    impl SessionApi for DropsUpdates {
        async fn manifest(&self) -> Result<Manifest, ApiError> {
            self.0.manifest().await
        }

        async fn start(&self, request: StartSessionRequest) -> Result<Session, ApiError> {
            self.0.start(request).await
        }

        async fn update(&self, _request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
            Err(ApiError::Transport("timed out".into()))
        }
    }

    fn local_api() -> LocalApi<MemorySessionStore> {
        LocalApi::new(Arc::new(ProgressService::new(
            MemorySessionStore::new(),
            Manifest::default(),
        )))
    }

    #[test]
    fn service_errors_map_to_api_errors() {
        let not_found = ApiError::from(ServiceError::NotFound(SessionId::new("x")));
        assert!(matches!(not_found, ApiError::NotFound(_)));
        assert!(!not_found.is_transient());
        let server = ApiError::from(ServiceError::Store(crate::store::StoreError::Unavailable(
            "disk".into(),
        )));
        assert!(matches!(server, ApiError::Server(_)));
    }

    /// Answers every update with the stored session, unchanged.
    struct IgnoresUpdates(LocalApi<MemorySessionStore>);

    #[async_trait]
    impl SessionApi for IgnoresUpdates {
        async fn manifest(&self) -> Result<Manifest, ApiError> {
            self.0.manifest().await
        }

        async fn start(&self, request: StartSessionRequest) -> Result<Session, ApiError> {
            self.0.start(request).await
        }

        async fn update(&self, request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
            let state = self.0.service().session(&request.session_id)?;
            Ok(UpdateResponse::ok(state))
        }
    }

    async fn play<A: SessionApi>(
        client: &mut ClientSession<A>,
        engine: &ProgressionEngine,
        answer: Answer,
    ) -> Result<Transition, ClientError> {
        let mut stage = HeldStage::default();
        let node = client.session().current_node;
        let mut attempt = client.begin(engine, node, &mut stage)?;
        stage.submit(answer);
        client.complete(&mut attempt).await
    }

    fn request(character: &str) -> StartSessionRequest {
        StartSessionRequest::new("P", character, "forest")
    }

    #[test]
    fn unreachable_server_falls_back_to_offline_session() {
        futures::executor::block_on(async {
            let mut client = ClientSession::start(Down, request("bear")).await.unwrap();
            assert_eq!(client.mode(), SyncMode::Offline);
            assert!(client.session().session_id.is_offline());
            assert_eq!(client.session().character_id, "bear");

            let transition = play(&mut client, &verdict_engine(), PASS).await.unwrap();
            assert!(transition.advanced());
            assert_eq!(client.session().total_stars, 3);
        });
    }

    #[test]
    fn online_client_adopts_server_state() {
        futures::executor::block_on(async {
            let api = local_api();
            let mut client = ClientSession::start(api.clone(), request("bear")).await.unwrap();
            assert_eq!(client.mode(), SyncMode::Online);
            let transition = play(&mut client, &verdict_engine(), PASS).await.unwrap();
            assert!(transition.advanced());
            let stored = api.service().session(&client.session().session_id).unwrap();
            assert_eq!(&stored, client.session());
            assert_eq!(stored.total_stars, 3);
        });
    }

    #[test]
    fn retries_stay_local_until_mercy() {
        futures::executor::block_on(async {
            let api = local_api();
            let mut client = ClientSession::start(api.clone(), request("bunny")).await.unwrap();
            let engine = verdict_engine();
            let id = client.session().session_id.clone();
            for expected in 1..=2u8 {
                let transition = play(&mut client, &engine, FAIL).await.unwrap();
                assert_eq!(transition, Transition::Retry { failures: expected });
                assert_eq!(api.service().session(&id).unwrap().current_node, 0);
            }
            let transition = play(&mut client, &engine, FAIL).await.unwrap();
            assert!(matches!(transition, Transition::Mercy { node: 0, .. }));
            assert_eq!(client.failures(), FailureCount::ZERO);
            let stored = api.service().session(&id).unwrap();
            assert!(stored.mercy_mode);
            assert_eq!(stored.current_node, 1);
        });
    }

    #[test]
    fn reported_outcome_decides_what_is_sent() {
        futures::executor::block_on(async {
            let api = local_api();
            let mut client = ClientSession::start(api.clone(), request("owl")).await.unwrap();
            let mut stage = HeldStage::default();
            let mut attempt = client.begin(&verdict_engine(), 0, &mut stage).unwrap();
            let err = client.complete(&mut attempt).await.unwrap_err();
            assert_eq!(err, ClientError::Attempt(AttemptError::Pending(attempt.id)));
            assert!(!client.gate().is_idle());

            stage.submit(FAIL);
            let transition = client.complete(&mut attempt).await.unwrap();
            assert_eq!(transition, Transition::Retry { failures: 1 });
            assert_eq!(client.session().total_stars, 0);
            let err = client.complete(&mut attempt).await.unwrap_err();
            assert_eq!(err, ClientError::Attempt(AttemptError::UnknownAttempt(attempt.id)));
        });
    }

    #[test]
    fn abandoned_round_changes_nothing() {
        futures::executor::block_on(async {
            let api = local_api();
            let mut client = ClientSession::start(api, request("fox")).await.unwrap();
            let before = client.session().clone();
            let mut stage = HeldStage::default();
            let mut attempt = client.begin(&verdict_engine(), 0, &mut stage).unwrap();
            stage.round = None;
            let err = client.complete(&mut attempt).await.unwrap_err();
            assert_eq!(err, ClientError::Attempt(AttemptError::Abandoned(attempt.id)));
            assert!(client.gate().is_idle());
            assert_eq!(client.session(), &before);
            assert_eq!(client.failures(), FailureCount::ZERO);
        });
    }

    #[test]
    fn diverging_server_answer_decides_the_transition() {
        futures::executor::block_on(async {
            let api = IgnoresUpdates(local_api());
            let mut client = ClientSession::start(api, request("cat")).await.unwrap();
            let transition = play(&mut client, &verdict_engine(), PASS).await.unwrap();
            assert_eq!(transition, Transition::Unchanged);
            assert_eq!(client.session().current_node, 0);
            assert_eq!(client.session().total_stars, 0);
        });
    }

    #[test]
    fn transport_error_keeps_cache_and_counter() {
        futures::executor::block_on(async {
            let api = DropsUpdates(local_api());
            let mut client = ClientSession::start(api, request("alien")).await.unwrap();
            let engine = verdict_engine();
            for _ in 0..2 {
                play(&mut client, &engine, FAIL).await.unwrap();
            }
            let before = client.session().clone();
            let err = play(&mut client, &engine, FAIL).await.unwrap_err();
            assert!(matches!(err, ClientError::Api(ApiError::Transport(_))));
            assert_eq!(client.session(), &before);
            assert_eq!(client.failures().get(), 2);
            assert!(client.gate().is_idle());

            assert!(play(&mut client, &engine, PASS).await.is_err());
            assert_eq!(client.session(), &before);
        });
    }
}
