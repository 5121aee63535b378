//! Attempt orchestration: picks a challenge for the current node, starts it,
//! and guards against overlapping attempts.
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::challenge::{
    ChallengeError, ChallengeId, ChallengeOutcome, ChallengeRegistry, ChallengeSelector,
    ChallengeSetup, ConfigError, OutcomeReceiver, Stage, UniformSelection, outcome_channel,
};
use crate::constants::{LOG_TARGET_CHALLENGE, LOG_TARGET_PROGRESS};
use crate::progress::{Difficulty, PlayState, ProgressEvent, Transition, next_difficulty, reduce};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("session has already reached victory")]
    Finished,
    #[error("node {requested} is not actionable; current node is {current}")]
    NotCurrentNode { requested: u32, current: u32 },
    #[error("attempt {0} is still in progress")]
    InFlight(AttemptId),
    #[error("challenge configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Launch(#[from] ChallengeError),
    #[error("attempt {0} is not the outstanding attempt")]
    UnknownAttempt(AttemptId),
    #[error("attempt {0} has not reported an outcome yet")]
    Pending(AttemptId),
    #[error("attempt {0} ended without an outcome")]
    Abandoned(AttemptId),
}

/// Allows at most one outstanding attempt per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptGate {
    issued: u64,
    outstanding: Option<AttemptId>,
}

impl AttemptGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.outstanding.is_none()
    }

    #[must_use]
    pub const fn outstanding(&self) -> Option<AttemptId> {
        self.outstanding
    }

    const fn upcoming(&self) -> AttemptId {
        AttemptId(self.issued + 1)
    }

    fn open(&mut self) -> Result<AttemptId, AttemptError> {
        if let Some(current) = self.outstanding {
            return Err(AttemptError::InFlight(current));
        }
        let id = self.upcoming();
        self.issued = id.0;
        self.outstanding = Some(id);
        Ok(id)
    }

    /// Close the outstanding attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptError::UnknownAttempt`] if `id` is not outstanding.
    pub fn release(&mut self, id: AttemptId) -> Result<(), AttemptError> {
        if self.outstanding != Some(id) {
            return Err(AttemptError::UnknownAttempt(id));
        }
        self.outstanding = None;
        Ok(())
    }

    /// Take the outcome the module reported for `attempt` and close it.
    /// A round that is still running keeps the gate closed; an abandoned
    /// one releases it.
    ///
    /// # Errors
    ///
    /// [`AttemptError::UnknownAttempt`] if `attempt` is not outstanding,
    /// [`AttemptError::Pending`] while the round runs, and
    /// [`AttemptError::Abandoned`] if it was dropped unresolved.
    pub fn settle(&mut self, attempt: &mut Attempt) -> Result<ChallengeOutcome, AttemptError> {
        if self.outstanding != Some(attempt.id) {
            return Err(AttemptError::UnknownAttempt(attempt.id));
        }
        match attempt.try_outcome() {
            Ok(Some(outcome)) => {
                self.release(attempt.id)?;
                Ok(outcome)
            }
            Ok(None) => Err(AttemptError::Pending(attempt.id)),
            Err(_) => {
                self.release(attempt.id)?;
                log::warn!(
                    target: LOG_TARGET_CHALLENGE,
                    "attempt {} at node {} was abandoned",
                    attempt.id,
                    attempt.node
                );
                Err(AttemptError::Abandoned(attempt.id))
            }
        }
    }
}

/// A started challenge waiting for its outcome.
#[derive(Debug)]
pub struct Attempt {
    pub id: AttemptId,
    pub node: u32,
    pub challenge: ChallengeId,
    pub difficulty: Difficulty,
    receiver: OutcomeReceiver,
}

impl Attempt {
    /// Poll for the outcome without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::Abandoned`] if the round was dropped unresolved.
    pub fn try_outcome(&mut self) -> Result<Option<ChallengeOutcome>, ChallengeError> {
        self.receiver.try_outcome()
    }

    /// Wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::Abandoned`] if the round was dropped unresolved.
    pub async fn outcome(self) -> Result<ChallengeOutcome, ChallengeError> {
        self.receiver.outcome().await
    }
}

/// Derive a content seed for one attempt.
#[must_use]
pub fn attempt_seed(session: &Session, node: u32, attempt: AttemptId) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(session.session_id.as_str().as_bytes());
    hasher.write_u32(node);
    hasher.write_u64(attempt.get());
    hasher.finish()
}

/// Registry plus selection policy, validated together.
#[derive(Clone)]
pub struct ProgressionEngine {
    registry: ChallengeRegistry,
    selector: Arc<dyn ChallengeSelector>,
}

impl fmt::Debug for ProgressionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressionEngine")
            .field("registry", &self.registry)
            .field("candidates", &self.selector.candidates())
            .finish()
    }
}

impl ProgressionEngine {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the selector can pick an id the registry
    /// does not hold, or has no candidates at all.
    pub fn new(
        registry: ChallengeRegistry,
        selector: impl ChallengeSelector + 'static,
    ) -> Result<Self, ConfigError> {
        let candidates = selector.candidates();
        if candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        registry.ensure_registered(&candidates)?;
        Ok(Self {
            registry,
            selector: Arc::new(selector),
        })
    }

    /// Built-in modules with a uniform pick among them.
    ///
    /// # Errors
    ///
    /// Propagates registry construction failures.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        let registry = ChallengeRegistry::with_defaults()?;
        let ids = registry.ids().cloned().collect();
        Self::new(registry, UniformSelection::new(ids, 0)?)
    }

    #[must_use]
    pub const fn registry(&self) -> &ChallengeRegistry {
        &self.registry
    }

    /// Start the challenge for `node`. Nothing about `session` changes; the
    /// gate only opens once the module has mounted its round.
    ///
    /// # Errors
    ///
    /// Rejects finished sessions, nodes other than the current one, and calls
    /// while another attempt is outstanding. Module lookup and start failures
    /// are reported as configuration errors.
    pub fn begin_attempt(
        &self,
        session: &Session,
        gate: &mut AttemptGate,
        node: u32,
        stage: &mut dyn Stage,
    ) -> Result<Attempt, AttemptError> {
        if session.is_finished() {
            return Err(AttemptError::Finished);
        }
        if node != session.current_node {
            return Err(AttemptError::NotCurrentNode {
                requested: node,
                current: session.current_node,
            });
        }
        if let Some(current) = gate.outstanding() {
            return Err(AttemptError::InFlight(current));
        }

        let challenge = self.selector.select(node, session);
        let module = self.registry.get(&challenge).map_err(|err| {
            log::error!(target: LOG_TARGET_CHALLENGE, "cannot run node {node}: {err}");
            err
        })?;
        let difficulty = next_difficulty(session);
        let id = gate.upcoming();
        let setup = ChallengeSetup {
            difficulty,
            seed: attempt_seed(session, node, id),
        };
        let (reporter, receiver) = outcome_channel();
        module.start(stage, setup, reporter).map_err(|err| {
            log::error!(
                target: LOG_TARGET_CHALLENGE,
                "challenge {challenge} failed to start: {err}"
            );
            err
        })?;
        let id = gate.open()?;
        log::debug!(
            target: LOG_TARGET_PROGRESS,
            "session {} attempt {id}: {challenge} at node {node}, difficulty {difficulty}",
            session.session_id
        );
        Ok(Attempt {
            id,
            node,
            challenge,
            difficulty,
            receiver,
        })
    }
}

/// In-process play: the reducer plus an attempt gate, with no server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlay {
    state: PlayState,
    gate: AttemptGate,
}

impl LocalPlay {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            state: PlayState::new(session),
            gate: AttemptGate::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PlayState {
        &self.state
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.state.session
    }

    #[must_use]
    pub const fn gate(&self) -> &AttemptGate {
        &self.gate
    }

    /// Start an attempt at the current node.
    ///
    /// # Errors
    ///
    /// See [`ProgressionEngine::begin_attempt`].
    pub fn begin(
        &mut self,
        engine: &ProgressionEngine,
        stage: &mut dyn Stage,
    ) -> Result<Attempt, AttemptError> {
        let node = self.state.session.current_node;
        engine.begin_attempt(&self.state.session, &mut self.gate, node, stage)
    }

    /// Fold the outcome the attempt's module reported into the state.
    ///
    /// # Errors
    ///
    /// See [`AttemptGate::settle`]. The state is left as it was on error.
    pub fn complete(&mut self, attempt: &mut Attempt) -> Result<Transition, AttemptError> {
        let outcome = self.gate.settle(attempt)?;
        let (state, transition) = reduce(
            self.state.clone(),
            ProgressEvent::from(outcome.is_success()),
        );
        self.state = state;
        Ok(transition)
    }

    /// Close an attempt without waiting for its outcome, e.g. when the player
    /// leaves the round.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptError::UnknownAttempt`] for ids that are not
    /// outstanding.
    pub fn abandon(&mut self, attempt: AttemptId) -> Result<(), AttemptError> {
        self.gate.release(attempt)
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        self.state.session
    }
}
