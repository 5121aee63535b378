//! Challenge contract shared by every minigame module.
//!
//! A module is started with a [`Stage`] to mount its round on, a
//! [`ChallengeSetup`], and an [`OutcomeReporter`]. It may finish at any later
//! point, but it reports exactly one [`ChallengeOutcome`]; extra reports are
//! dropped by the reporter itself.
use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use twox_hash::XxHash64;

use crate::constants::LOG_TARGET_CHALLENGE;
use crate::progress::Difficulty;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChallengeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Math,
    Memory,
    Logic,
}

/// Identity metadata a module exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeMeta {
    pub id: ChallengeId,
    pub name: String,
    pub kind: ChallengeKind,
}

impl ChallengeMeta {
    #[must_use]
    pub fn new(id: &str, name: &str, kind: ChallengeKind) -> Self {
        Self {
            id: ChallengeId::new(id),
            name: name.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeOutcome {
    Passed,
    Failed,
}

impl ChallengeOutcome {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl From<bool> for ChallengeOutcome {
    fn from(success: bool) -> Self {
        if success { Self::Passed } else { Self::Failed }
    }
}

/// Parameters for one run of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeSetup {
    pub difficulty: Difficulty,
    /// Seed for any content randomness, so a replayed attempt is identical.
    pub seed: u64,
}

/// What a round currently asks of the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Pick one of several answers.
    Choice {
        question: String,
        options: Vec<String>,
    },
    /// Complete a partially shown sequence.
    Sequence {
        question: String,
        shown: Vec<String>,
        options: Vec<String>,
    },
    /// Flip cards to find matching pairs.
    Board { cards: Vec<CardFace> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFace {
    Hidden,
    Revealed(String),
    Matched(String),
}

/// Player input for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Pick(usize),
    Flip(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Pending,
    Finished(ChallengeOutcome),
}

/// An interactive round mounted on a stage. The round owns the reporter and
/// reports when it finishes.
pub trait ChallengeRound: Send {
    fn prompt(&self) -> Prompt;

    /// Feed one player input. Inputs after the round finished are ignored and
    /// return the final status again.
    fn submit(&mut self, answer: Answer) -> RoundStatus;
}

/// Container a module renders into. Hosts decide how to present the round
/// and route player input to it.
pub trait Stage {
    fn mount(&mut self, title: &str, round: Box<dyn ChallengeRound>);
}

/// An interchangeable minigame.
pub trait Challenge: Send + Sync {
    fn meta(&self) -> &ChallengeMeta;

    /// Set up a round on `stage`. The outcome arrives later through
    /// `reporter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the module cannot build or mount its round.
    fn start(
        &self,
        stage: &mut dyn Stage,
        setup: ChallengeSetup,
        reporter: OutcomeReporter,
    ) -> Result<(), ChallengeError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("challenge {id} failed to start: {reason}")]
    Start { id: ChallengeId, reason: String },
    #[error("challenge round ended without reporting an outcome")]
    Abandoned,
}

/// Configuration problems in the challenge registry or selection policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("challenge id must not be empty")]
    EmptyId,
    #[error("challenge {0} is already registered")]
    Duplicate(ChallengeId),
    #[error("challenge {0} is not registered")]
    Unregistered(ChallengeId),
    #[error("selection policy has no candidates")]
    NoCandidates,
}

/// Single-shot sender for a challenge outcome. Clones share the same slot, so
/// only the first report from any of them is delivered.
#[derive(Debug, Clone)]
pub struct OutcomeReporter {
    slot: Arc<Mutex<Option<oneshot::Sender<ChallengeOutcome>>>>,
}

impl OutcomeReporter {
    /// Deliver `outcome`. Returns `false` when an outcome was already
    /// delivered or the receiving side is gone.
    pub fn report(&self, outcome: impl Into<ChallengeOutcome>) -> bool {
        let outcome = outcome.into();
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => {
                log::warn!(
                    target: LOG_TARGET_CHALLENGE,
                    "ignoring repeated challenge report ({outcome:?})"
                );
                false
            }
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().map_or(true, |slot| slot.is_none())
    }
}

/// Receiving end of an [`OutcomeReporter`].
#[derive(Debug)]
pub struct OutcomeReceiver {
    inner: oneshot::Receiver<ChallengeOutcome>,
    received: Option<ChallengeOutcome>,
}

impl OutcomeReceiver {
    /// Poll without blocking. `Ok(None)` means the round is still running.
    /// Once delivered, the outcome is returned on every later poll.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::Abandoned`] if every reporter was dropped
    /// without reporting.
    pub fn try_outcome(&mut self) -> Result<Option<ChallengeOutcome>, ChallengeError> {
        if self.received.is_none() {
            self.received = self
                .inner
                .try_recv()
                .map_err(|_| ChallengeError::Abandoned)?;
        }
        Ok(self.received)
    }

    /// Wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::Abandoned`] if every reporter was dropped
    /// without reporting.
    pub async fn outcome(self) -> Result<ChallengeOutcome, ChallengeError> {
        match self.received {
            Some(outcome) => Ok(outcome),
            None => self.inner.await.map_err(|_| ChallengeError::Abandoned),
        }
    }
}

#[must_use]
pub fn outcome_channel() -> (OutcomeReporter, OutcomeReceiver) {
    let (sender, inner) = oneshot::channel();
    (
        OutcomeReporter {
            slot: Arc::new(Mutex::new(Some(sender))),
        },
        OutcomeReceiver {
            inner,
            received: None,
        },
    )
}

/// Explicit mapping from challenge id to module.
#[derive(Clone, Default)]
pub struct ChallengeRegistry {
    modules: BTreeMap<ChallengeId, Arc<dyn Challenge>>,
}

impl fmt::Debug for ChallengeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ChallengeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its own id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or already taken.
    pub fn register(&mut self, module: impl Challenge + 'static) -> Result<(), ConfigError> {
        let id = module.meta().id.clone();
        if id.as_str().trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if self.modules.contains_key(&id) {
            return Err(ConfigError::Duplicate(id));
        }
        self.modules.insert(id, Arc::new(module));
        Ok(())
    }

    /// Builder form of [`Self::register`].
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or already taken.
    pub fn with(mut self, module: impl Challenge + 'static) -> Result<Self, ConfigError> {
        self.register(module)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Unregistered`] for unknown ids.
    pub fn get(&self, id: &ChallengeId) -> Result<Arc<dyn Challenge>, ConfigError> {
        self.modules
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigError::Unregistered(id.clone()))
    }

    #[must_use]
    pub fn contains(&self, id: &ChallengeId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ChallengeId> {
        self.modules.keys()
    }

    pub fn metas(&self) -> impl Iterator<Item = &ChallengeMeta> {
        self.modules.values().map(|module| module.meta())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Check that every id is registered.
    ///
    /// # Errors
    ///
    /// Returns the first unknown id.
    pub fn ensure_registered<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ChallengeId>,
    ) -> Result<(), ConfigError> {
        for id in ids {
            if !self.contains(id) {
                return Err(ConfigError::Unregistered(id.clone()));
            }
        }
        Ok(())
    }
}

/// Decides which module runs at a node.
pub trait ChallengeSelector: Send + Sync {
    fn select(&self, node: u32, session: &Session) -> ChallengeId;

    /// Every id `select` can return, checked against the registry up front.
    fn candidates(&self) -> Vec<ChallengeId>;
}

/// Always the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSelection(pub ChallengeId);

impl ChallengeSelector for FixedSelection {
    fn select(&self, _node: u32, _session: &Session) -> ChallengeId {
        self.0.clone()
    }

    fn candidates(&self) -> Vec<ChallengeId> {
        vec![self.0.clone()]
    }
}

/// Uniform pick among a set, stable for a given session and node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSelection {
    ids: Vec<ChallengeId>,
    salt: u64,
}

impl UniformSelection {
    /// # Errors
    ///
    /// Returns [`ConfigError::NoCandidates`] for an empty set.
    pub fn new(ids: Vec<ChallengeId>, salt: u64) -> Result<Self, ConfigError> {
        if ids.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        Ok(Self { ids, salt })
    }
}

impl ChallengeSelector for UniformSelection {
    fn select(&self, node: u32, session: &Session) -> ChallengeId {
        let mut hasher = XxHash64::with_seed(self.salt);
        hasher.write(session.session_id.as_str().as_bytes());
        hasher.write_u32(node);
        let len = u64::try_from(self.ids.len()).unwrap_or(u64::MAX);
        let index = usize::try_from(hasher.finish() % len).unwrap_or(0);
        self.ids[index].clone()
    }

    fn candidates(&self) -> Vec<ChallengeId> {
        self.ids.clone()
    }
}
