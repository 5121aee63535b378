//! Adventure Path Game Engine
//!
//! Platform-agnostic core for Adventure Path, a children's learning game in
//! which a character walks a path of challenge nodes. This crate holds the
//! progression rules, the node map, the challenge contract with its built-in
//! minigames, session persistence contracts, and the client/server sync
//! protocol. It has no UI or network dependencies.

pub mod challenge;
pub mod challenges;
pub mod client;
pub mod constants;
pub mod engine;
pub mod manifest;
pub mod map;
pub mod progress;
pub mod protocol;
pub mod service;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use challenge::{
    Answer, CardFace, Challenge, ChallengeError, ChallengeId, ChallengeKind, ChallengeMeta,
    ChallengeOutcome, ChallengeRegistry, ChallengeRound, ChallengeSelector, ChallengeSetup,
    ConfigError, FixedSelection, OutcomeReceiver, OutcomeReporter, Prompt, RoundStatus, Stage,
    UniformSelection, outcome_channel,
};
pub use challenges::{MathAdd, MemoryMatch, PatternMatch};
pub use client::{ApiError, ClientError, ClientSession, LocalApi, SessionApi, SyncMode};
pub use constants::{MERCY_THRESHOLD, NODE_COUNT, STAR_AWARD};
pub use engine::{Attempt, AttemptError, AttemptGate, AttemptId, LocalPlay, ProgressionEngine};
pub use manifest::{Character, GameEntry, Manifest, Theme};
pub use map::{Bounds, LayoutKind, MapNode, NodeStatus, PathMap, Point, layout_path, status_of};
pub use progress::{
    Difficulty, FailureCount, PlayState, ProgressEvent, Transition, apply_clear, apply_mercy,
    apply_report, effective_difficulty, next_difficulty, observed_transition, reduce,
};
pub use protocol::{
    ClearResponse, ErrorBody, ResultReport, StartSessionRequest, UpdateRequest, UpdateResponse,
};
pub use service::{ProgressService, ServiceError};
pub use session::{NewSession, NodeRecord, NodeResult, Progress, Session, SessionError, SessionId};
pub use store::{MemorySessionStore, SessionStore, StoreError};
