//! Session record: the durable unit of player progress.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_PROFILE_NAME, NODE_COUNT, OFFLINE_SESSION_PREFIX, STAR_AWARD, STARTING_LEVEL,
};

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh server-side identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Identifier for a client-local degraded session. The prefix keeps these
    /// apart from anything a server hands out.
    #[must_use]
    pub fn offline() -> Self {
        Self(format!("{OFFLINE_SESSION_PREFIX}{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.0.starts_with(OFFLINE_SESSION_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Cosmetic selection captured when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewSession {
    pub profile_name: String,
    pub character_id: String,
    pub theme_id: String,
}

impl NewSession {
    #[must_use]
    pub fn new(
        profile_name: impl Into<String>,
        character_id: impl Into<String>,
        theme_id: impl Into<String>,
    ) -> Self {
        let profile_name = profile_name.into();
        Self {
            profile_name: if profile_name.trim().is_empty() {
                DEFAULT_PROFILE_NAME.to_string()
            } else {
                profile_name
            },
            character_id: character_id.into(),
            theme_id: theme_id.into(),
        }
    }
}

/// How a node was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeResult {
    Cleared,
    Mercy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub node: u32,
    pub result: NodeResult,
    pub stars: u32,
}

/// Top-level progression state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress {
    InProgress { node: u32 },
    Victory,
}

impl Progress {
    #[must_use]
    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Victory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: SessionId,
    pub profile_name: String,
    pub character_id: String,
    pub theme_id: String,
    pub current_level: u32,
    pub current_node: u32,
    pub total_stars: u32,
    pub mercy_mode: bool,
    #[serde(default)]
    pub node_history: Vec<NodeRecord>,
}

impl Session {
    /// Fresh session at the start of the path.
    #[must_use]
    pub fn new(session_id: SessionId, fields: NewSession) -> Self {
        Self {
            session_id,
            profile_name: fields.profile_name,
            character_id: fields.character_id,
            theme_id: fields.theme_id,
            current_level: STARTING_LEVEL,
            current_node: 0,
            total_stars: 0,
            mercy_mode: false,
            node_history: Vec::new(),
        }
    }

    #[must_use]
    pub const fn progress(&self) -> Progress {
        if self.current_node >= NODE_COUNT {
            Progress::Victory
        } else {
            Progress::InProgress {
                node: self.current_node,
            }
        }
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.progress().is_victory()
    }

    /// Check a record read back from storage against the session invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.session_id.as_str().is_empty() {
            return Err(SessionError::EmptyId);
        }
        if self.current_node > NODE_COUNT {
            return Err(SessionError::NodeOutOfRange {
                node: self.current_node,
                max: NODE_COUNT,
            });
        }
        let cleared = self
            .node_history
            .iter()
            .filter(|record| record.result == NodeResult::Cleared)
            .count();
        let cleared = u32::try_from(cleared).unwrap_or(u32::MAX);
        if !self.node_history.is_empty() && self.total_stars != cleared * STAR_AWARD {
            return Err(SessionError::StarMismatch {
                stars: self.total_stars,
                cleared,
            });
        }
        Ok(())
    }
}

/// Invariant violations found in a stored session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session id is empty")]
    EmptyId,
    #[error("current node {node} exceeds path length {max}")]
    NodeOutOfRange { node: u32, max: u32 },
    #[error("total stars {stars} do not match {cleared} cleared nodes")]
    StarMismatch { stars: u32, cleared: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Session {
        Session::new(
            SessionId::new("abc"),
            NewSession::new("Mia", "bunny", "forest"),
        )
    }

    #[test]
    fn new_session_starts_at_the_trailhead() {
        let session = fresh();
        assert_eq!(session.current_node, 0);
        assert_eq!(session.current_level, 1);
        assert_eq!(session.total_stars, 0);
        assert!(!session.mercy_mode);
        assert!(session.node_history.is_empty());
        assert_eq!(session.progress(), Progress::InProgress { node: 0 });
    }

    #[test]
    fn blank_profile_name_falls_back_to_default() {
        let fields = NewSession::new("  ", "bear", "space");
        assert_eq!(fields.profile_name, DEFAULT_PROFILE_NAME);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(fresh()).unwrap();
        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["characterId"], "bunny");
        assert_eq!(json["currentNode"], 0);
        assert_eq!(json["mercyMode"], false);
        assert!(json["nodeHistory"].as_array().unwrap().is_empty());
    }

    #[test]
    fn history_defaults_when_absent() {
        let json = r#"{"sessionId":"x","profileName":"P","characterId":"bear",
            "themeId":"forest","currentLevel":1,"currentNode":2,"totalStars":6,
            "mercyMode":false}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert!(session.node_history.is_empty());
        assert!(session.validate().is_ok());
    }

    #[test]
    fn offline_ids_are_distinguishable() {
        let offline = SessionId::offline();
        assert!(offline.is_offline());
        assert!(offline.as_str().starts_with("offline-"));
        assert!(!SessionId::generate().is_offline());
    }

    #[test]
    fn validate_rejects_out_of_range_node() {
        let mut session = fresh();
        session.current_node = NODE_COUNT + 1;
        assert_eq!(
            session.validate(),
            Err(SessionError::NodeOutOfRange { node: 10, max: 9 })
        );
        session.current_node = NODE_COUNT;
        assert!(session.validate().is_ok());
        assert!(session.is_finished());
    }

    #[test]
    fn validate_checks_stars_against_history() {
        let mut session = fresh();
        session.node_history.push(NodeRecord {
            node: 0,
            result: NodeResult::Cleared,
            stars: STAR_AWARD,
        });
        session.current_node = 1;
        session.total_stars = 4;
        assert!(matches!(
            session.validate(),
            Err(SessionError::StarMismatch { .. })
        ));
        session.total_stars = 3;
        assert!(session.validate().is_ok());
    }
}
