//! Request and response shapes exchanged between a client and the server.
//!
//! Field names follow the camelCase wire format of the HTTP API.
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PROFILE_NAME, STAR_AWARD};
use crate::session::{NewSession, Session, SessionId};

/// Body of `POST session/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default = "default_profile_name")]
    pub profile_name: String,
    #[serde(default)]
    pub char_id: String,
    #[serde(default)]
    pub theme_id: String,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE_NAME.to_string()
}

impl StartSessionRequest {
    #[must_use]
    pub fn new(
        profile_name: impl Into<String>,
        char_id: impl Into<String>,
        theme_id: impl Into<String>,
    ) -> Self {
        Self {
            profile_name: profile_name.into(),
            char_id: char_id.into(),
            theme_id: theme_id.into(),
        }
    }
}

impl From<StartSessionRequest> for NewSession {
    fn from(request: StartSessionRequest) -> Self {
        Self::new(request.profile_name, request.char_id, request.theme_id)
    }
}

/// Result of one attempt as the client reports it. The server treats `stars`
/// as informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    pub success: bool,
    #[serde(default)]
    pub stars: u32,
    #[serde(default)]
    pub used_mercy: bool,
}

impl ResultReport {
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            stars: STAR_AWARD,
            used_mercy: false,
        }
    }

    #[must_use]
    pub const fn mercy() -> Self {
        Self {
            success: false,
            stars: 0,
            used_mercy: true,
        }
    }

    #[must_use]
    pub const fn failure() -> Self {
        Self {
            success: false,
            stars: 0,
            used_mercy: false,
        }
    }
}

/// Body of `POST session/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub session_id: SessionId,
    pub result: ResultReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub state: Session,
}

impl UpdateResponse {
    #[must_use]
    pub const fn ok(state: Session) -> Self {
        Self {
            success: true,
            state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub const SESSION_NOT_FOUND: &'static str = "Session not found";

    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    #[must_use]
    pub fn session_not_found() -> Self {
        Self::new(Self::SESSION_NOT_FOUND)
    }
}

/// Body returned by the bulk delete of the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub deleted: usize,
}
