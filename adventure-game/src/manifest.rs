//! Catalog of themes, characters and games offered to clients.
use serde::{Deserialize, Serialize};

use crate::challenge::{ChallengeId, ChallengeRegistry, ConfigError};
use crate::map::LayoutKind;

const DEFAULT_MANIFEST_DATA: &str = include_str!("../assets/manifest.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub layout: LayoutKind,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub id: ChallengeId,
    pub name: String,
    /// Client-side asset that renders the game.
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub games: Vec<GameEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_MANIFEST_DATA).unwrap_or_else(|err| {
            log::warn!("embedded manifest is invalid ({err}); using fallback");
            Self::fallback()
        })
    }
}

impl Manifest {
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a manifest.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Minimal catalog compiled into the binary.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            themes: vec![Theme {
                id: "forest".to_string(),
                name: "Whispering Woods".to_string(),
                layout: LayoutKind::Winding,
                color: "#2d5a27".to_string(),
            }],
            characters: vec![Character {
                id: "bunny".to_string(),
                name: "Fluffy Bunny".to_string(),
            }],
            games: vec![GameEntry {
                id: ChallengeId::new("math_add"),
                name: "Number Cruncher".to_string(),
                script: "js/minigames/game_math_add.js".to_string(),
            }],
        }
    }

    #[must_use]
    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|theme| theme.id == id)
    }

    #[must_use]
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|character| character.id == id)
    }

    /// Layout for a theme; unknown themes use the default layout.
    #[must_use]
    pub fn layout_for(&self, theme_id: &str) -> LayoutKind {
        self.theme(theme_id)
            .map_or_else(LayoutKind::default, |theme| theme.layout)
    }

    /// Ids of every listed game.
    pub fn game_ids(&self) -> impl Iterator<Item = &ChallengeId> {
        self.games.iter().map(|game| &game.id)
    }

    /// Check that every listed game has a registered module.
    ///
    /// # Errors
    ///
    /// Returns the first game id the registry does not hold.
    pub fn validate_games(&self, registry: &ChallengeRegistry) -> Result<(), ConfigError> {
        registry.ensure_registered(self.game_ids())
    }
}
