//! Centralized balance and layout constants for Adventure Path.
//!
//! These values define the progression rules and the map geometry. Keeping
//! them together ensures that gameplay can only be adjusted via code changes
//! reviewed in version control, rather than through client-supplied data.

// Progression ---------------------------------------------------------------
/// Number of challenge nodes on every path.
pub const NODE_COUNT: u32 = 9;
/// Stars granted for clearing a node. Star scoring is otherwise unweighted.
pub const STAR_AWARD: u32 = 3;
/// Consecutive failures at one node that trigger a mercy advance.
pub const MERCY_THRESHOLD: u8 = 3;
/// Floor for every difficulty handed to a challenge module.
pub const MIN_DIFFICULTY: u32 = 1;
/// Highest difficulty the addition challenge scales to; larger levels reuse it.
pub const MAX_MATH_DIFFICULTY: u32 = 25;
/// Level assigned to freshly created sessions.
pub const STARTING_LEVEL: u32 = 1;

// Sessions ------------------------------------------------------------------
pub const OFFLINE_SESSION_PREFIX: &str = "offline-";
pub const DEFAULT_PROFILE_NAME: &str = "Player";

// Map layout ----------------------------------------------------------------
pub(crate) const WINDING_PADDING: f64 = 100.0;
pub(crate) const WINDING_AMPLITUDE: f64 = 150.0;
pub(crate) const WINDING_HALF_WAVES: f64 = 3.0;
pub(crate) const CIRCULAR_RADIUS_FRACTION: f64 = 1.0 / 3.0;
/// Distance in pixels within which a pointer press selects a node.
pub const NODE_HIT_RADIUS: f64 = 30.0;

// Logging keys --------------------------------------------------------------
pub(crate) const LOG_TARGET_PROGRESS: &str = "adventure::progress";
pub(crate) const LOG_TARGET_CHALLENGE: &str = "adventure::challenge";
pub(crate) const LOG_TARGET_SYNC: &str = "adventure::sync";
