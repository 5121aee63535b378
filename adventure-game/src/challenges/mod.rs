//! Built-in challenge modules.
mod math_add;
mod memory;
mod pattern;

pub use math_add::{MathAdd, MathRound};
pub use memory::{MemoryMatch, MemoryRound};
pub use pattern::{PatternMatch, PatternRound};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::challenge::{ChallengeRegistry, ConfigError};

pub(crate) fn rng_for(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}

impl ChallengeRegistry {
    /// Registry holding every built-in module.
    ///
    /// # Errors
    ///
    /// Only fails if two built-ins share an id.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new()
            .with(MathAdd::new())?
            .with(MemoryMatch::new())?
            .with(PatternMatch::new())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::ChallengeId;

    #[test]
    fn defaults_register_all_three_modules() {
        let registry = ChallengeRegistry::with_defaults().unwrap();
        let ids: Vec<&str> = registry.ids().map(ChallengeId::as_str).collect();
        assert_eq!(ids, vec!["math_add", "memory", "pattern"]);
    }
}
