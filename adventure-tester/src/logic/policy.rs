use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Policy interface for scripted players.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Whether the player clears the challenge at `node`. `attempt` counts
    /// attempts at this node, starting from 1.
    fn attempt(&mut self, node: u32, attempt: u32) -> bool;
}

/// Built-in player behaviours for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    AlwaysPass,
    AlwaysFail,
    CoinFlip,
    Streaky,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [
        Self::AlwaysPass,
        Self::AlwaysFail,
        Self::CoinFlip,
        Self::Streaky,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AlwaysPass => "always-pass",
            Self::AlwaysFail => "always-fail",
            Self::CoinFlip => "coin-flip",
            Self::Streaky => "streaky",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::AlwaysPass => Box::new(AlwaysPass),
            Self::AlwaysFail => Box::new(AlwaysFail),
            Self::CoinFlip => Box::new(CoinFlip {
                rng: ChaCha20Rng::seed_from_u64(seed),
            }),
            Self::Streaky => Box::new(Streaky::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct AlwaysPass;
struct AlwaysFail;

struct CoinFlip {
    rng: ChaCha20Rng,
}

/// Alternates runs of passes and failures with random run lengths.
struct Streaky {
    rng: ChaCha20Rng,
    passing: bool,
    remaining: u32,
}

impl Streaky {
    const MAX_RUN: u32 = 4;

    fn new(seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let remaining = rng.gen_range(1..=Self::MAX_RUN);
        Self {
            rng,
            passing: true,
            remaining,
        }
    }
}

impl PlayerPolicy for AlwaysPass {
    fn name(&self) -> &'static str {
        "always-pass"
    }

    fn attempt(&mut self, _node: u32, _attempt: u32) -> bool {
        true
    }
}

impl PlayerPolicy for AlwaysFail {
    fn name(&self) -> &'static str {
        "always-fail"
    }

    fn attempt(&mut self, _node: u32, _attempt: u32) -> bool {
        false
    }
}

impl PlayerPolicy for CoinFlip {
    fn name(&self) -> &'static str {
        "coin-flip"
    }

    fn attempt(&mut self, _node: u32, _attempt: u32) -> bool {
        self.rng.gen_bool(0.5)
    }
}

impl PlayerPolicy for Streaky {
    fn name(&self) -> &'static str {
        "streaky"
    }

    fn attempt(&mut self, _node: u32, _attempt: u32) -> bool {
        if self.remaining == 0 {
            self.passing = !self.passing;
            self.remaining = self.rng.gen_range(1..=Self::MAX_RUN);
        }
        self.remaining -= 1;
        self.passing
    }
}
