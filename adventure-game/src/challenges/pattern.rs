//! "Pattern Match": name the symbol that continues a repeating sequence.
use rand::seq::SliceRandom;

use super::rng_for;
use crate::challenge::{
    Answer, Challenge, ChallengeError, ChallengeKind, ChallengeMeta, ChallengeOutcome,
    ChallengeRound, ChallengeSetup, OutcomeReporter, Prompt, RoundStatus, Stage,
};
use crate::progress::Difficulty;

const SYMBOLS: [&str; 6] = ["🔴", "🔵", "🟢", "🟡", "🟣", "🟠"];
const MIN_CHOICES: usize = 3;

/// A repeating unit, written as indexes into the round's symbol palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternShape {
    pub name: &'static str,
    pub unit: &'static [usize],
    /// Total length including the hidden final symbol.
    pub length: usize,
}

impl PatternShape {
    #[must_use]
    pub const fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty.get() {
            1 => Self {
                name: "AB",
                unit: &[0, 1],
                length: 4,
            },
            2 => Self {
                name: "ABC",
                unit: &[0, 1, 2],
                length: 6,
            },
            3 => Self {
                name: "AABB",
                unit: &[0, 0, 1, 1],
                length: 6,
            },
            4 => Self {
                name: "ABBA",
                unit: &[0, 1, 1, 0],
                length: 6,
            },
            _ => Self {
                name: "ABAC",
                unit: &[0, 1, 0, 2],
                length: 6,
            },
        }
    }

    /// Palette index at position `i` of the repeated unit.
    #[must_use]
    pub const fn at(&self, i: usize) -> usize {
        self.unit[i % self.unit.len()]
    }

    /// Palette index the player must pick.
    #[must_use]
    pub const fn answer(&self) -> usize {
        self.at(self.length - 1)
    }
}

#[derive(Debug, Clone)]
pub struct PatternMatch {
    meta: ChallengeMeta,
}

impl PatternMatch {
    pub const ID: &'static str = "pattern";

    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: ChallengeMeta::new(Self::ID, "Pattern Match", ChallengeKind::Logic),
        }
    }
}

impl Default for PatternMatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Challenge for PatternMatch {
    fn meta(&self) -> &ChallengeMeta {
        &self.meta
    }

    fn start(
        &self,
        stage: &mut dyn Stage,
        setup: ChallengeSetup,
        reporter: OutcomeReporter,
    ) -> Result<(), ChallengeError> {
        let mut rng = rng_for(setup.seed);
        let shape = PatternShape::for_difficulty(setup.difficulty);
        let mut palette = SYMBOLS;
        palette.shuffle(&mut rng);

        let shown = (0..shape.length - 1)
            .map(|i| palette[shape.at(i)])
            .collect();
        let answer = palette[shape.answer()];

        let mut choices: Vec<&'static str> = Vec::with_capacity(MIN_CHOICES);
        for &slot in shape.unit {
            if !choices.contains(&palette[slot]) {
                choices.push(palette[slot]);
            }
        }
        for symbol in palette {
            if choices.len() >= MIN_CHOICES {
                break;
            }
            if !choices.contains(&symbol) {
                choices.push(symbol);
            }
        }
        choices.shuffle(&mut rng);

        let round = PatternRound {
            shown,
            choices,
            answer,
            status: RoundStatus::Pending,
            reporter,
        };
        stage.mount(&self.meta.name, Box::new(round));
        Ok(())
    }
}

#[derive(Debug)]
pub struct PatternRound {
    shown: Vec<&'static str>,
    choices: Vec<&'static str>,
    answer: &'static str,
    status: RoundStatus,
    reporter: OutcomeReporter,
}

impl ChallengeRound for PatternRound {
    fn prompt(&self) -> Prompt {
        Prompt::Sequence {
            question: "What comes next?".to_string(),
            shown: self.shown.iter().map(ToString::to_string).collect(),
            options: self.choices.iter().map(ToString::to_string).collect(),
        }
    }

    fn submit(&mut self, answer: Answer) -> RoundStatus {
        if self.status != RoundStatus::Pending {
            return self.status;
        }
        let Answer::Pick(index) = answer else {
            return self.status;
        };
        let Some(picked) = self.choices.get(index) else {
            return self.status;
        };
        let outcome = ChallengeOutcome::from(*picked == self.answer);
        self.status = RoundStatus::Finished(outcome);
        self.reporter.report(outcome);
        self.status
    }
}
