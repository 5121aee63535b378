//! "Memory Match": flip cards two at a time until every pair is found.
use rand::seq::SliceRandom;

use super::rng_for;
use crate::challenge::{
    Answer, CardFace, Challenge, ChallengeError, ChallengeKind, ChallengeMeta, ChallengeOutcome,
    ChallengeRound, ChallengeSetup, OutcomeReporter, Prompt, RoundStatus, Stage,
};
use crate::progress::Difficulty;

const SYMBOLS: [&str; 12] = [
    "🍎", "🍊", "🍋", "🍇", "🍓", "🍒", "🥝", "🍑", "🌟", "🌙", "❤️", "💎",
];
const DEFAULT_PAIRS: usize = 4;

#[derive(Debug, Clone)]
pub struct MemoryMatch {
    meta: ChallengeMeta,
}

impl MemoryMatch {
    pub const ID: &'static str = "memory";

    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: ChallengeMeta::new(Self::ID, "Memory Match", ChallengeKind::Memory),
        }
    }

    #[must_use]
    pub const fn pairs_for(difficulty: Difficulty) -> usize {
        match difficulty.get() {
            1 => 3,
            2 => 4,
            3 => 5,
            4 => 6,
            5 => 8,
            _ => DEFAULT_PAIRS,
        }
    }
}

impl Default for MemoryMatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Challenge for MemoryMatch {
    fn meta(&self) -> &ChallengeMeta {
        &self.meta
    }

    fn start(
        &self,
        stage: &mut dyn Stage,
        setup: ChallengeSetup,
        reporter: OutcomeReporter,
    ) -> Result<(), ChallengeError> {
        let pairs = Self::pairs_for(setup.difficulty);
        let mut cards: Vec<&'static str> = SYMBOLS[..pairs]
            .iter()
            .chain(SYMBOLS[..pairs].iter())
            .copied()
            .collect();
        cards.shuffle(&mut rng_for(setup.seed));
        let round = MemoryRound {
            matched: vec![false; cards.len()],
            cards,
            flipped: Vec::with_capacity(2),
            status: RoundStatus::Pending,
            reporter,
        };
        stage.mount(&self.meta.name, Box::new(round));
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryRound {
    cards: Vec<&'static str>,
    matched: Vec<bool>,
    /// Face-up unmatched cards; a mismatched pair stays up until the next flip.
    flipped: Vec<usize>,
    status: RoundStatus,
    reporter: OutcomeReporter,
}

impl MemoryRound {
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Symbol under a card, for hosts that animate the reveal.
    #[must_use]
    pub fn symbol_at(&self, index: usize) -> Option<&'static str> {
        self.cards.get(index).copied()
    }
}

impl ChallengeRound for MemoryRound {
    fn prompt(&self) -> Prompt {
        let cards = self
            .cards
            .iter()
            .enumerate()
            .map(|(index, symbol)| {
                if self.matched[index] {
                    CardFace::Matched((*symbol).to_string())
                } else if self.flipped.contains(&index) {
                    CardFace::Revealed((*symbol).to_string())
                } else {
                    CardFace::Hidden
                }
            })
            .collect();
        Prompt::Board { cards }
    }

    fn submit(&mut self, answer: Answer) -> RoundStatus {
        if self.status != RoundStatus::Pending {
            return self.status;
        }
        let Answer::Flip(index) = answer else {
            return self.status;
        };
        if index >= self.cards.len() || self.matched[index] || self.flipped.contains(&index) {
            return self.status;
        }
        if self.flipped.len() == 2 {
            self.flipped.clear();
        }
        self.flipped.push(index);
        if let [first, second] = self.flipped[..] {
            if self.cards[first] == self.cards[second] {
                self.matched[first] = true;
                self.matched[second] = true;
                self.flipped.clear();
            }
        }
        if self.matched.iter().all(|done| *done) {
            self.status = RoundStatus::Finished(ChallengeOutcome::Passed);
            self.reporter.report(ChallengeOutcome::Passed);
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::outcome_channel;
    use crate::challenges::testing::HeldStage;

    fn symbols(stage: &mut HeldStage, count: usize) -> Vec<String> {
        // Reveal cards pairwise, reading each face before it turns back.
        let mut seen = Vec::new();
        for index in 0..count {
            stage.submit(Answer::Flip(index));
            let Prompt::Board { cards } = stage.prompt() else {
                panic!("memory prompts a board");
            };
            match &cards[index] {
                CardFace::Revealed(s) | CardFace::Matched(s) => seen.push(s.clone()),
                CardFace::Hidden => panic!("card {index} should be face up"),
            }
        }
        seen
    }

    #[test]
    fn pair_counts_follow_difficulty() {
        let expected = [(1, 3), (2, 4), (3, 5), (4, 6), (5, 8), (6, 4), (40, 4)];
        for (level, pairs) in expected {
            assert_eq!(MemoryMatch::pairs_for(Difficulty::new(level)), pairs);
        }
    }

    #[test]
    fn board_starts_hidden_with_two_of_each_symbol() {
        let (reporter, _receiver) = outcome_channel();
        let mut stage = HeldStage::default();
        let setup = ChallengeSetup {
            difficulty: Difficulty::new(2),
            seed: 11,
        };
        MemoryMatch::new().start(&mut stage, setup, reporter).unwrap();
        let Prompt::Board { cards } = stage.prompt() else {
            panic!("memory prompts a board");
        };
        assert_eq!(cards.len(), 8);
        assert!(cards.iter().all(|c| *c == CardFace::Hidden));
        let mut faces = symbols(&mut stage, 8);
        faces.sort();
        faces.dedup();
        assert_eq!(faces.len(), 4);
    }

    #[test]
    fn matching_every_pair_passes() {
        let (reporter, mut receiver) = outcome_channel();
        let mut stage = HeldStage::default();
        let setup = ChallengeSetup {
            difficulty: Difficulty::MIN,
            seed: 3,
        };
        MemoryMatch::new().start(&mut stage, setup, reporter).unwrap();
        let layout = symbols(&mut stage, 6);
        // The scouting pass above may have matched some pairs by luck.
        let mut status = RoundStatus::Pending;
        for (i, a) in layout.iter().enumerate() {
            for (j, b) in layout.iter().enumerate().skip(i + 1) {
                if a == b {
                    stage.submit(Answer::Flip(i));
                    status = stage.submit(Answer::Flip(j));
                }
            }
        }
        assert_eq!(status, RoundStatus::Finished(ChallengeOutcome::Passed));
        assert_eq!(receiver.try_outcome(), Ok(Some(ChallengeOutcome::Passed)));
    }

    #[test]
    fn mismatch_turns_back_on_next_flip() {
        let (reporter, mut receiver) = outcome_channel();
        let mut round = MemoryRound {
            cards: vec!["🍎", "🍊", "🍎", "🍊"],
            matched: vec![false; 4],
            flipped: Vec::new(),
            status: RoundStatus::Pending,
            reporter,
        };
        round.submit(Answer::Flip(0));
        round.submit(Answer::Flip(1));
        let Prompt::Board { cards } = round.prompt() else {
            unreachable!()
        };
        assert_eq!(cards[0], CardFace::Revealed("🍎".into()));
        assert_eq!(cards[1], CardFace::Revealed("🍊".into()));

        round.submit(Answer::Flip(2));
        let Prompt::Board { cards } = round.prompt() else {
            unreachable!()
        };
        assert_eq!(cards[0], CardFace::Hidden);
        assert_eq!(cards[1], CardFace::Hidden);
        assert_eq!(cards[2], CardFace::Revealed("🍎".into()));

        assert_eq!(round.submit(Answer::Flip(0)), RoundStatus::Pending);
        assert_eq!(round.symbol_at(0), Some("🍎"));
        round.submit(Answer::Flip(1));
        assert_eq!(
            round.submit(Answer::Flip(3)),
            RoundStatus::Finished(ChallengeOutcome::Passed)
        );
        assert_eq!(receiver.try_outcome(), Ok(Some(ChallengeOutcome::Passed)));
    }

    #[test]
    fn picks_are_ignored() {
        let (reporter, _receiver) = outcome_channel();
        let mut stage = HeldStage::default();
        let setup = ChallengeSetup {
            difficulty: Difficulty::MIN,
            seed: 1,
        };
        MemoryMatch::new().start(&mut stage, setup, reporter).unwrap();
        assert_eq!(stage.submit(Answer::Pick(0)), RoundStatus::Pending);
        assert_eq!(stage.submit(Answer::Flip(99)), RoundStatus::Pending);
    }
}
