//! "Number Cruncher": pick the sum of two numbers.
use rand::Rng;
use rand::seq::SliceRandom;

use super::rng_for;
use crate::challenge::{
    Answer, Challenge, ChallengeError, ChallengeKind, ChallengeMeta, ChallengeOutcome,
    ChallengeRound, ChallengeSetup, OutcomeReporter, Prompt, RoundStatus, Stage,
};
use crate::constants::MAX_MATH_DIFFICULTY;
use crate::progress::Difficulty;

#[derive(Debug, Clone)]
pub struct MathAdd {
    meta: ChallengeMeta,
}

impl MathAdd {
    pub const ID: &'static str = "math_add";

    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: ChallengeMeta::new(Self::ID, "Number Cruncher", ChallengeKind::Math),
        }
    }

    /// Largest addend for a difficulty, capped at [`MAX_MATH_DIFFICULTY`].
    #[must_use]
    pub const fn max_addend(difficulty: Difficulty) -> u32 {
        let level = if difficulty.get() > MAX_MATH_DIFFICULTY {
            MAX_MATH_DIFFICULTY
        } else {
            difficulty.get()
        };
        level * 4 + 1
    }
}

impl Default for MathAdd {
    fn default() -> Self {
        Self::new()
    }
}

impl Challenge for MathAdd {
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
        let max = Self::max_addend(setup.difficulty);
        let left = rng.gen_range(1..=max);
        let right = rng.gen_range(1..=max);
        let answer = left + right;
        let mut options = vec![answer, answer + 1, answer - 1];
        options.shuffle(&mut rng);
        let round = MathRound {
            left,
            right,
            options,
            answer,
            status: RoundStatus::Pending,
            reporter,
        };
        stage.mount(&self.meta.name, Box::new(round));
        Ok(())
    }
}

#[derive(Debug)]
pub struct MathRound {
    left: u32,
    right: u32,
    options: Vec<u32>,
    answer: u32,
    status: RoundStatus,
    reporter: OutcomeReporter,
}

impl MathRound {
    #[must_use]
    pub fn answer_index(&self) -> Option<usize> {
        self.options.iter().position(|option| *option == self.answer)
    }
}

impl ChallengeRound for MathRound {
    fn prompt(&self) -> Prompt {
        Prompt::Choice {
            question: format!("{} + {} = ?", self.left, self.right),
            options: self.options.iter().map(ToString::to_string).collect(),
        }
    }

    fn submit(&mut self, answer: Answer) -> RoundStatus {
        if self.status != RoundStatus::Pending {
            return self.status;
        }
        let Answer::Pick(index) = answer else {
            return self.status;
        };
        let Some(picked) = self.options.get(index) else {
            return self.status;
        };
        let outcome = ChallengeOutcome::from(*picked == self.answer);
        self.status = RoundStatus::Finished(outcome);
        self.reporter.report(outcome);
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::outcome_channel;
    use crate::challenges::testing::HeldStage;

    fn options_of(stage: &HeldStage) -> (String, Vec<u32>) {
        match stage.prompt() {
            Prompt::Choice { question, options } => (
                question,
                options.iter().map(|o| o.parse().unwrap()).collect(),
            ),
            other => panic!("unexpected prompt {other:?}"),
        }
    }

    fn start(difficulty: u32, seed: u64) -> (HeldStage, crate::challenge::OutcomeReceiver) {
        let (reporter, receiver) = outcome_channel();
        let mut stage = HeldStage::default();
        let setup = ChallengeSetup {
            difficulty: Difficulty::new(difficulty),
            seed,
        };
        MathAdd::new().start(&mut stage, setup, reporter).unwrap();
        (stage, receiver)
    }

    #[test]
    fn addends_respect_difficulty_range() {
        for seed in 0..64 {
            let (stage, _) = start(2, seed);
            let (question, options) = options_of(&stage);
            let parts: Vec<u32> = question
                .trim_end_matches(" = ?")
                .split(" + ")
                .map(|p| p.parse().unwrap())
                .collect();
            assert!(parts.iter().all(|p| (1..=9).contains(p)));
            let sum = parts[0] + parts[1];
            let mut sorted = options.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![sum - 1, sum, sum + 1]);
        }
    }

    #[test]
    fn huge_difficulty_is_capped() {
        assert_eq!(MathAdd::max_addend(Difficulty::new(u32::MAX)), 101);
        assert_eq!(
            MathAdd::max_addend(Difficulty::new(MAX_MATH_DIFFICULTY)),
            MathAdd::max_addend(Difficulty::new(MAX_MATH_DIFFICULTY + 1))
        );
        for seed in 0..16 {
            let (stage, _) = start(u32::MAX, seed);
            let (question, options) = options_of(&stage);
            assert!(question.ends_with(" = ?"));
            assert!(options.iter().all(|o| *o <= 203));
        }
    }

    #[test]
    fn same_seed_same_question() {
        let (a, _) = start(3, 99);
        let (b, _) = start(3, 99);
        assert_eq!(a.prompt(), b.prompt());
    }

    #[test]
    fn correct_pick_passes_once() {
        let (mut stage, mut receiver) = start(1, 5);
        let (question, options) = options_of(&stage);
        let sum: u32 = question
            .trim_end_matches(" = ?")
            .split(" + ")
            .map(|p| p.parse::<u32>().unwrap())
            .sum();
        let index = options.iter().position(|o| *o == sum).unwrap();
        assert_eq!(
            stage.submit(Answer::Pick(index)),
            RoundStatus::Finished(ChallengeOutcome::Passed)
        );
        let wrong = (index + 1) % 3;
        assert_eq!(
            stage.submit(Answer::Pick(wrong)),
            RoundStatus::Finished(ChallengeOutcome::Passed)
        );
        assert_eq!(receiver.try_outcome(), Ok(Some(ChallengeOutcome::Passed)));
    }

    #[test]
    fn wrong_pick_fails_and_bad_input_is_ignored() {
        let (mut stage, receiver) = start(1, 8);
        assert_eq!(stage.submit(Answer::Pick(17)), RoundStatus::Pending);
        assert_eq!(stage.submit(Answer::Flip(0)), RoundStatus::Pending);
        let (question, options) = options_of(&stage);
        let sum: u32 = question
            .trim_end_matches(" = ?")
            .split(" + ")
            .map(|p| p.parse::<u32>().unwrap())
            .sum();
        let index = options.iter().position(|o| *o != sum).unwrap();
        stage.submit(Answer::Pick(index));
        let outcome = futures::executor::block_on(receiver.outcome());
        assert_eq!(outcome, Ok(ChallengeOutcome::Failed));
    }
}
