//! Progression rules: the authoritative state machine for one session.
//!
//! Every mutation of a [`Session`] goes through [`apply_clear`] or
//! [`apply_mercy`]. [`reduce`] folds challenge results into a [`PlayState`]
//! for callers that also track the per-node failure counter locally, and
//! [`apply_report`] is the server-side entry point for results sent over the
//! wire.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{LOG_TARGET_PROGRESS, MERCY_THRESHOLD, MIN_DIFFICULTY, STAR_AWARD};
use crate::protocol::ResultReport;
use crate::session::{NodeRecord, NodeResult, Progress, Session};

/// Challenge difficulty, never below [`MIN_DIFFICULTY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u32);

impl Difficulty {
    pub const MIN: Self = Self(MIN_DIFFICULTY);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value < MIN_DIFFICULTY {
            Self::MIN
        } else {
            Self(value)
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `max(1, level - (mercy ? 1 : 0))`, with the level itself clamped to 1.
#[must_use]
pub const fn effective_difficulty(level: u32, mercy_mode: bool) -> Difficulty {
    let level = if level < MIN_DIFFICULTY {
        MIN_DIFFICULTY
    } else {
        level
    };
    let relief = if mercy_mode { 1 } else { 0 };
    Difficulty::new(level.saturating_sub(relief))
}

/// Difficulty the session's next attempt will run at.
#[must_use]
pub const fn next_difficulty(session: &Session) -> Difficulty {
    effective_difficulty(session.current_level, session.mercy_mode)
}

/// Consecutive failures at the current node. Always below
/// [`MERCY_THRESHOLD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FailureCount(u8);

impl FailureCount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Count one more failure.
    #[must_use]
    pub const fn record(self) -> FailureStep {
        let next = self.0 + 1;
        if next >= MERCY_THRESHOLD {
            FailureStep::Mercy
        } else {
            FailureStep::Retry(Self(next))
        }
    }
}

/// What a recorded failure leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStep {
    /// Stay on the node with the updated count.
    Retry(FailureCount),
    /// Threshold reached: advance without reward; the count resets.
    Mercy,
}

/// Result of applying one event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Node cleared; `stars` were awarded.
    Cleared { node: u32, stars: u32, victory: bool },
    /// Forced advance without reward; mercy mode is now on.
    Mercy { node: u32, victory: bool },
    /// Failure below the mercy threshold; same node, same difficulty.
    Retry { failures: u8 },
    /// A failure report without mercy reached the server; nothing to apply.
    Unchanged,
    /// The session is already victorious; nothing was applied.
    Finished,
}

impl Transition {
    /// Whether the session moved to the next node.
    #[must_use]
    pub const fn advanced(self) -> bool {
        matches!(self, Self::Cleared { .. } | Self::Mercy { .. })
    }

    #[must_use]
    pub const fn reached_victory(self) -> bool {
        matches!(
            self,
            Self::Cleared { victory: true, .. } | Self::Mercy { victory: true, .. }
        )
    }
}

/// Award stars and move past the current node.
pub fn apply_clear(session: &mut Session) -> Transition {
    let Progress::InProgress { node } = session.progress() else {
        return Transition::Finished;
    };
    session.total_stars = session.total_stars.saturating_add(STAR_AWARD);
    session.current_node = node + 1;
    session.mercy_mode = false;
    session.node_history.push(NodeRecord {
        node,
        result: NodeResult::Cleared,
        stars: STAR_AWARD,
    });
    let victory = session.is_finished();
    log::debug!(
        target: LOG_TARGET_PROGRESS,
        "session {} cleared node {node} (stars {}, victory {victory})",
        session.session_id,
        session.total_stars
    );
    Transition::Cleared {
        node,
        stars: STAR_AWARD,
        victory,
    }
}

/// Move past the current node without reward and switch mercy mode on.
pub fn apply_mercy(session: &mut Session) -> Transition {
    let Progress::InProgress { node } = session.progress() else {
        return Transition::Finished;
    };
    session.current_node = node + 1;
    session.mercy_mode = true;
    session.node_history.push(NodeRecord {
        node,
        result: NodeResult::Mercy,
        stars: 0,
    });
    let victory = session.is_finished();
    log::debug!(
        target: LOG_TARGET_PROGRESS,
        "session {} granted mercy at node {node} (victory {victory})",
        session.session_id
    );
    Transition::Mercy { node, victory }
}

/// Apply a wire-reported result. Only the fixed award is ever granted; the
/// client's star count is ignored.
pub fn apply_report(session: &mut Session, report: &ResultReport) -> Transition {
    if report.success {
        if report.stars != STAR_AWARD {
            log::debug!(
                target: LOG_TARGET_PROGRESS,
                "session {} reported {} stars; awarding {STAR_AWARD}",
                session.session_id,
                report.stars
            );
        }
        apply_clear(session)
    } else if report.used_mercy {
        apply_mercy(session)
    } else if session.is_finished() {
        Transition::Finished
    } else {
        Transition::Unchanged
    }
}

/// Outcome of one challenge attempt, as fed to [`reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Succeeded,
    Failed,
}

impl From<bool> for ProgressEvent {
    fn from(success: bool) -> Self {
        if success {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }
}

/// Session plus the locally held failure counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayState {
    pub session: Session,
    pub failures: FailureCount,
}

impl PlayState {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            session,
            failures: FailureCount::ZERO,
        }
    }

    #[must_use]
    pub const fn next_difficulty(&self) -> Difficulty {
        next_difficulty(&self.session)
    }
}

/// Pure transition function `(state, event) -> (state, transition)`.
#[must_use]
pub fn reduce(mut state: PlayState, event: ProgressEvent) -> (PlayState, Transition) {
    if state.session.is_finished() {
        return (state, Transition::Finished);
    }
    let transition = match event {
        ProgressEvent::Succeeded => {
            state.failures = FailureCount::ZERO;
            apply_clear(&mut state.session)
        }
        ProgressEvent::Failed => match state.failures.record() {
            FailureStep::Retry(failures) => {
                state.failures = failures;
                Transition::Retry {
                    failures: failures.get(),
                }
            }
            FailureStep::Mercy => {
                state.failures = FailureCount::ZERO;
                apply_mercy(&mut state.session)
            }
        },
    };
    (state, transition)
}

/// Describe how `after` differs from `before`, as far as the session record
/// shows it. Used when the server's answer is the only source of truth.
#[must_use]
pub fn observed_transition(before: &Session, after: &Session) -> Transition {
    if before.is_finished() {
        return Transition::Finished;
    }
    if after.current_node <= before.current_node {
        return Transition::Unchanged;
    }
    let victory = after.is_finished();
    match after.node_history.last() {
        Some(record) if record.result == NodeResult::Cleared => Transition::Cleared {
            node: record.node,
            stars: record.stars,
            victory,
        },
        Some(record) => Transition::Mercy {
            node: record.node,
            victory,
        },
        None if after.mercy_mode => Transition::Mercy {
            node: before.current_node,
            victory,
        },
        None => Transition::Cleared {
            node: before.current_node,
            stars: after.total_stars.saturating_sub(before.total_stars),
            victory,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NODE_COUNT;
    use crate::session::{NewSession, SessionId};

    fn state_at(node: u32) -> PlayState {
        let mut session = Session::new(SessionId::new("s"), NewSession::default());
        session.current_node = node;
        PlayState::new(session)
    }

    fn run(state: PlayState, events: &[ProgressEvent]) -> PlayState {
        events
            .iter()
            .fold(state, |state, event| reduce(state, *event).0)
    }

    #[test]
    fn difficulty_never_drops_below_one() {
        assert_eq!(effective_difficulty(1, true).get(), 1);
        assert_eq!(effective_difficulty(1, false).get(), 1);
        assert_eq!(effective_difficulty(0, false).get(), 1);
        assert_eq!(effective_difficulty(0, true).get(), 1);
        for level in 1..50 {
            assert_eq!(effective_difficulty(level, false).get(), level);
            assert_eq!(effective_difficulty(level, true).get(), (level - 1).max(1));
        }
        assert_eq!(Difficulty::new(0), Difficulty::MIN);
    }

    #[test]
    fn success_advances_awards_and_clears_mercy() {
        let mut state = state_at(4);
        state.session.mercy_mode = true;
        state.session.total_stars = 9;
        let (next, transition) = reduce(state, ProgressEvent::Succeeded);
        assert_eq!(next.session.current_node, 5);
        assert_eq!(next.session.total_stars, 12);
        assert!(!next.session.mercy_mode);
        assert_eq!(next.failures, FailureCount::ZERO);
        assert_eq!(
            transition,
            Transition::Cleared {
                node: 4,
                stars: 3,
                victory: false
            }
        );
    }

    #[test]
    fn success_on_last_node_is_victory_and_terminal() {
        let (next, transition) = reduce(state_at(NODE_COUNT - 1), ProgressEvent::Succeeded);
        assert!(transition.reached_victory());
        assert_eq!(next.session.current_node, NODE_COUNT);
        let stars = next.session.total_stars;
        let (after, again) = reduce(next.clone(), ProgressEvent::Succeeded);
        assert_eq!(again, Transition::Finished);
        assert_eq!(after, next);
        let (after_fail, failed) = reduce(next.clone(), ProgressEvent::Failed);
        assert_eq!(failed, Transition::Finished);
        assert_eq!(after_fail.session.total_stars, stars);
        assert_eq!(after_fail.failures, FailureCount::ZERO);
    }

    #[test]
    fn third_failure_triggers_mercy_and_resets_counter() {
        let state = state_at(1);
        let (state, first) = reduce(state, ProgressEvent::Failed);
        assert_eq!(first, Transition::Retry { failures: 1 });
        let (state, second) = reduce(state, ProgressEvent::Failed);
        assert_eq!(second, Transition::Retry { failures: 2 });
        assert_eq!(state.session.current_node, 1);
        let (state, third) = reduce(state, ProgressEvent::Failed);
        assert_eq!(
            third,
            Transition::Mercy {
                node: 1,
                victory: false
            }
        );
        assert_eq!(state.session.current_node, 2);
        assert!(state.session.mercy_mode);
        assert_eq!(state.session.total_stars, 0);
        assert_eq!(state.failures, FailureCount::ZERO);

        let (state, fourth) = reduce(state, ProgressEvent::Failed);
        assert_eq!(fourth, Transition::Retry { failures: 1 });
        assert_eq!(state.session.current_node, 2);
    }

    #[test]
    fn mercy_on_last_node_still_wins() {
        let state = run(state_at(NODE_COUNT - 1), &[ProgressEvent::Failed; 2]);
        let (state, transition) = reduce(state, ProgressEvent::Failed);
        assert_eq!(
            transition,
            Transition::Mercy {
                node: NODE_COUNT - 1,
                victory: true
            }
        );
        assert!(state.session.is_finished());
    }

    #[test]
    fn mercy_lowers_only_the_next_difficulty() {
        let mut state = state_at(0);
        state.session.current_level = 3;
        assert_eq!(state.next_difficulty().get(), 3);
        let state = run(state, &[ProgressEvent::Failed; 3]);
        assert_eq!(state.next_difficulty().get(), 2);
        let (state, _) = reduce(state, ProgressEvent::Succeeded);
        assert_eq!(state.next_difficulty().get(), 3);
        assert_eq!(state.session.current_level, 3);
    }

    #[test]
    fn history_records_every_advance() {
        use ProgressEvent::{Failed, Succeeded};
        let state = run(state_at(0), &[Succeeded, Failed, Failed, Failed, Succeeded]);
        let results: Vec<_> = state
            .session
            .node_history
            .iter()
            .map(|r| (r.node, r.result, r.stars))
            .collect();
        assert_eq!(
            results,
            vec![
                (0, NodeResult::Cleared, 3),
                (1, NodeResult::Mercy, 0),
                (2, NodeResult::Cleared, 3)
            ]
        );
        assert!(state.session.validate().is_ok());
    }

    #[test]
    fn report_ignores_client_star_claims() {
        let mut session = state_at(0).session;
        let transition = apply_report(
            &mut session,
            &ResultReport {
                success: true,
                stars: 500,
                used_mercy: false,
            },
        );
        assert!(transition.advanced());
        assert_eq!(session.total_stars, STAR_AWARD);
    }

    #[test]
    fn report_without_success_or_mercy_changes_nothing() {
        let mut session = state_at(3).session;
        let before = session.clone();
        let transition = apply_report(&mut session, &ResultReport::failure());
        assert_eq!(transition, Transition::Unchanged);
        assert_eq!(session, before);
    }

    #[test]
    fn mercy_report_advances_without_stars() {
        let mut session = state_at(3).session;
        let transition = apply_report(&mut session, &ResultReport::mercy());
        assert_eq!(
            transition,
            Transition::Mercy {
                node: 3,
                victory: false
            }
        );
        assert_eq!(session.total_stars, 0);
        assert!(session.mercy_mode);
    }

    #[test]
    fn reports_against_finished_sessions_are_ignored() {
        let mut session = state_at(NODE_COUNT).session;
        assert_eq!(
            apply_report(&mut session, &ResultReport::success()),
            Transition::Finished
        );
        assert_eq!(
            apply_report(&mut session, &ResultReport::mercy()),
            Transition::Finished
        );
        assert_eq!(
            apply_report(&mut session, &ResultReport::failure()),
            Transition::Finished
        );
        assert_eq!(session.current_node, NODE_COUNT);
        assert_eq!(session.total_stars, 0);
    }

    #[test]
    fn observed_transition_reads_the_new_history_entry() {
        let before = state_at(2).session;
        let mut cleared = before.clone();
        apply_clear(&mut cleared);
        assert_eq!(
            observed_transition(&before, &cleared),
            Transition::Cleared {
                node: 2,
                stars: STAR_AWARD,
                victory: false
            }
        );

        let mut mercy = before.clone();
        apply_mercy(&mut mercy);
        assert_eq!(
            observed_transition(&before, &mercy),
            Transition::Mercy {
                node: 2,
                victory: false
            }
        );
        assert_eq!(observed_transition(&before, &before), Transition::Unchanged);

        let last = state_at(NODE_COUNT - 1).session;
        let mut won = last.clone();
        apply_clear(&mut won);
        assert!(observed_transition(&last, &won).reached_victory());
        assert_eq!(observed_transition(&won, &won), Transition::Finished);
    }
}
