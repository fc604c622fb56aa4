//! Match phases and the timed-transition wait state

use serde::{Deserialize, Serialize};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Nothing to do until an external continuation moves the match on
    Inactive,
    /// Counting down towards a scheduled phase
    TimedTransition,
    /// Scene just came up
    StartUp,
    /// Round setup, combatants frozen
    PrePlay,
    /// Round in progress
    Playing,
    /// Round finished, strategy deciding what comes next
    RoundEnd,
    /// Match decided, tearing down gameplay
    EndGame,
    /// Terminal
    PostGame,
}

/// Current phase together with the countdown data of a timed transition.
///
/// The countdown only exists inside `Timed`, so a non-transition phase can't
/// carry a stale remaining time and entering a transition always sets the
/// target and the duration together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseState {
    Steady(MatchPhase),
    Timed { next: MatchPhase, remaining: f32 },
}

impl PhaseState {
    pub fn phase(&self) -> MatchPhase {
        match self {
            PhaseState::Steady(phase) => *phase,
            PhaseState::Timed { .. } => MatchPhase::TimedTransition,
        }
    }

    /// Target and remaining seconds while in a timed transition
    pub fn pending(&self) -> Option<(MatchPhase, f32)> {
        match self {
            PhaseState::Timed { next, remaining } => Some((*next, *remaining)),
            PhaseState::Steady(_) => None,
        }
    }

    /// Advance a timed transition by `dt` seconds.
    ///
    /// Returns the target phase once the countdown has run out; the caller
    /// switches to it. Steady phases are untouched.
    pub fn count_down(&mut self, dt: f32) -> Option<MatchPhase> {
        match self {
            PhaseState::Timed { next, remaining } => {
                *remaining -= dt.max(0.0);
                if *remaining <= 0.0 {
                    Some(*next)
                } else {
                    None
                }
            }
            PhaseState::Steady(_) => None,
        }
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        PhaseState::Steady(MatchPhase::Inactive)
    }
}
