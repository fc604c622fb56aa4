//! Round strategy contract: scoring, termination and leaderboard policy
//!
//! A strategy is pure rules logic. It never sees timers or phases; the match
//! calls its hooks at the right moments and hands it the roster to read or
//! score. Every hook except the state accessors has a default, so a mode only
//! overrides what it changes.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::collaborators::MenuPage;
use super::combatant::{CombatantRegistry, PlayerNumber};

/// Match result shared by all strategies.
///
/// `match_over` only ever goes from false to true, and the winner is fixed
/// at that same moment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyState {
    match_over: bool,
    winner: Option<PlayerNumber>,
}

impl StrategyState {
    pub fn match_over(&self) -> bool {
        self.match_over
    }

    pub fn winner(&self) -> Option<PlayerNumber> {
        self.winner
    }

    /// End the match. Later calls are ignored.
    pub fn finish(&mut self, winner: Option<PlayerNumber>) -> bool {
        if self.match_over {
            return false;
        }
        self.match_over = true;
        self.winner = winner;
        true
    }
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardElement {
    pub player_number: PlayerNumber,
    pub name: String,
    pub color: String,
    pub score: i32,
}

pub trait RoundStrategy: Send {
    fn name(&self) -> &'static str;

    fn state(&self) -> &StrategyState;

    fn state_mut(&mut self) -> &mut StrategyState;

    /// Menu page the players land on when the match is left
    fn return_page(&self) -> MenuPage {
        MenuPage::Home
    }

    fn score_target(&self) -> i32 {
        0
    }

    fn can_start_game(&self) -> bool {
        true
    }

    /// Explicit go-ahead from the player, for modes that wait for one
    fn confirm_start(&mut self) {}

    fn match_over(&self) -> bool {
        self.state().match_over()
    }

    fn has_winner(&self) -> bool {
        self.state().winner().is_some()
    }

    fn winner(&self) -> Option<PlayerNumber> {
        self.state().winner()
    }

    /// Polled every tick while a round is live
    fn is_end_of_round(&self, _roster: &CombatantRegistry) -> bool {
        false
    }

    fn start_round(&mut self, _roster: &mut CombatantRegistry) {}

    fn handle_round_end(&mut self, _roster: &mut CombatantRegistry) {}

    fn match_end(&mut self, _roster: &CombatantRegistry) {}

    fn handle_killer_score(
        &mut self,
        _roster: &mut CombatantRegistry,
        _killer: PlayerNumber,
        _killed: PlayerNumber,
    ) {
    }

    fn handle_suicide(&mut self, _roster: &mut CombatantRegistry, _killer: PlayerNumber) {}

    /// Called after attribution for every death, including environmental
    fn combatant_died(&mut self, _roster: &mut CombatantRegistry, _victim: PlayerNumber) {}

    fn combatant_disconnected(&mut self, _roster: &mut CombatantRegistry, _player: PlayerNumber) {}

    /// Whether the dead come straight back mid-round
    fn respawns_on_death(&self) -> bool {
        false
    }

    fn round_message(&self) -> String {
        String::new()
    }

    fn round_end_text(&self, _roster: &CombatantRegistry) -> String {
        String::new()
    }

    fn leaderboard_elements(&self, roster: &CombatantRegistry) -> Vec<LeaderboardElement> {
        leaderboard_by_score(roster)
    }

    /// Rank for a leaderboard position. Ties are not merged.
    fn rank(&self, index: usize) -> usize {
        index + 1
    }

    fn award_text(&self, rank: usize) -> String {
        format!("You ranked {}{}", rank, ordinal_suffix(rank))
    }

    fn award_amount(&self, rank: usize) -> u32 {
        geometric_award(rank)
    }

    fn bail_destination(&self) -> MenuPage {
        self.return_page()
    }

    fn completion_destination(&self) -> MenuPage {
        self.return_page()
    }
}

/// Every combatant by descending score; equal scores keep roster order.
pub fn leaderboard_by_score(roster: &CombatantRegistry) -> Vec<LeaderboardElement> {
    let mut rows: Vec<(usize, LeaderboardElement)> = roster
        .iter()
        .enumerate()
        .map(|(order, c)| {
            (
                order,
                LeaderboardElement {
                    player_number: c.player_number,
                    name: c.name.clone(),
                    color: c.color.clone(),
                    score: c.score(),
                },
            )
        })
        .collect();

    rows.sort_by_key(|(order, row)| (Reverse(row.score), *order));
    rows.into_iter().map(|(_, row)| row).collect()
}

/// 100 for first place, halved (floored) for each place after
pub fn geometric_award(rank: usize) -> u32 {
    let halvings = rank.saturating_sub(1);
    if halvings >= u32::BITS as usize {
        return 0;
    }
    100u32 >> halvings
}

fn ordinal_suffix(rank: usize) -> &'static str {
    match (rank % 10, rank % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
