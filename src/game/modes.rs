//! Concrete round strategies and mode selection

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::MatchError;

use super::collaborators::MenuPage;
use super::combatant::{CombatantRegistry, PlayerNumber};
use super::strategy::{RoundStrategy, StrategyState};

/// Game modes selectable at match setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Free-for-all; first to the kill target wins
    Deathmatch,
    /// Round-based; the last one alive takes the round
    LastTankStanding,
    /// Single-player objective run
    Mission,
}

impl GameMode {
    pub fn default_score_target(self) -> i32 {
        match self {
            GameMode::Deathmatch => 5,
            GameMode::LastTankStanding => 3,
            GameMode::Mission => 3,
        }
    }

    /// Build the strategy for this mode. A target of zero or less picks the
    /// mode default.
    pub fn build_strategy(
        self,
        score_target: i32,
        local_player: Option<PlayerNumber>,
    ) -> Box<dyn RoundStrategy> {
        let target = if score_target > 0 {
            score_target
        } else {
            self.default_score_target()
        };

        match self {
            GameMode::Deathmatch => Box::new(Deathmatch::new(target)),
            GameMode::LastTankStanding => Box::new(LastTankStanding::new(target)),
            GameMode::Mission => Box::new(Mission::new(target, local_player)),
        }
    }
}

impl FromStr for GameMode {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deathmatch" | "dm" => Ok(GameMode::Deathmatch),
            "last_tank_standing" | "lts" => Ok(GameMode::LastTankStanding),
            "mission" | "single_player" => Ok(GameMode::Mission),
            other => Err(MatchError::UnknownMode(other.to_string())),
        }
    }
}

/// Free-for-all: +1 per kill, -1 per suicide, the dead respawn at once
#[derive(Debug)]
pub struct Deathmatch {
    state: StrategyState,
    target: i32,
}

impl Deathmatch {
    pub fn new(target: i32) -> Self {
        Self {
            state: StrategyState::default(),
            target,
        }
    }

    fn check_target(&mut self, roster: &CombatantRegistry, player: PlayerNumber) {
        let reached = roster
            .get(player)
            .map(|c| c.score() >= self.target)
            .unwrap_or(false);
        if reached && self.state.finish(Some(player)) {
            info!(winner = player, target = self.target, "Score target reached");
        }
    }
}

impl RoundStrategy for Deathmatch {
    fn name(&self) -> &'static str {
        "deathmatch"
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn return_page(&self) -> MenuPage {
        MenuPage::Lobby
    }

    fn score_target(&self) -> i32 {
        self.target
    }

    fn is_end_of_round(&self, roster: &CombatantRegistry) -> bool {
        self.state.match_over() || roster.is_empty()
    }

    fn handle_killer_score(
        &mut self,
        roster: &mut CombatantRegistry,
        killer: PlayerNumber,
        _killed: PlayerNumber,
    ) {
        if self.state.match_over() {
            return;
        }
        if let Some(c) = roster.get_mut(killer) {
            c.add_score(1);
        }
        self.check_target(roster, killer);
    }

    fn handle_suicide(&mut self, roster: &mut CombatantRegistry, killer: PlayerNumber) {
        if self.state.match_over() {
            return;
        }
        if let Some(c) = roster.get_mut(killer) {
            c.add_score(-1);
        }
    }

    fn respawns_on_death(&self) -> bool {
        true
    }

    fn round_message(&self) -> String {
        format!("First to {} kills", self.target)
    }

    fn round_end_text(&self, roster: &CombatantRegistry) -> String {
        match self.state.winner().and_then(|n| roster.get(n)) {
            Some(winner) => format!("{} wins the match!", winner.name),
            None => "Match over".to_string(),
        }
    }
}

/// Round-based elimination: the sole survivor of a round gets a point
#[derive(Debug)]
pub struct LastTankStanding {
    state: StrategyState,
    target: i32,
    last_round_winner: Option<PlayerNumber>,
}

impl LastTankStanding {
    pub fn new(target: i32) -> Self {
        Self {
            state: StrategyState::default(),
            target,
            last_round_winner: None,
        }
    }
}

impl RoundStrategy for LastTankStanding {
    fn name(&self) -> &'static str {
        "last_tank_standing"
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn return_page(&self) -> MenuPage {
        MenuPage::Lobby
    }

    fn score_target(&self) -> i32 {
        self.target
    }

    fn start_round(&mut self, _roster: &mut CombatantRegistry) {
        self.last_round_winner = None;
    }

    fn is_end_of_round(&self, roster: &CombatantRegistry) -> bool {
        roster.alive_count() <= 1
    }

    fn handle_round_end(&mut self, roster: &mut CombatantRegistry) {
        let survivors: Vec<PlayerNumber> = roster.alive().map(|c| c.player_number).collect();
        let survivor = match survivors.as_slice() {
            [only] => *only,
            _ => return,
        };

        self.last_round_winner = Some(survivor);
        let rounds_won = match roster.get_mut(survivor) {
            Some(c) => {
                c.add_score(1);
                c.score()
            }
            None => return,
        };

        info!(player = survivor, rounds_won, "Round won");
        if rounds_won >= self.target {
            self.state.finish(Some(survivor));
        }
    }

    fn round_message(&self) -> String {
        format!("Win {} rounds", self.target)
    }

    fn round_end_text(&self, roster: &CombatantRegistry) -> String {
        if let Some(winner) = self.state.winner().and_then(|n| roster.get(n)) {
            return format!("{} wins the match!", winner.name);
        }
        match self.last_round_winner.and_then(|n| roster.get(n)) {
            Some(c) => format!("{} wins the round", c.name),
            None => "Draw".to_string(),
        }
    }
}

/// Single-player mission: destroy enough opponents before being destroyed.
/// Nothing starts until the player confirms the briefing.
#[derive(Debug)]
pub struct Mission {
    state: StrategyState,
    target: i32,
    player: Option<PlayerNumber>,
    confirmed: bool,
}

impl Mission {
    pub fn new(target: i32, player: Option<PlayerNumber>) -> Self {
        Self {
            state: StrategyState::default(),
            target,
            player,
            confirmed: false,
        }
    }

    pub fn player(&self) -> Option<PlayerNumber> {
        self.player
    }
}

impl RoundStrategy for Mission {
    fn name(&self) -> &'static str {
        "mission"
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn return_page(&self) -> MenuPage {
        MenuPage::SinglePlayer
    }

    fn score_target(&self) -> i32 {
        self.target
    }

    fn can_start_game(&self) -> bool {
        self.confirmed
    }

    fn confirm_start(&mut self) {
        self.confirmed = true;
    }

    fn start_round(&mut self, roster: &mut CombatantRegistry) {
        // Without an explicit player the first to join plays the mission
        if self.player.is_none() {
            self.player = roster.get_index(0).map(|c| c.player_number);
        }
    }

    fn is_end_of_round(&self, _roster: &CombatantRegistry) -> bool {
        self.state.match_over()
    }

    fn handle_killer_score(
        &mut self,
        roster: &mut CombatantRegistry,
        killer: PlayerNumber,
        _killed: PlayerNumber,
    ) {
        if Some(killer) != self.player {
            return;
        }
        let score = match roster.get_mut(killer) {
            Some(c) => {
                c.add_score(1);
                c.score()
            }
            None => return,
        };
        if score >= self.target {
            self.state.finish(Some(killer));
        }
    }

    fn combatant_died(&mut self, _roster: &mut CombatantRegistry, victim: PlayerNumber) {
        if Some(victim) == self.player {
            self.state.finish(None);
        }
    }

    fn combatant_disconnected(&mut self, _roster: &mut CombatantRegistry, player: PlayerNumber) {
        if Some(player) == self.player {
            self.state.finish(None);
        }
    }

    fn round_message(&self) -> String {
        format!("Destroy {} targets", self.target)
    }

    fn round_end_text(&self, _roster: &CombatantRegistry) -> String {
        if self.state.winner().is_some() {
            "Mission complete".to_string()
        } else {
            "Mission failed".to_string()
        }
    }
}
