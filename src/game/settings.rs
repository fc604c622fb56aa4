//! Per-match settings

use serde::{Deserialize, Serialize};

use crate::config::Config;

use super::combatant::PlayerNumber;
use super::modes::GameMode;

/// Everything chosen in the lobby before the match scene loads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub mode: GameMode,
    pub map: String,
    /// Zero or less means the mode default
    pub score_target: i32,
    /// Combatant whose HUD the match drives; first in the roster if unset
    pub local_player: Option<PlayerNumber>,
    pub max_combatants: usize,
    pub spawn_points: usize,
    pub spawn_radius: f32,
    /// Hazards placed on the map at creation
    pub hazards: u32,
    /// Crate spawners placed on the map at creation
    pub crate_spawners: u32,
    /// Seed for spawn point selection
    pub seed: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Deathmatch,
            map: "arena".to_string(),
            score_target: 0,
            local_player: None,
            max_combatants: 8,
            spawn_points: 8,
            spawn_radius: 100.0,
            hazards: 0,
            crate_spawners: 1,
            seed: 0,
        }
    }
}

impl MatchSettings {
    /// Server-wide defaults from the environment
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.default_mode,
            map: config.default_map.clone(),
            score_target: config.score_target,
            max_combatants: config.max_combatants,
            spawn_points: config.spawn_points,
            ..Self::default()
        }
    }
}
