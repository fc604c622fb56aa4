//! Match orchestration modules

pub mod broadcast;
pub mod collaborators;
pub mod combatant;
pub mod environment;
pub mod r#match;
pub mod modes;
pub mod orchestrator;
pub mod phase;
pub mod roster;
pub mod settings;
pub mod spawn;
pub mod strategy;

pub use combatant::{Combatant, CombatantRegistry, DamageCause, PlayerNumber};
pub use modes::GameMode;
pub use orchestrator::{KillOutcome, MatchSession, MatchSessionBuilder};
pub use phase::MatchPhase;
pub use r#match::{GameMatch, MatchHandle, MatchRegistry};
pub use settings::MatchSettings;
pub use strategy::{LeaderboardElement, RoundStrategy};

use serde::Deserialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::Result;
use crate::ws::protocol::CombatantInfo;
use environment::Pickup;

/// Lobby hand-off for one combatant
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub player_number: PlayerNumber,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Connection that owns the combatant
    #[serde(default)]
    pub owner: Option<Uuid>,
}

fn default_color() -> String {
    "#ffffff".to_string()
}

/// A death reported by the simulation
#[derive(Debug, Clone, Deserialize)]
pub struct DeathReport {
    pub victim: PlayerNumber,
    /// Latest damage source, recorded before the death is processed
    #[serde(default)]
    pub attacker: Option<PlayerNumber>,
    #[serde(default)]
    pub cause: Option<DamageCause>,
}

/// Commands accepted by a running match task
#[derive(Debug)]
pub enum MatchCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<CombatantInfo>>,
    },
    Leave {
        player_number: PlayerNumber,
    },
    Damage {
        victim: PlayerNumber,
        attacker: Option<PlayerNumber>,
        cause: DamageCause,
    },
    Death(DeathReport),
    SpawnPickup(Pickup),
    ConfirmStart,
    Bail,
    Complete,
    Ping {
        t: u64,
    },
}
