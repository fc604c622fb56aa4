//! WebSocket protocol message definitions
//! These are the wire types for the match event feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::collaborators::{EntityRef, Fade, MenuPage};
use crate::game::combatant::{Combatant, PlayerNumber};
use crate::game::environment::EntityId;
use crate::game::modes::GameMode;
use crate::game::phase::MatchPhase;
use crate::game::spawn::SpawnLocation;
use crate::game::strategy::LeaderboardElement;

/// Messages sent from client to server over the match feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Go-ahead for modes that wait in pre-play
    ConfirmStart,

    /// Leave the match early
    Bail,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        match_id: Uuid,
        server_time: u64,
    },

    /// The match entered a new phase
    PhaseChanged {
        phase: MatchPhase,
        round: u32,
    },

    /// Round set up; live play follows after the start delay
    RoundStarting {
        round: u32,
        message: String,
    },

    /// Round finished
    RoundEnded {
        round: u32,
        text: String,
    },

    /// Combatant joined the match
    CombatantJoined {
        player: CombatantInfo,
    },

    /// Combatant left the match
    CombatantLeft {
        player_number: PlayerNumber,
        reason: String,
    },

    /// Combatant placed on a spawn point
    CombatantPlaced {
        player_number: PlayerNumber,
        spawn: SpawnLocation,
    },

    /// Input enabled or disabled for one combatant
    ControlChanged {
        player_number: PlayerNumber,
        enabled: bool,
    },

    /// A death was attributed
    Kill {
        killer: Option<PlayerNumber>,
        victim: PlayerNumber,
        suicide: bool,
    },

    HudEnabled {
        enabled: bool,
    },

    /// HUD now follows this combatant
    HudBound {
        player_number: PlayerNumber,
    },

    AnnouncerHidden,

    EndGameShown,

    /// Loading-screen fade
    Fade {
        direction: Fade,
        duration: f32,
    },

    EntitySpawned {
        entity: EntityRef,
    },

    EntityDestroyed {
        entity: EntityRef,
    },

    HazardReset {
        id: EntityId,
    },

    HazardActivated {
        id: EntityId,
    },

    SpawnerActivated {
        id: EntityId,
    },

    SpawnerDeactivated {
        id: EntityId,
    },

    /// Clients should leave the match scene
    ReturnToMenu {
        page: MenuPage,
    },

    /// Match has ended
    MatchEnd {
        winner: Option<PlayerNumber>,
        leaderboard: Vec<LeaderboardElement>,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Combatant summary for join notices and status snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantInfo {
    pub player_number: PlayerNumber,
    pub name: String,
    pub color: String,
    pub score: i32,
    pub alive: bool,
    pub control_enabled: bool,
}

impl From<&Combatant> for CombatantInfo {
    fn from(combatant: &Combatant) -> Self {
        Self {
            player_number: combatant.player_number,
            name: combatant.name.clone(),
            color: combatant.color.clone(),
            score: combatant.score(),
            alive: combatant.is_alive(),
            control_enabled: combatant.control_enabled(),
        }
    }
}

/// Point-in-time view of a match, readable without touching the match task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStatus {
    pub match_id: Uuid,
    pub mode: GameMode,
    pub map: String,
    pub phase: MatchPhase,
    /// Target of the running timed transition
    pub next_phase: Option<MatchPhase>,
    pub transition_remaining: Option<f32>,
    pub round: u32,
    pub combatants: Vec<CombatantInfo>,
    pub leaderboard: Vec<LeaderboardElement>,
    pub match_over: bool,
    pub winner: Option<PlayerNumber>,
    pub everyone_bailed: bool,
    pub closed: bool,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_msg_tags() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"confirm_start"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::ConfirmStart));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"ping","t":42}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Ping { t: 42 }));

        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"fly"}"#).is_err());
    }

    #[test]
    fn test_server_msg_shape() {
        let json = serde_json::to_value(ServerMsg::PhaseChanged {
            phase: MatchPhase::RoundEnd,
            round: 2,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "phase_changed", "phase": "round_end", "round": 2})
        );

        let json = serde_json::to_value(ServerMsg::EntityDestroyed {
            entity: EntityRef::Combatant { player: 3 },
        })
        .unwrap();
        assert_eq!(json["entity"]["kind"], "combatant");
        assert_eq!(json["entity"]["player"], 3);
    }
}
