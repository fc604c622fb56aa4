//! Error types for match orchestration

use thiserror::Error;
use uuid::Uuid;

use crate::game::combatant::PlayerNumber;

/// Errors raised while configuring or driving a match.
///
/// Only configuration problems are fatal. Lookup misses during play (no
/// attacker for a death, no crate spawner on the map) are not errors and
/// never show up here.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Match configuration is missing its {0}")]
    MissingCollaborator(&'static str),

    #[error("Map has no spawn points")]
    NoSpawnPoints,

    #[error("Spawn index {index} out of range ({count} spawn points)")]
    SpawnIndexOutOfRange { index: usize, count: usize },

    #[error("Unknown game mode: {0}")]
    UnknownMode(String),

    #[error("Player {0} is already in the match")]
    DuplicateCombatant(PlayerNumber),

    #[error("Match not found: {0}")]
    MatchNotFound(Uuid),

    #[error("Match is full")]
    MatchFull,

    #[error("Match is no longer accepting commands")]
    MatchClosed,
}

pub type Result<T> = std::result::Result<T, MatchError>;
