//! Interfaces to the systems a match signals but does not own
//!
//! Rendering, audio, the HUD widgets and the network layer all sit behind
//! these traits. Implementations are fire-and-forget: nothing here returns
//! a result the match waits on.

use serde::{Deserialize, Serialize};

use super::combatant::PlayerNumber;
use super::environment::EntityId;
use super::spawn::SpawnLocation;

/// Menu destination handed to the network layer when a match is left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuPage {
    Home,
    Lobby,
    SinglePlayer,
}

/// Fade direction for the loading screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fade {
    In,
    Out,
}

/// A networked object the authoritative side can spawn or destroy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    Combatant { player: PlayerNumber },
    Pickup { id: EntityId },
}

/// Control surface of one combatant's avatar.
///
/// `Combatant` tracks the enabled flag and current spawn itself and only
/// calls through on a real change, so implementations see each transition
/// once.
pub trait ControlSurface: Send {
    fn enable_control(&mut self);

    fn disable_control(&mut self);

    fn reset_to_spawn(&mut self, location: &SpawnLocation);
}

/// Control surface for combatants nobody is watching (bots, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedControl;

impl ControlSurface for DetachedControl {
    fn enable_control(&mut self) {}

    fn disable_control(&mut self) {}

    fn reset_to_spawn(&mut self, _location: &SpawnLocation) {}
}

/// In-match HUD and the modals layered on it
pub trait Hud: Send {
    fn set_enabled(&mut self, enabled: bool);

    fn bind_local_combatant(&mut self, player: PlayerNumber);

    fn hide_announcer(&mut self) {}

    fn show_end_game(&mut self) {}
}

/// Loading-screen fader.
///
/// Completion is tracked by the match itself as a pending continuation, so
/// the fader never calls back into the match.
pub trait Fader: Send {
    fn start_fade(&mut self, direction: Fade, duration: f32);
}

/// Authoritative network primitives, mirrored to every replica
pub trait Replicator: Send {
    fn server_spawn(&mut self, entity: EntityRef);

    fn server_destroy(&mut self, entity: EntityRef);

    /// Hand control back to the network layer to leave the match
    fn return_to_menu(&mut self, page: MenuPage);
}
