//! Collaborators that publish to the match event feed
//!
//! A hosted match has no renderer or scene graph of its own; every HUD,
//! fader, replication and control call becomes a `ServerMsg` on the match's
//! broadcast channel and the connected clients act on it. Send errors only
//! mean nobody is listening and are ignored.

use tokio::sync::broadcast;

use crate::ws::protocol::ServerMsg;

use super::collaborators::{ControlSurface, EntityRef, Fade, Fader, Hud, MenuPage, Replicator};
use super::combatant::PlayerNumber;
use super::environment::{CrateSpawner, EntityId, Hazard};
use super::spawn::SpawnLocation;

pub type EventSender = broadcast::Sender<ServerMsg>;

pub struct BroadcastHud {
    tx: EventSender,
}

impl BroadcastHud {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl Hud for BroadcastHud {
    fn set_enabled(&mut self, enabled: bool) {
        let _ = self.tx.send(ServerMsg::HudEnabled { enabled });
    }

    fn bind_local_combatant(&mut self, player: PlayerNumber) {
        let _ = self.tx.send(ServerMsg::HudBound {
            player_number: player,
        });
    }

    fn hide_announcer(&mut self) {
        let _ = self.tx.send(ServerMsg::AnnouncerHidden);
    }

    fn show_end_game(&mut self) {
        let _ = self.tx.send(ServerMsg::EndGameShown);
    }
}

pub struct BroadcastFader {
    tx: EventSender,
}

impl BroadcastFader {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl Fader for BroadcastFader {
    fn start_fade(&mut self, direction: Fade, duration: f32) {
        let _ = self.tx.send(ServerMsg::Fade {
            direction,
            duration,
        });
    }
}

pub struct BroadcastReplicator {
    tx: EventSender,
}

impl BroadcastReplicator {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl Replicator for BroadcastReplicator {
    fn server_spawn(&mut self, entity: EntityRef) {
        let _ = self.tx.send(ServerMsg::EntitySpawned { entity });
    }

    fn server_destroy(&mut self, entity: EntityRef) {
        let _ = self.tx.send(ServerMsg::EntityDestroyed { entity });
    }

    fn return_to_menu(&mut self, page: MenuPage) {
        let _ = self.tx.send(ServerMsg::ReturnToMenu { page });
    }
}

/// Control surface of a remote combatant
pub struct BroadcastControl {
    player: PlayerNumber,
    tx: EventSender,
}

impl BroadcastControl {
    pub fn new(player: PlayerNumber, tx: EventSender) -> Self {
        Self { player, tx }
    }
}

impl ControlSurface for BroadcastControl {
    fn enable_control(&mut self) {
        let _ = self.tx.send(ServerMsg::ControlChanged {
            player_number: self.player,
            enabled: true,
        });
    }

    fn disable_control(&mut self) {
        let _ = self.tx.send(ServerMsg::ControlChanged {
            player_number: self.player,
            enabled: false,
        });
    }

    fn reset_to_spawn(&mut self, location: &SpawnLocation) {
        let _ = self.tx.send(ServerMsg::CombatantPlaced {
            player_number: self.player,
            spawn: *location,
        });
    }
}

pub struct BroadcastHazard {
    id: EntityId,
    armed: bool,
    tx: EventSender,
}

impl BroadcastHazard {
    pub fn new(id: EntityId, tx: EventSender) -> Self {
        Self {
            id,
            armed: false,
            tx,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Hazard for BroadcastHazard {
    fn id(&self) -> EntityId {
        self.id
    }

    fn reset_hazard(&mut self) {
        self.armed = false;
        let _ = self.tx.send(ServerMsg::HazardReset { id: self.id });
    }

    fn activate_hazard(&mut self) {
        self.armed = true;
        let _ = self.tx.send(ServerMsg::HazardActivated { id: self.id });
    }
}

pub struct BroadcastCrateSpawner {
    id: EntityId,
    active: bool,
    tx: EventSender,
}

impl BroadcastCrateSpawner {
    pub fn new(id: EntityId, tx: EventSender) -> Self {
        Self {
            id,
            active: false,
            tx,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl CrateSpawner for BroadcastCrateSpawner {
    fn id(&self) -> EntityId {
        self.id
    }

    fn activate_spawner(&mut self) {
        self.active = true;
        let _ = self.tx.send(ServerMsg::SpawnerActivated { id: self.id });
    }

    fn deactivate_spawner(&mut self) {
        self.active = false;
        let _ = self.tx.send(ServerMsg::SpawnerDeactivated { id: self.id });
    }
}
