//! Environment objects tied to round boundaries: hazards, crate spawners
//! and pickups
//!
//! The objects register themselves when they come into the world and
//! deregister when they leave; the match only iterates and signals them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::collaborators::{EntityRef, Replicator};
use super::roster::{Keyed, Roster};

/// Network identity of an environment object
pub type EntityId = u32;

/// Environmental hazard with per-round reset/activate hooks
pub trait Hazard: Send {
    fn id(&self) -> EntityId;

    /// Put the hazard back in its start-of-round state (disarmed)
    fn reset_hazard(&mut self);

    /// Arm the hazard once play begins
    fn activate_hazard(&mut self);
}

/// Source of crates during a round
pub trait CrateSpawner: Send {
    fn id(&self) -> EntityId;

    fn activate_spawner(&mut self);

    fn deactivate_spawner(&mut self);
}

/// Pickup lying in the arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pickup {
    pub id: EntityId,
    pub kind: String,
}

impl Keyed for Box<dyn Hazard> {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        self.id()
    }
}

impl Keyed for Box<dyn CrateSpawner> {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        self.id()
    }
}

impl Keyed for Pickup {
    type Key = EntityId;

    fn key(&self) -> EntityId {
        self.id
    }
}

/// Hazards registered in the arena
#[derive(Default)]
pub struct HazardCoordinator {
    hazards: Roster<Box<dyn Hazard>>,
}

impl HazardCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hazard: Box<dyn Hazard>) -> bool {
        self.hazards.add(hazard)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Box<dyn Hazard>> {
        self.hazards.remove(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.hazards.contains(id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.hazards.keys()
    }

    pub fn len(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    pub fn reset_all(&mut self) {
        for hazard in self.hazards.iter_mut() {
            hazard.reset_hazard();
        }
    }

    pub fn activate_all(&mut self) {
        for hazard in self.hazards.iter_mut() {
            hazard.activate_hazard();
        }
    }
}

/// Crate spawners registered in the arena. Only the first one registered
/// is driven by the round cycle.
#[derive(Default)]
pub struct SpawnerCoordinator {
    spawners: Roster<Box<dyn CrateSpawner>>,
}

impl SpawnerCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spawner: Box<dyn CrateSpawner>) -> bool {
        self.spawners.add(spawner)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Box<dyn CrateSpawner>> {
        self.spawners.remove(id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.spawners.keys()
    }

    pub fn len(&self) -> usize {
        self.spawners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawners.is_empty()
    }

    /// Returns false when the map has no crate spawner
    pub fn activate_primary(&mut self) -> bool {
        match self.spawners.first_mut() {
            Some(spawner) => {
                spawner.activate_spawner();
                true
            }
            None => false,
        }
    }

    pub fn deactivate_primary(&mut self) -> bool {
        match self.spawners.first_mut() {
            Some(spawner) => {
                spawner.deactivate_spawner();
                true
            }
            None => false,
        }
    }
}

/// Pickups currently in the arena
#[derive(Debug, Default)]
pub struct PickupCoordinator {
    pickups: Roster<Pickup>,
}

impl PickupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pickup: Pickup) -> bool {
        self.pickups.add(pickup)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Pickup> {
        self.pickups.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pickup> {
        self.pickups.iter()
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }

    /// Destroy every outstanding pickup on all replicas, newest first.
    /// Returns how many were swept.
    pub fn destroy_all(&mut self, replicator: &mut dyn Replicator) -> usize {
        let swept = self.pickups.drain_rev();
        for pickup in &swept {
            replicator.server_destroy(EntityRef::Pickup { id: pickup.id });
        }
        if !swept.is_empty() {
            debug!(count = swept.len(), "Swept stale pickups");
        }
        swept.len()
    }
}
