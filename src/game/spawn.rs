//! Spawn locations and the provider that hands them out

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// A place a combatant can be put at round start or on respawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnLocation {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// Spawn location provider consumed by the match
pub trait SpawnProvider: Send {
    /// Location for a player index. Indices wrap around the spawn list.
    fn spawn_location(&self, player_index: usize) -> SpawnLocation;

    /// Pick a random empty spawn point and mark it dirty before returning,
    /// so a second call in the same tick can't pick it again.
    fn random_empty_spawn_index(&mut self) -> usize;

    /// A spawn on `index` has landed and no longer needs its reservation
    fn release(&mut self, index: usize);

    /// Forget occupancy and dirty marks on every spawn point
    fn cleanup(&mut self);

    fn len(&self) -> usize;
}

/// Occupancy state of one spawn point
#[derive(Debug, Clone)]
pub struct SpawnPoint {
    location: SpawnLocation,
    dirty: bool,
    occupants: u32,
}

impl SpawnPoint {
    pub fn new(location: SpawnLocation) -> Self {
        Self {
            location,
            dirty: false,
            occupants: 0,
        }
    }

    pub fn is_empty_zone(&self) -> bool {
        !self.dirty && self.occupants == 0
    }

    /// Reserve for a spawn that hasn't landed yet
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    /// A combatant entered the spawn zone
    pub fn enter(&mut self) {
        self.occupants += 1;
    }

    /// A combatant left the spawn zone. Saturates at zero and clears the
    /// reservation.
    pub fn decrement(&mut self) {
        self.occupants = self.occupants.saturating_sub(1);
        self.dirty = false;
    }

    pub fn cleanup(&mut self) {
        self.dirty = false;
        self.occupants = 0;
    }
}

/// Spawn manager for one map
pub struct SpawnManager {
    points: Vec<SpawnPoint>,
    rng: ChaCha8Rng,
}

impl SpawnManager {
    pub fn new(locations: Vec<SpawnLocation>, seed: u64) -> Result<Self> {
        if locations.is_empty() {
            return Err(MatchError::NoSpawnPoints);
        }

        Ok(Self {
            points: locations.into_iter().map(SpawnPoint::new).collect(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Evenly spaced spawn points on a circle, each facing the centre
    pub fn ring(count: usize, radius: f32, seed: u64) -> Result<Self> {
        let locations = (0..count)
            .map(|index| {
                let angle = std::f32::consts::TAU * index as f32 / count as f32;
                SpawnLocation {
                    index,
                    x: angle.cos() * radius,
                    y: angle.sin() * radius,
                    rotation: (angle + std::f32::consts::PI).rem_euclid(std::f32::consts::TAU),
                }
            })
            .collect();

        Self::new(locations, seed)
    }

    pub fn point_mut(&mut self, index: usize) -> Result<&mut SpawnPoint> {
        let count = self.points.len();
        self.points
            .get_mut(index)
            .ok_or(MatchError::SpawnIndexOutOfRange { index, count })
    }
}

impl SpawnProvider for SpawnManager {
    fn spawn_location(&self, player_index: usize) -> SpawnLocation {
        self.points[player_index % self.points.len()].location
    }

    fn random_empty_spawn_index(&mut self) -> usize {
        let empty: Vec<usize> = self
            .points
            .iter()
            .enumerate()
            .filter(|(_, point)| point.is_empty_zone())
            .map(|(index, _)| index)
            .collect();

        if empty.is_empty() {
            return 0;
        }

        let index = empty[self.rng.gen_range(0..empty.len())];
        self.points[index].set_dirty();
        index
    }

    fn release(&mut self, index: usize) {
        if let Ok(point) = self.point_mut(index) {
            point.decrement();
        }
    }

    fn cleanup(&mut self) {
        for point in &mut self.points {
            point.cleanup();
        }
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_map_is_rejected() {
        assert!(matches!(
            SpawnManager::new(Vec::new(), 1),
            Err(MatchError::NoSpawnPoints)
        ));
    }

    #[test]
    fn test_spawn_location_wraps() {
        let spawns = SpawnManager::ring(4, 100.0, 1).unwrap();
        assert_eq!(spawns.spawn_location(1), spawns.spawn_location(5));
        assert_eq!(spawns.spawn_location(6).index, 2);
    }

    #[test]
    fn test_random_empty_never_double_books() {
        let mut spawns = SpawnManager::ring(4, 100.0, 99).unwrap();
        let mut picked: Vec<usize> = (0..4).map(|_| spawns.random_empty_spawn_index()).collect();
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3]);

        // Every point is reserved now
        assert_eq!(spawns.random_empty_spawn_index(), 0);

        spawns.release(2);
        assert_eq!(spawns.random_empty_spawn_index(), 2);
    }

    #[test]
    fn test_released_points_are_reused() {
        let mut spawns = SpawnManager::ring(3, 100.0, 21).unwrap();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..30 {
            let index = spawns.random_empty_spawn_index();
            seen.insert(index);
            spawns.release(index);
        }
        assert_eq!(seen.len(), 3);

        // Releasing an unknown index is ignored
        spawns.release(99);
    }

    #[test]
    fn test_occupied_point_is_not_empty() {
        let mut spawns = SpawnManager::ring(2, 50.0, 3).unwrap();
        spawns.point_mut(0).unwrap().enter();
        assert_eq!(spawns.random_empty_spawn_index(), 1);

        spawns.cleanup();
        assert!(spawns.point_mut(0).unwrap().is_empty_zone());
        assert!(spawns.point_mut(1).unwrap().is_empty_zone());
    }

    #[test]
    fn test_decrement_saturates() {
        let mut point = SpawnPoint::new(SpawnLocation {
            index: 0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
        });
        point.decrement();
        point.decrement();
        assert!(point.is_empty_zone());
        point.enter();
        assert!(!point.is_empty_zone());
        point.decrement();
        assert!(point.is_empty_zone());
    }

    #[test]
    fn test_point_out_of_range() {
        let mut spawns = SpawnManager::ring(3, 10.0, 0).unwrap();
        assert!(matches!(
            spawns.point_mut(3),
            Err(MatchError::SpawnIndexOutOfRange { index: 3, count: 3 })
        ));
    }
}
