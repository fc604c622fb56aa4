//! Combatants and the match roster

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collaborators::ControlSurface;
use super::roster::{Keyed, Roster};
use super::spawn::SpawnLocation;

/// Stable per-match player number
pub type PlayerNumber = u32;

/// What dealt the most recent damage to a combatant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DamageCause {
    Shell,
    Explosion { id: String },
    Hazard,
    Environment,
}

/// Player state in a match (authoritative)
pub struct Combatant {
    pub player_number: PlayerNumber,
    pub name: String,
    pub color: String,

    /// Connection that owns this combatant, severed on exit
    owner: Option<Uuid>,

    score: i32,
    alive: bool,
    removed: bool,

    last_damaged_by: Option<PlayerNumber>,
    last_damage_cause: Option<DamageCause>,

    spawn: Option<SpawnLocation>,
    control_enabled: bool,
    control: Box<dyn ControlSurface>,
}

impl Combatant {
    pub fn new(
        player_number: PlayerNumber,
        name: impl Into<String>,
        color: impl Into<String>,
        control: Box<dyn ControlSurface>,
    ) -> Self {
        Self {
            player_number,
            name: name.into(),
            color: color.into(),
            owner: None,
            score: 0,
            alive: true,
            removed: false,
            last_damaged_by: None,
            last_damage_cause: None,
            spawn: None,
            control_enabled: false,
            control,
        }
    }

    pub fn with_owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    /// Drop the back-reference to the owning connection
    pub fn sever_owner(&mut self) -> Option<Uuid> {
        self.owner.take()
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    /// Adjust the score; only round strategies call this
    pub fn add_score(&mut self, delta: i32) {
        self.score += delta;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
        self.alive = false;
    }

    pub fn last_damaged_by(&self) -> Option<PlayerNumber> {
        self.last_damaged_by
    }

    pub fn last_damage_cause(&self) -> Option<&DamageCause> {
        self.last_damage_cause.as_ref()
    }

    pub fn record_damage(&mut self, attacker: Option<PlayerNumber>, cause: DamageCause) {
        if !self.alive {
            return;
        }
        self.last_damaged_by = attacker;
        self.last_damage_cause = Some(cause);
    }

    /// Mark dead. Returns false if the combatant was already dead, so one
    /// death is only ever processed once.
    pub fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }

    pub fn spawn(&self) -> Option<&SpawnLocation> {
        self.spawn.as_ref()
    }

    pub fn control_enabled(&self) -> bool {
        self.control_enabled
    }

    pub fn enable_control(&mut self) {
        if !self.control_enabled {
            self.control_enabled = true;
            self.control.enable_control();
        }
    }

    pub fn disable_control(&mut self) {
        if self.control_enabled {
            self.control_enabled = false;
            self.control.disable_control();
        }
    }

    /// Bring the combatant back to life at `location` with a clean damage
    /// history. A live combatant already standing there is left alone.
    pub fn reset_to_spawn(&mut self, location: SpawnLocation) {
        if self.alive && self.spawn == Some(location) {
            return;
        }
        self.alive = true;
        self.last_damaged_by = None;
        self.last_damage_cause = None;
        self.spawn = Some(location);
        self.control.reset_to_spawn(&location);
    }
}

impl std::fmt::Debug for Combatant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combatant")
            .field("player_number", &self.player_number)
            .field("name", &self.name)
            .field("score", &self.score)
            .field("alive", &self.alive)
            .field("control_enabled", &self.control_enabled)
            .field("spawn", &self.spawn)
            .finish()
    }
}

impl Keyed for Combatant {
    type Key = PlayerNumber;

    fn key(&self) -> PlayerNumber {
        self.player_number
    }
}

/// The roster: every active combatant in join order
pub type CombatantRegistry = Roster<Combatant>;

impl Roster<Combatant> {
    pub fn alive_count(&self) -> usize {
        self.iter().filter(|c| c.is_alive()).count()
    }

    pub fn alive(&self) -> impl Iterator<Item = &Combatant> {
        self.iter().filter(|c| c.is_alive())
    }

    pub fn total_score(&self) -> i32 {
        self.iter().map(Combatant::score).sum()
    }
}
