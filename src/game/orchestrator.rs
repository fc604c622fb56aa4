//! Match orchestration: the phase state machine
//!
//! `MatchSession` owns everything a match is made of (the roster, the
//! environment registries, the round strategy and the collaborator handles)
//! and is advanced by calling [`MatchSession::tick`] once per logical tick.
//! At most one phase transition happens per tick.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MatchError, Result};
use crate::util::time::{
    END_GAME_DELAY_SECS, NEXT_ROUND_DELAY_SECS, ROUND_START_DELAY_SECS, STARTUP_FADE_SECS,
};

use super::collaborators::{EntityRef, Fade, Fader, Hud, MenuPage, Replicator};
use super::combatant::{Combatant, CombatantRegistry, DamageCause, PlayerNumber};
use super::environment::{
    CrateSpawner, EntityId, Hazard, HazardCoordinator, Pickup, PickupCoordinator,
    SpawnerCoordinator,
};
use super::phase::{MatchPhase, PhaseState};
use super::settings::MatchSettings;
use super::spawn::SpawnProvider;
use super::strategy::{LeaderboardElement, RoundStrategy};

/// How a death was attributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// Nobody to credit (environment, or the attacker already left)
    Unattributed { victim: PlayerNumber },
    Suicide { player: PlayerNumber },
    Kill { killer: PlayerNumber, victim: PlayerNumber },
}

/// Continuation waiting on the loading-screen fade
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingFade {
    remaining: f32,
    then: MatchPhase,
}

/// Builder that refuses to produce a partially configured match
#[derive(Default)]
pub struct MatchSessionBuilder {
    id: Option<Uuid>,
    settings: MatchSettings,
    strategy: Option<Box<dyn RoundStrategy>>,
    hud: Option<Box<dyn Hud>>,
    fader: Option<Box<dyn Fader>>,
    replicator: Option<Box<dyn Replicator>>,
    spawns: Option<Box<dyn SpawnProvider>>,
}

impl MatchSessionBuilder {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn strategy(mut self, strategy: Box<dyn RoundStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn hud(mut self, hud: Box<dyn Hud>) -> Self {
        self.hud = Some(hud);
        self
    }

    pub fn fader(mut self, fader: Box<dyn Fader>) -> Self {
        self.fader = Some(fader);
        self
    }

    pub fn replicator(mut self, replicator: Box<dyn Replicator>) -> Self {
        self.replicator = Some(replicator);
        self
    }

    pub fn spawns(mut self, spawns: Box<dyn SpawnProvider>) -> Self {
        self.spawns = Some(spawns);
        self
    }

    /// Validate the configuration. Every collaborator is required.
    pub fn build(self) -> Result<MatchSession> {
        let strategy = self
            .strategy
            .ok_or(MatchError::MissingCollaborator("round strategy"))?;
        let hud = self.hud.ok_or(MatchError::MissingCollaborator("hud"))?;
        let fader = self.fader.ok_or(MatchError::MissingCollaborator("fader"))?;
        let replicator = self
            .replicator
            .ok_or(MatchError::MissingCollaborator("replicator"))?;
        let spawns = self
            .spawns
            .ok_or(MatchError::MissingCollaborator("spawn provider"))?;

        if spawns.len() == 0 {
            return Err(MatchError::NoSpawnPoints);
        }

        Ok(MatchSession {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            settings: self.settings,
            phase: PhaseState::default(),
            strategy,
            roster: CombatantRegistry::new(),
            hazards: HazardCoordinator::new(),
            spawners: SpawnerCoordinator::new(),
            pickups: PickupCoordinator::new(),
            spawns,
            hud,
            fader,
            replicator,
            pending_fade: None,
            hazards_active: false,
            started: false,
            game_finished: false,
            everyone_bailed: false,
            closed: false,
            local_player: None,
            rounds_played: 0,
        })
    }
}

/// One match from scene start to exit
pub struct MatchSession {
    id: Uuid,
    settings: MatchSettings,
    phase: PhaseState,
    strategy: Box<dyn RoundStrategy>,

    roster: CombatantRegistry,
    hazards: HazardCoordinator,
    spawners: SpawnerCoordinator,
    pickups: PickupCoordinator,

    spawns: Box<dyn SpawnProvider>,
    hud: Box<dyn Hud>,
    fader: Box<dyn Fader>,
    replicator: Box<dyn Replicator>,

    pending_fade: Option<PendingFade>,
    hazards_active: bool,
    started: bool,
    game_finished: bool,
    everyone_bailed: bool,
    closed: bool,
    local_player: Option<PlayerNumber>,
    rounds_played: u32,
}

impl MatchSession {
    pub fn builder(settings: MatchSettings) -> MatchSessionBuilder {
        MatchSessionBuilder::new(settings)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase.phase()
    }

    /// Target phase and remaining seconds of the running timed transition
    pub fn pending_transition(&self) -> Option<(MatchPhase, f32)> {
        self.phase.pending()
    }

    /// 1-based number of the current (or last) round
    pub fn round(&self) -> u32 {
        self.rounds_played + 1
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn roster(&self) -> &CombatantRegistry {
        &self.roster
    }

    pub fn strategy(&self) -> &dyn RoundStrategy {
        self.strategy.as_ref()
    }

    pub fn hazards(&self) -> &HazardCoordinator {
        &self.hazards
    }

    pub fn spawners(&self) -> &SpawnerCoordinator {
        &self.spawners
    }

    pub fn pickups(&self) -> &PickupCoordinator {
        &self.pickups
    }

    pub fn hazards_active(&self) -> bool {
        self.hazards_active
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_finished(&self) -> bool {
        self.game_finished
    }

    pub fn everyone_bailed(&self) -> bool {
        self.everyone_bailed
    }

    /// True once the match has been left; ticks are ignored from then on
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn local_player(&self) -> Option<PlayerNumber> {
        self.local_player
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardElement> {
        self.strategy.leaderboard_elements(&self.roster)
    }

    /// Move from `Inactive` into start-up. Only the first call does anything.
    pub fn begin(&mut self) {
        if !self.started && !self.closed {
            info!(match_id = %self.id, mode = self.strategy.name(), map = %self.settings.map, "Match starting up");
            self.started = true;
            self.phase = PhaseState::Steady(MatchPhase::StartUp);
        }
    }

    /// Player go-ahead for modes that hold in pre-play until told to start
    pub fn confirm_start(&mut self) {
        if !self.closed {
            self.strategy.confirm_start();
        }
    }

    /// Advance the state machine by one tick of `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if self.closed {
            return;
        }

        let before = self.phase.phase();

        match self.phase {
            PhaseState::Steady(MatchPhase::Inactive) => self.inactive(dt),
            PhaseState::Steady(MatchPhase::StartUp) => self.start_up(),
            PhaseState::Timed { .. } => self.timed_transition(dt),
            PhaseState::Steady(MatchPhase::PrePlay) => self.pre_play(),
            PhaseState::Steady(MatchPhase::Playing) => self.playing(),
            PhaseState::Steady(MatchPhase::RoundEnd) => self.round_end(),
            PhaseState::Steady(MatchPhase::EndGame) => self.end_game(),
            PhaseState::Steady(MatchPhase::PostGame)
            | PhaseState::Steady(MatchPhase::TimedTransition) => {}
        }

        let after = self.phase.phase();
        if before != after {
            debug!(match_id = %self.id, from = ?before, to = ?after, "Phase change");
        }
    }

    fn set_timed_transition(&mut self, next: MatchPhase, seconds: f32) {
        self.phase = PhaseState::Timed {
            next,
            remaining: seconds,
        };
    }

    fn inactive(&mut self, dt: f32) {
        let Some(mut fade) = self.pending_fade.take() else {
            return;
        };

        fade.remaining -= dt.max(0.0);
        if fade.remaining <= 0.0 {
            self.phase = PhaseState::Steady(fade.then);
        } else {
            self.pending_fade = Some(fade);
        }
    }

    fn start_up(&mut self) {
        self.fader.start_fade(Fade::Out, STARTUP_FADE_SECS);
        self.pending_fade = Some(PendingFade {
            remaining: STARTUP_FADE_SECS,
            then: MatchPhase::PrePlay,
        });
        self.phase = PhaseState::Steady(MatchPhase::Inactive);
    }

    fn timed_transition(&mut self, dt: f32) {
        if let Some(next) = self.phase.count_down(dt) {
            self.phase = PhaseState::Steady(next);
        }
    }

    fn pre_play(&mut self) {
        if !self.strategy.can_start_game() {
            return;
        }

        self.round_starting();
        self.enable_control();
        self.hud.hide_announcer();
    }

    fn playing(&mut self) {
        // Hazards arm the moment live play begins, not at round setup
        if !self.hazards_active {
            self.hazards.activate_all();
            self.hazards_active = true;
        }

        if self.strategy.is_end_of_round(&self.roster) {
            self.phase = PhaseState::Steady(MatchPhase::RoundEnd);
        }
    }

    fn round_end(&mut self) {
        self.spawners.deactivate_primary();
        self.strategy.handle_round_end(&mut self.roster);
        self.rounds_played += 1;

        info!(
            match_id = %self.id,
            round = self.rounds_played,
            result = %self.strategy.round_end_text(&self.roster),
            "Round ended"
        );

        if self.strategy.match_over() {
            self.set_timed_transition(MatchPhase::EndGame, END_GAME_DELAY_SECS);
        } else {
            self.set_timed_transition(MatchPhase::PrePlay, NEXT_ROUND_DELAY_SECS);
        }
    }

    fn end_game(&mut self) {
        self.game_end();
        self.strategy.match_end(&self.roster);
        self.phase = PhaseState::Steady(MatchPhase::PostGame);

        info!(
            match_id = %self.id,
            winner = ?self.strategy.winner(),
            rounds = self.rounds_played,
            "Match over"
        );
    }

    /// Set up a round. Running it twice in a row leaves combatants and
    /// hazards exactly where a single run would.
    pub fn round_starting(&mut self) {
        self.strategy.start_round(&mut self.roster);
        self.spawns.cleanup();
        self.reset_all_combatants();
        self.disable_control();
        self.init_hud_and_local_player();
        self.hud.set_enabled(true);
        self.pickups.destroy_all(self.replicator.as_mut());
        self.hazards.reset_all();
        self.hazards_active = false;
        self.spawners.activate_primary();

        let message = self.strategy.round_message();
        info!(match_id = %self.id, round = self.round(), message = %message, "Round starting");

        self.set_timed_transition(MatchPhase::Playing, ROUND_START_DELAY_SECS);
    }

    fn game_end(&mut self) {
        self.hud.set_enabled(false);
        self.disable_control();
        self.game_finished = true;
        self.hud.show_end_game();

        if let Some(local) = self.local_player {
            let leaderboard = self.leaderboard();
            if let Some(index) = leaderboard.iter().position(|row| row.player_number == local) {
                let rank = self.strategy.rank(index);
                info!(
                    match_id = %self.id,
                    player = local,
                    final_position = rank,
                    award = self.strategy.award_amount(rank),
                    "{}",
                    self.strategy.award_text(rank)
                );
            }
        }
    }

    fn reset_all_combatants(&mut self) {
        for number in self.roster.keys() {
            let location = self.spawns.spawn_location(number as usize);
            if let Some(combatant) = self.roster.get_mut(number) {
                combatant.reset_to_spawn(location);
            }
        }
    }

    pub fn enable_control(&mut self) {
        for combatant in self.roster.iter_mut() {
            combatant.enable_control();
        }
    }

    pub fn disable_control(&mut self) {
        for combatant in self.roster.iter_mut() {
            combatant.disable_control();
        }
    }

    fn init_hud_and_local_player(&mut self) {
        let local = self
            .settings
            .local_player
            .filter(|n| self.roster.contains(*n))
            .or_else(|| self.roster.get_index(0).map(|c| c.player_number));

        self.local_player = local;
        if let Some(player) = local {
            self.hud.bind_local_combatant(player);
        }
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Lobby hand-off. The combatant is placed on the spawn point for its
    /// player number. Returns false if that player number is already in.
    pub fn add_combatant(&mut self, mut combatant: Combatant) -> bool {
        let number = combatant.player_number;
        if self.roster.contains(number) {
            warn!(match_id = %self.id, player = number, "Combatant already in match");
            return false;
        }

        combatant.reset_to_spawn(self.spawns.spawn_location(number as usize));
        if self.phase() == MatchPhase::Playing {
            combatant.enable_control();
        }

        self.roster.add(combatant);
        self.everyone_bailed = false;
        self.replicator
            .server_spawn(EntityRef::Combatant { player: number });

        info!(
            match_id = %self.id,
            player = number,
            combatants = self.roster.len(),
            "Combatant joined"
        );
        true
    }

    /// Disconnect. Removing someone who isn't there is a no-op.
    pub fn remove_combatant(&mut self, player: PlayerNumber) -> Option<Combatant> {
        let mut combatant = self.roster.remove(player)?;
        combatant.mark_removed();

        self.strategy
            .combatant_disconnected(&mut self.roster, player);
        self.replicator
            .server_destroy(EntityRef::Combatant { player });

        if self.roster.is_empty() && self.started {
            self.everyone_bailed = true;
        }

        info!(
            match_id = %self.id,
            player,
            combatants = self.roster.len(),
            "Combatant left"
        );
        Some(combatant)
    }

    /// Note the latest source of damage on a combatant
    pub fn record_damage(
        &mut self,
        victim: PlayerNumber,
        attacker: Option<PlayerNumber>,
        cause: DamageCause,
    ) {
        if let Some(combatant) = self.roster.get_mut(victim) {
            combatant.record_damage(attacker, cause);
        }
    }

    /// Process one death. Attribution runs once per death: a second report
    /// for a combatant that is already dead returns `None`.
    pub fn combatant_dies(&mut self, victim: PlayerNumber) -> Option<KillOutcome> {
        let combatant = self.roster.get_mut(victim)?;
        if !combatant.kill() {
            return None;
        }
        let attacker = combatant.last_damaged_by();

        let outcome = self.handle_kill(victim, attacker);
        self.strategy.combatant_died(&mut self.roster, victim);

        if self.strategy.respawns_on_death() && !self.strategy.match_over() {
            self.respawn(victim);
        }

        Some(outcome)
    }

    fn handle_kill(&mut self, victim: PlayerNumber, attacker: Option<PlayerNumber>) -> KillOutcome {
        let killer = attacker.filter(|n| self.roster.contains(*n));
        // The result is final once the match is decided
        let scoring = !self.strategy.match_over();

        let outcome = match killer {
            None => KillOutcome::Unattributed { victim },
            Some(killer) if killer == victim => {
                if scoring {
                    self.strategy.handle_suicide(&mut self.roster, killer);
                }
                KillOutcome::Suicide { player: killer }
            }
            Some(killer) => {
                if scoring {
                    self.strategy
                        .handle_killer_score(&mut self.roster, killer, victim);
                }
                KillOutcome::Kill { killer, victim }
            }
        };

        info!(match_id = %self.id, outcome = ?outcome, "Combatant destroyed");
        outcome
    }

    fn respawn(&mut self, player: PlayerNumber) {
        let index = self.spawns.random_empty_spawn_index();
        let location = self.spawns.spawn_location(index);
        if let Some(combatant) = self.roster.get_mut(player) {
            combatant.reset_to_spawn(location);
            debug!(match_id = %self.id, player, spawn = index, "Respawned");
        }
        self.spawns.release(index);
    }

    // ------------------------------------------------------------------
    // Environment registration
    // ------------------------------------------------------------------

    pub fn add_hazard(&mut self, hazard: Box<dyn Hazard>) -> bool {
        self.hazards.add(hazard)
    }

    pub fn remove_hazard(&mut self, id: EntityId) -> bool {
        self.hazards.remove(id).is_some()
    }

    pub fn add_crate_spawner(&mut self, spawner: Box<dyn CrateSpawner>) -> bool {
        self.spawners.add(spawner)
    }

    pub fn remove_crate_spawner(&mut self, id: EntityId) -> bool {
        self.spawners.remove(id).is_some()
    }

    pub fn add_pickup(&mut self, pickup: Pickup) -> bool {
        self.pickups.add(pickup)
    }

    pub fn remove_pickup(&mut self, id: EntityId) -> bool {
        self.pickups.remove(id).is_some()
    }

    // ------------------------------------------------------------------
    // Leaving the match
    // ------------------------------------------------------------------

    /// Player chose to leave
    pub fn bail(&mut self) {
        let page = self.strategy.bail_destination();
        self.exit_game(page);
    }

    /// Match finished and its end screen is done
    pub fn complete_game(&mut self) {
        let page = self.strategy.completion_destination();
        self.exit_game(page);
    }

    /// Tear down every combatant on all replicas and return to `page`.
    /// The session is closed afterwards.
    pub fn exit_game(&mut self, page: MenuPage) {
        if self.closed {
            return;
        }

        for number in self.roster.keys() {
            if let Some(combatant) = self.roster.get_mut(number) {
                combatant.sever_owner();
                self.replicator
                    .server_destroy(EntityRef::Combatant { player: number });
            }
        }
        self.roster.clear();

        // A fade still counting down must not revive the match
        self.pending_fade = None;
        self.closed = true;

        info!(match_id = %self.id, page = ?page, "Leaving match");
        self.replicator.return_to_menu(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collaborators::DetachedControl;
    use crate::game::combatant::tests::RecordingControl;
    use crate::game::environment::tests::{Log, RecordingHazard, RecordingSpawner};
    use crate::game::modes::GameMode;
    use crate::game::spawn::SpawnManager;
    use crate::game::strategy::StrategyState;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        log: Log,
    }

    impl Recorder {
        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl Hud for Recorder {
        fn set_enabled(&mut self, enabled: bool) {
            self.push(format!("hud:{enabled}"));
        }

        fn bind_local_combatant(&mut self, player: PlayerNumber) {
            self.push(format!("bind:{player}"));
        }

        fn hide_announcer(&mut self) {
            self.push("announcer_hidden".into());
        }

        fn show_end_game(&mut self) {
            self.push("end_game_modal".into());
        }
    }

    impl Fader for Recorder {
        fn start_fade(&mut self, direction: Fade, duration: f32) {
            self.push(format!("fade:{direction:?}:{duration}"));
        }
    }

    impl Replicator for Recorder {
        fn server_spawn(&mut self, entity: EntityRef) {
            self.push(format!("spawn:{entity:?}"));
        }

        fn server_destroy(&mut self, entity: EntityRef) {
            self.push(format!("destroy:{entity:?}"));
        }

        fn return_to_menu(&mut self, page: MenuPage) {
            self.push(format!("menu:{page:?}"));
        }
    }

    /// Strategy whose round end is driven by the test and which records
    /// every scoring hook
    #[derive(Clone, Default)]
    struct Scripted {
        state: Arc<Mutex<StrategyState>>,
        end_round: Arc<Mutex<bool>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    struct ScriptedStrategy {
        script: Scripted,
        state: StrategyState,
    }

    impl RoundStrategy for ScriptedStrategy {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn state(&self) -> &StrategyState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut StrategyState {
            &mut self.state
        }

        fn match_over(&self) -> bool {
            self.script.state.lock().unwrap().match_over()
        }

        fn is_end_of_round(&self, _roster: &CombatantRegistry) -> bool {
            *self.script.end_round.lock().unwrap()
        }

        fn start_round(&mut self, _roster: &mut CombatantRegistry) {
            self.script.calls.lock().unwrap().push("start_round".into());
        }

        fn handle_round_end(&mut self, _roster: &mut CombatantRegistry) {
            self.script.calls.lock().unwrap().push("round_end".into());
        }

        fn match_end(&mut self, _roster: &CombatantRegistry) {
            self.script.calls.lock().unwrap().push("match_end".into());
        }

        fn handle_killer_score(
            &mut self,
            _roster: &mut CombatantRegistry,
            killer: PlayerNumber,
            killed: PlayerNumber,
        ) {
            self.script
                .calls
                .lock()
                .unwrap()
                .push(format!("kill:{killer}:{killed}"));
        }

        fn handle_suicide(&mut self, _roster: &mut CombatantRegistry, killer: PlayerNumber) {
            self.script
                .calls
                .lock()
                .unwrap()
                .push(format!("suicide:{killer}"));
        }
    }

    struct Fixture {
        session: MatchSession,
        recorder: Recorder,
        script: Scripted,
    }

    fn fixture() -> Fixture {
        let recorder = Recorder::default();
        let script = Scripted::default();
        let session = MatchSession::builder(MatchSettings::default())
            .strategy(Box::new(ScriptedStrategy {
                script: script.clone(),
                state: StrategyState::default(),
            }))
            .hud(Box::new(recorder.clone()))
            .fader(Box::new(recorder.clone()))
            .replicator(Box::new(recorder.clone()))
            .spawns(Box::new(SpawnManager::ring(4, 100.0, 1).unwrap()))
            .build()
            .unwrap();

        Fixture {
            session,
            recorder,
            script,
        }
    }

    fn combatant(number: PlayerNumber) -> Combatant {
        Combatant::new(number, format!("P{number}"), "#ffffff", Box::new(DetachedControl))
    }

    /// Tick until the phase changes (bounded)
    fn tick_until_change(session: &mut MatchSession, dt: f32) -> MatchPhase {
        let start = session.phase();
        for _ in 0..1000 {
            session.tick(dt);
            if session.phase() != start {
                return session.phase();
            }
        }
        panic!("phase stuck in {start:?}");
    }

    #[test]
    fn test_builder_rejects_missing_collaborators() {
        let err = MatchSession::builder(MatchSettings::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MatchError::MissingCollaborator("round strategy")));

        let recorder = Recorder::default();
        let err = MatchSession::builder(MatchSettings::default())
            .strategy(GameMode::Deathmatch.build_strategy(0, None))
            .fader(Box::new(recorder.clone()))
            .replicator(Box::new(recorder.clone()))
            .spawns(Box::new(SpawnManager::ring(2, 10.0, 0).unwrap()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MatchError::MissingCollaborator("hud")));

        let err = MatchSession::builder(MatchSettings::default())
            .strategy(GameMode::Deathmatch.build_strategy(0, None))
            .hud(Box::new(recorder.clone()))
            .fader(Box::new(recorder.clone()))
            .replicator(Box::new(recorder))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, MatchError::MissingCollaborator("spawn provider")));
    }

    #[test]
    fn test_session_starts_inactive_and_idles() {
        let mut f = fixture();
        assert_eq!(f.session.phase(), MatchPhase::Inactive);
        f.session.tick(1.0);
        assert_eq!(f.session.phase(), MatchPhase::Inactive);
        assert!(f.recorder.entries().is_empty());
    }

    #[test]
    fn test_full_phase_sequence() {
        let mut f = fixture();
        f.session.add_combatant(combatant(1));
        f.session.add_combatant(combatant(2));
        f.session.begin();
        assert_eq!(f.session.phase(), MatchPhase::StartUp);

        // Start-up requests the fade and waits for it
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::Inactive);
        assert!(f.recorder.entries().contains(&"fade:Out:0.5".to_string()));

        assert_eq!(tick_until_change(&mut f.session, 0.1), MatchPhase::PrePlay);

        // Pre-play sets the round up and schedules live play
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::TimedTransition);
        assert_eq!(
            f.session.pending_transition().map(|(next, _)| next),
            Some(MatchPhase::Playing)
        );
        assert!(f.session.roster().iter().all(|c| c.control_enabled()));

        assert_eq!(tick_until_change(&mut f.session, 0.1), MatchPhase::Playing);
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::Playing);

        *f.script.end_round.lock().unwrap() = true;
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::RoundEnd);

        // Match not over: the next round gets scheduled
        f.session.tick(0.1);
        assert_eq!(f.session.pending_transition().unwrap().0, MatchPhase::PrePlay);
        assert_eq!(f.session.rounds_played(), 1);

        f.script.state.lock().unwrap().finish(Some(1));
        *f.script.end_round.lock().unwrap() = true;
        assert_eq!(tick_until_change(&mut f.session, 0.5), MatchPhase::PrePlay);
        f.session.tick(0.1);
        assert_eq!(tick_until_change(&mut f.session, 0.5), MatchPhase::Playing);
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::RoundEnd);

        f.session.tick(0.1);
        assert_eq!(
            f.session.pending_transition(),
            Some((MatchPhase::EndGame, END_GAME_DELAY_SECS))
        );
        assert_eq!(tick_until_change(&mut f.session, 0.25), MatchPhase::EndGame);
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::PostGame);
        assert!(f.session.is_finished());

        // Terminal
        f.session.tick(10.0);
        assert_eq!(f.session.phase(), MatchPhase::PostGame);

        let calls = f.script.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec!["start_round", "round_end", "start_round", "round_end", "match_end"]
        );

        let entries = f.recorder.entries();
        let disable = entries.iter().rposition(|e| e == "hud:false").unwrap();
        let modal = entries.iter().rposition(|e| e == "end_game_modal").unwrap();
        assert!(disable < modal);
    }

    #[test]
    fn test_timed_transition_never_skips_target() {
        let mut f = fixture();
        f.session.set_timed_transition(MatchPhase::Playing, 1.0);

        let mut last = 1.0;
        loop {
            f.session.tick(0.3);
            match f.session.pending_transition() {
                Some((next, remaining)) => {
                    assert_eq!(next, MatchPhase::Playing);
                    assert!(remaining <= last);
                    last = remaining;
                }
                None => break,
            }
        }
        assert_eq!(f.session.phase(), MatchPhase::Playing);
    }

    #[test]
    fn test_round_start_is_idempotent() {
        let log = Log::default();
        let mut f = fixture();
        let control = RecordingControl::default();
        f.session
            .add_combatant(Combatant::new(1, "A", "#f00", Box::new(control.clone())));
        f.session.add_combatant(combatant(3));
        f.session.add_hazard(Box::new(RecordingHazard {
            id: 9,
            armed: true,
            log: log.clone(),
        }));

        f.session.round_starting();
        let positions: Vec<_> = f.session.roster().iter().map(|c| c.spawn().copied()).collect();
        let hazards_active = f.session.hazards_active();

        f.session.round_starting();
        let again: Vec<_> = f.session.roster().iter().map(|c| c.spawn().copied()).collect();

        assert_eq!(positions, again);
        assert_eq!(hazards_active, f.session.hazards_active());
        assert!(!f.session.hazards_active());
        assert_eq!(*log.lock().unwrap(), vec!["reset:9", "reset:9"]);
        // Spawn placement reached the control surface once, on join
        let resets = control
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("reset"))
            .count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_hazards_activate_once_per_round() {
        let log = Log::default();
        let mut f = fixture();
        f.session.add_hazard(Box::new(RecordingHazard {
            id: 1,
            armed: false,
            log: log.clone(),
        }));
        f.session.round_starting();
        assert_eq!(tick_until_change(&mut f.session, 1.0), MatchPhase::Playing);

        for _ in 0..5 {
            f.session.tick(0.1);
        }
        let activations = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("activate"))
            .count();
        assert_eq!(activations, 1);
        assert!(f.session.hazards_active());
    }

    #[test]
    fn test_crate_spawner_follows_round() {
        let log = Log::default();
        let mut f = fixture();
        f.session.add_crate_spawner(Box::new(RecordingSpawner { id: 4, log: log.clone() }));
        f.session.round_starting();
        assert_eq!(tick_until_change(&mut f.session, 1.0), MatchPhase::Playing);
        *f.script.end_round.lock().unwrap() = true;
        f.session.tick(0.1);
        f.session.tick(0.1);
        assert_eq!(*log.lock().unwrap(), vec!["spawner_on:4", "spawner_off:4"]);
    }

    #[test]
    fn test_round_start_sweeps_pickups() {
        let mut f = fixture();
        f.session.add_pickup(Pickup { id: 30, kind: "shield".into() });
        f.session.round_starting();
        assert!(f.session.pickups().is_empty());
        assert!(f
            .recorder
            .entries()
            .contains(&"destroy:Pickup { id: 30 }".to_string()));
    }

    #[test]
    fn test_kill_attribution() {
        let mut f = fixture();
        f.session.add_combatant(combatant(1));
        f.session.add_combatant(combatant(2));

        f.session.record_damage(2, Some(1), DamageCause::Shell);
        assert_eq!(
            f.session.combatant_dies(2),
            Some(KillOutcome::Kill { killer: 1, victim: 2 })
        );
        // Same death reported again is ignored
        assert_eq!(f.session.combatant_dies(2), None);

        f.session.record_damage(1, Some(1), DamageCause::Explosion { id: "mine".into() });
        assert_eq!(
            f.session.combatant_dies(1),
            Some(KillOutcome::Suicide { player: 1 })
        );

        assert_eq!(
            *f.script.calls.lock().unwrap(),
            vec!["kill:1:2", "suicide:1"]
        );
    }

    #[test]
    fn test_environmental_and_departed_attacker_deaths_score_nothing() {
        let mut f = fixture();
        f.session.add_combatant(combatant(1));
        f.session.add_combatant(combatant(2));

        f.session.record_damage(1, None, DamageCause::Hazard);
        assert_eq!(
            f.session.combatant_dies(1),
            Some(KillOutcome::Unattributed { victim: 1 })
        );

        f.session.record_damage(2, Some(5), DamageCause::Shell);
        assert_eq!(
            f.session.combatant_dies(2),
            Some(KillOutcome::Unattributed { victim: 2 })
        );
        assert!(f.script.calls.lock().unwrap().is_empty());
        assert_eq!(f.session.combatant_dies(42), None);
    }

    #[test]
    fn test_deathmatch_respawns_victim() {
        let recorder = Recorder::default();
        let mut session = MatchSession::builder(MatchSettings::default())
            .strategy(GameMode::Deathmatch.build_strategy(3, None))
            .hud(Box::new(recorder.clone()))
            .fader(Box::new(recorder.clone()))
            .replicator(Box::new(recorder))
            .spawns(Box::new(SpawnManager::ring(4, 100.0, 5).unwrap()))
            .build()
            .unwrap();
        session.add_combatant(combatant(0));
        session.add_combatant(combatant(1));

        session.record_damage(1, Some(0), DamageCause::Shell);
        session.combatant_dies(1);
        assert!(session.roster().get(1).unwrap().is_alive());
        assert_eq!(session.roster().get(0).unwrap().score(), 1);
        assert_eq!(session.roster().get(1).unwrap().last_damaged_by(), None);
    }

    fn deathmatch_session(target: i32, spawn_points: usize) -> MatchSession {
        let recorder = Recorder::default();
        MatchSession::builder(MatchSettings::default())
            .strategy(GameMode::Deathmatch.build_strategy(target, None))
            .hud(Box::new(recorder.clone()))
            .fader(Box::new(recorder.clone()))
            .replicator(Box::new(recorder))
            .spawns(Box::new(SpawnManager::ring(spawn_points, 100.0, 7).unwrap()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_respawns_keep_using_every_spawn_point() {
        let mut session = deathmatch_session(100, 4);
        session.add_combatant(combatant(0));
        session.add_combatant(combatant(1));

        let mut used = std::collections::HashSet::new();
        for respawn in 0..40 {
            session.record_damage(1, Some(0), DamageCause::Shell);
            session.combatant_dies(1);
            // Skip the first lap, which any reservation scheme covers
            if respawn >= 4 {
                used.insert(session.roster().get(1).unwrap().spawn().unwrap().index);
            }
        }

        // Reservations are released once the respawn lands
        assert_eq!(used.len(), 4);
    }

    #[test]
    fn test_deaths_after_match_decided_score_nothing() {
        let mut session = deathmatch_session(1, 4);
        session.add_combatant(combatant(0));
        session.add_combatant(combatant(1));

        session.record_damage(1, Some(0), DamageCause::Shell);
        session.combatant_dies(1);
        assert!(session.strategy().match_over());
        assert_eq!(session.strategy().winner(), Some(0));
        assert!(!session.roster().get(1).unwrap().is_alive());

        session.record_damage(0, Some(1), DamageCause::Shell);
        assert_eq!(
            session.combatant_dies(0),
            Some(KillOutcome::Kill { killer: 1, victim: 0 })
        );
        assert_eq!(session.roster().get(0).unwrap().score(), 1);
        assert_eq!(session.roster().get(1).unwrap().score(), 0);
        assert_eq!(session.strategy().winner(), Some(0));
    }

    #[test]
    fn test_add_remove_combatants() {
        let mut f = fixture();
        assert!(f.session.add_combatant(combatant(1)));
        assert!(!f.session.add_combatant(combatant(1)));
        assert_eq!(f.session.roster().len(), 1);
        assert_eq!(f.session.roster().get(1).unwrap().spawn().unwrap().index, 1);

        let removed = f.session.remove_combatant(1).unwrap();
        assert!(removed.is_removed());
        assert!(f.session.remove_combatant(1).is_none());
        assert!(f.session.roster().is_empty());
    }

    #[test]
    fn test_everyone_bailed_after_start() {
        let mut f = fixture();
        f.session.add_combatant(combatant(1));
        f.session.remove_combatant(1);
        // Nothing has started yet
        assert!(!f.session.everyone_bailed());

        f.session.add_combatant(combatant(1));
        f.session.begin();
        f.session.remove_combatant(1);
        assert!(f.session.everyone_bailed());
    }

    #[test]
    fn test_exit_game_destroys_all_and_closes() {
        let mut f = fixture();
        f.session
            .add_combatant(combatant(1).with_owner(Uuid::new_v4()));
        f.session.add_combatant(combatant(2));
        f.session.bail();

        assert!(f.session.is_closed());
        assert!(f.session.roster().is_empty());

        let entries = f.recorder.entries();
        assert!(entries.contains(&"destroy:Combatant { player: 1 }".to_string()));
        assert!(entries.contains(&"destroy:Combatant { player: 2 }".to_string()));
        assert_eq!(entries.last().unwrap(), "menu:Home");

        // Closed sessions ignore everything after
        f.session.complete_game();
        assert_eq!(
            f.recorder.entries().iter().filter(|e| e.starts_with("menu")).count(),
            1
        );
    }

    #[test]
    fn test_teardown_cancels_pending_fade() {
        let mut f = fixture();
        f.session.begin();
        f.session.tick(0.1);
        assert_eq!(f.session.phase(), MatchPhase::Inactive);

        f.session.exit_game(MenuPage::Home);
        for _ in 0..20 {
            f.session.tick(0.1);
        }
        assert_eq!(f.session.phase(), MatchPhase::Inactive);
    }

    #[test]
    fn test_mission_waits_in_preplay_until_confirmed() {
        let recorder = Recorder::default();
        let mut session = MatchSession::builder(MatchSettings::default())
            .strategy(GameMode::Mission.build_strategy(1, None))
            .hud(Box::new(recorder.clone()))
            .fader(Box::new(recorder.clone()))
            .replicator(Box::new(recorder))
            .spawns(Box::new(SpawnManager::ring(2, 10.0, 0).unwrap()))
            .build()
            .unwrap();
        session.add_combatant(combatant(1));
        session.begin();
        assert_eq!(tick_until_change(&mut session, 0.1), MatchPhase::Inactive);
        assert_eq!(tick_until_change(&mut session, 0.1), MatchPhase::PrePlay);

        for _ in 0..10 {
            session.tick(0.1);
        }
        assert_eq!(session.phase(), MatchPhase::PrePlay);

        session.confirm_start();
        session.tick(0.1);
        assert_eq!(session.phase(), MatchPhase::TimedTransition);
        assert_eq!(session.local_player(), Some(1));
    }
}
