//! Hosted match task and the registry of running matches

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MatchError, Result};
use crate::util::time::{tick_delta, tick_duration, END_GAME_TIME_SECS};
use crate::ws::protocol::{CombatantInfo, MatchStatus, ServerMsg};

use super::broadcast::{
    BroadcastControl, BroadcastCrateSpawner, BroadcastFader, BroadcastHazard, BroadcastHud,
    BroadcastReplicator,
};
use super::collaborators::EntityRef;
use super::combatant::{Combatant, PlayerNumber};
use super::environment::EntityId;
use super::orchestrator::{KillOutcome, MatchSession};
use super::phase::MatchPhase;
use super::settings::MatchSettings;
use super::spawn::SpawnManager;
use super::{DeathReport, JoinRequest, MatchCommand};

/// Network ids handed to map objects created with the match
const HAZARD_ID_BASE: EntityId = 1_000;
const SPAWNER_ID_BASE: EntityId = 2_000;

/// Cloneable handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub command_tx: mpsc::Sender<MatchCommand>,
    pub events_tx: broadcast::Sender<ServerMsg>,
    status: Arc<RwLock<MatchStatus>>,
}

impl MatchHandle {
    pub async fn send(&self, command: MatchCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| MatchError::MatchClosed)
    }

    /// Hand a combatant over to the match and wait for it to be placed
    pub async fn join(&self, request: JoinRequest) -> Result<CombatantInfo> {
        let (reply, rx) = oneshot::channel();
        self.send(MatchCommand::Join { request, reply }).await?;
        rx.await.map_err(|_| MatchError::MatchClosed)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }

    /// Status as of the last completed tick
    pub fn status(&self) -> MatchStatus {
        self.status.read().clone()
    }

    pub fn combatant_count(&self) -> usize {
        self.status.read().combatants.len()
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_combatants(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().combatant_count())
            .sum()
    }

    pub fn list(&self) -> Vec<MatchStatus> {
        let mut statuses: Vec<MatchStatus> =
            self.matches.iter().map(|m| m.value().status()).collect();
        statuses.sort_by_key(|s| s.started_at);
        statuses
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative match task
pub struct GameMatch {
    session: MatchSession,
    command_rx: mpsc::Receiver<MatchCommand>,
    events_tx: broadcast::Sender<ServerMsg>,
    status: Arc<RwLock<MatchStatus>>,
    tick_rate: u32,
    started_at: DateTime<Utc>,
    last_phase: MatchPhase,
    post_game_elapsed: f32,
}

impl GameMatch {
    /// Create a match with broadcast-backed collaborators and the map
    /// objects named in `settings`
    pub fn new(id: Uuid, settings: MatchSettings, tick_rate: u32) -> Result<(Self, MatchHandle)> {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(256);

        let spawns = SpawnManager::ring(settings.spawn_points, settings.spawn_radius, settings.seed)?;
        let strategy = settings
            .mode
            .build_strategy(settings.score_target, settings.local_player);

        let mut session = MatchSession::builder(settings.clone())
            .id(id)
            .strategy(strategy)
            .hud(Box::new(BroadcastHud::new(events_tx.clone())))
            .fader(Box::new(BroadcastFader::new(events_tx.clone())))
            .replicator(Box::new(BroadcastReplicator::new(events_tx.clone())))
            .spawns(Box::new(spawns))
            .build()?;

        for i in 0..settings.hazards {
            session.add_hazard(Box::new(BroadcastHazard::new(
                HAZARD_ID_BASE + i,
                events_tx.clone(),
            )));
        }
        for i in 0..settings.crate_spawners {
            session.add_crate_spawner(Box::new(BroadcastCrateSpawner::new(
                SPAWNER_ID_BASE + i,
                events_tx.clone(),
            )));
        }

        let started_at = Utc::now();
        let status = Arc::new(RwLock::new(build_status(&session, started_at)));

        let handle = MatchHandle {
            id,
            command_tx,
            events_tx: events_tx.clone(),
            status: status.clone(),
        };

        let game_match = Self {
            session,
            command_rx,
            events_tx,
            status,
            tick_rate,
            started_at,
            last_phase: MatchPhase::Inactive,
            post_game_elapsed: 0.0,
        };

        Ok((game_match, handle))
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    /// Leave `Inactive` and start the scene
    pub fn begin(&mut self) {
        self.session.begin();
        self.sync_phase();
    }

    /// Run the authoritative tick loop until the match is left
    pub async fn run(mut self) {
        info!(match_id = %self.session.id(), tick_rate = self.tick_rate, "Match task started");

        let dt = tick_delta(self.tick_rate);
        let mut tick_interval = interval(tick_duration(self.tick_rate));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.begin();

        loop {
            tick_interval.tick().await;

            self.step(dt);

            if self.session.is_closed() {
                info!(match_id = %self.session.id(), "Match closed");
                break;
            }

            if self.session.everyone_bailed() {
                info!(match_id = %self.session.id(), "All combatants left, ending match");
                let page = self.session.strategy().return_page();
                self.session.exit_game(page);
                self.publish_status();
                break;
            }
        }
    }

    /// One tick: drain commands, advance the session, publish what changed
    pub fn step(&mut self, dt: f32) {
        self.process_commands();

        self.session.tick(dt);
        self.sync_phase();

        if self.session.phase() == MatchPhase::PostGame && !self.session.is_closed() {
            self.post_game_elapsed += dt.max(0.0);
            if self.post_game_elapsed >= END_GAME_TIME_SECS {
                debug!(match_id = %self.session.id(), "End screen done, completing match");
                self.session.complete_game();
            }
        }

        self.publish_status();
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                MatchCommand::Join { request, reply } => {
                    let result = self.handle_join(request);
                    let _ = reply.send(result);
                }
                MatchCommand::Leave { player_number } => self.handle_leave(player_number),
                MatchCommand::Damage {
                    victim,
                    attacker,
                    cause,
                } => self.session.record_damage(victim, attacker, cause),
                MatchCommand::Death(report) => self.handle_death(report),
                MatchCommand::SpawnPickup(pickup) => {
                    let id = pickup.id;
                    if self.session.add_pickup(pickup) {
                        let _ = self.events_tx.send(ServerMsg::EntitySpawned {
                            entity: EntityRef::Pickup { id },
                        });
                    }
                }
                MatchCommand::ConfirmStart => self.session.confirm_start(),
                MatchCommand::Bail => self.session.bail(),
                MatchCommand::Complete => self.session.complete_game(),
                MatchCommand::Ping { t } => {
                    let _ = self.events_tx.send(ServerMsg::Pong { t });
                }
            }
        }
    }

    fn handle_join(&mut self, request: JoinRequest) -> Result<CombatantInfo> {
        if self.session.is_closed() {
            return Err(MatchError::MatchClosed);
        }
        if self.session.roster().contains(request.player_number) {
            return Err(MatchError::DuplicateCombatant(request.player_number));
        }
        if self.session.roster().len() >= self.session.settings().max_combatants {
            let _ = self.events_tx.send(ServerMsg::Error {
                code: "match_full".to_string(),
                message: "Match is full".to_string(),
            });
            return Err(MatchError::MatchFull);
        }

        let number = request.player_number;
        let control = BroadcastControl::new(number, self.events_tx.clone());
        let mut combatant = Combatant::new(number, request.name, request.color, Box::new(control));
        if let Some(owner) = request.owner {
            combatant = combatant.with_owner(owner);
        }

        if !self.session.add_combatant(combatant) {
            return Err(MatchError::DuplicateCombatant(number));
        }

        let info = self
            .session
            .roster()
            .get(number)
            .map(CombatantInfo::from)
            .ok_or(MatchError::MatchClosed)?;

        let _ = self.events_tx.send(ServerMsg::CombatantJoined {
            player: info.clone(),
        });
        Ok(info)
    }

    fn handle_leave(&mut self, player_number: PlayerNumber) {
        if self.session.remove_combatant(player_number).is_some() {
            let _ = self.events_tx.send(ServerMsg::CombatantLeft {
                player_number,
                reason: "disconnected".to_string(),
            });
        } else {
            warn!(match_id = %self.session.id(), player = player_number, "Leave for unknown combatant");
        }
    }

    fn handle_death(&mut self, report: DeathReport) {
        if let Some(cause) = report.cause {
            self.session
                .record_damage(report.victim, report.attacker, cause);
        }

        let msg = match self.session.combatant_dies(report.victim) {
            Some(KillOutcome::Kill { killer, victim }) => ServerMsg::Kill {
                killer: Some(killer),
                victim,
                suicide: false,
            },
            Some(KillOutcome::Suicide { player }) => ServerMsg::Kill {
                killer: Some(player),
                victim: player,
                suicide: true,
            },
            Some(KillOutcome::Unattributed { victim }) => ServerMsg::Kill {
                killer: None,
                victim,
                suicide: false,
            },
            None => return,
        };
        let _ = self.events_tx.send(msg);
    }

    /// Publish the phase change of the last tick, plus the round and match
    /// notices that hang off it
    fn sync_phase(&mut self) {
        let phase = self.session.phase();
        if phase == self.last_phase {
            return;
        }
        let previous = std::mem::replace(&mut self.last_phase, phase);

        let round = self.session.round();
        let _ = self.events_tx.send(ServerMsg::PhaseChanged { phase, round });

        let strategy = self.session.strategy();
        if previous == MatchPhase::PrePlay && phase == MatchPhase::TimedTransition {
            let _ = self.events_tx.send(ServerMsg::RoundStarting {
                round,
                message: strategy.round_message(),
            });
        }
        if previous == MatchPhase::RoundEnd {
            let _ = self.events_tx.send(ServerMsg::RoundEnded {
                round: self.session.rounds_played(),
                text: strategy.round_end_text(self.session.roster()),
            });
        }
        if phase == MatchPhase::PostGame {
            let _ = self.events_tx.send(ServerMsg::MatchEnd {
                winner: strategy.winner(),
                leaderboard: self.session.leaderboard(),
            });
        }
    }

    fn publish_status(&self) {
        *self.status.write() = build_status(&self.session, self.started_at);
    }
}

fn build_status(session: &MatchSession, started_at: DateTime<Utc>) -> MatchStatus {
    let pending = session.pending_transition();
    MatchStatus {
        match_id: session.id(),
        mode: session.settings().mode,
        map: session.settings().map.clone(),
        phase: session.phase(),
        next_phase: pending.map(|(next, _)| next),
        transition_remaining: pending.map(|(_, remaining)| remaining),
        round: session.round(),
        combatants: session.roster().iter().map(CombatantInfo::from).collect(),
        leaderboard: session.leaderboard(),
        match_over: session.strategy().match_over(),
        winner: session.strategy().winner(),
        everyone_bailed: session.everyone_bailed(),
        closed: session.is_closed(),
        started_at,
    }
}
