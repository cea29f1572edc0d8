// Session controller and the actor task that drives it.

use super::types::{Command, GameEvent, SessionState, WorldUpdate};
use crate::domain::events::{PlayerSummary, SessionEvent, SessionOutcome, SessionSummary};
use crate::domain::systems::{collision, crew, physics, progression, spawning, weapons};
use crate::domain::tuning::Tuning;
use crate::domain::{
    HostileSnapshot, Outbound, PickupSnapshot, PlayerId, PlayerSnapshot, ProjectileSnapshot,
    VehicleSnapshot, World,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct ScheduledReload {
    player_id: PlayerId,
    due: Duration,
}

/// Owns one session's world plus the clocks and timers around it.
///
/// Everything here is synchronous; [`session_task`] feeds it commands and ticks
/// from a single task so no locking is needed.
pub struct Session {
    session_id: Arc<str>,
    world: World,

    // Wall clock since start. Keeps running while paused.
    clock: Duration,
    tick: u64,
    snapshot_every: u64,

    // Cadence accumulators; only advance while the simulation runs.
    since_spawn: Duration,
    since_difficulty: Duration,

    reloads: Vec<ScheduledReload>,
    ended: Option<SessionSummary>,
}

impl Session {
    /// Starts a session with one crew member per roster id.
    pub fn start(
        session_id: Arc<str>,
        roster: &[PlayerId],
        tuning: Tuning,
        seed: u64,
        snapshot_every: u64,
    ) -> Self {
        let mut world = World::new(tuning, seed);
        world.spawn_crew(roster);
        info!(
            session_id = %session_id,
            players = roster.len(),
            vehicles = world.store.vehicles.len(),
            "session started"
        );

        Self {
            session_id,
            world,
            clock: Duration::ZERO,
            tick: 0,
            snapshot_every: snapshot_every.max(1),
            since_spawn: Duration::ZERO,
            since_difficulty: Duration::ZERO,
            reloads: Vec::new(),
            ended: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_paused(&self) -> bool {
        self.world.pause.is_paused()
    }

    pub fn ended(&self) -> Option<&SessionSummary> {
        self.ended.as_ref()
    }

    pub fn apply(&mut self, event: GameEvent) {
        match event {
            GameEvent::Command { player_id, command } => self.handle_command(player_id, command),
            GameEvent::Disconnect { player_id } => self.disconnect(player_id),
            GameEvent::Resync { player_id } => self.resync(player_id),
        }
    }

    /// Re-sends a pending ability offer to a player's new connection.
    pub fn resync(&mut self, player_id: PlayerId) {
        if self.ended.is_some() {
            return;
        }
        if progression::resend_offer(&mut self.world, player_id) {
            debug!(session_id = %self.session_id, player_id, "pending offer resent");
        }
    }

    /// Applies one crew command. Invalid commands are dropped and only logged.
    pub fn handle_command(&mut self, player_id: PlayerId, command: Command) {
        if self.ended.is_some() {
            return;
        }

        let world = &mut self.world;
        let result = match command {
            Command::Fire { dir_x, dir_y } => {
                weapons::fire(world, player_id, dir_x, dir_y).map(|outcome| match outcome {
                    weapons::FireOutcome::Fired { reload_ms, .. } => reload_ms,
                    weapons::FireOutcome::ReloadStarted { duration_ms } => Some(duration_ms),
                })
            }
            Command::Reload => weapons::request_reload(world, player_id).map(Some),
            Command::Revive { target_player_id } => {
                crew::revive(world, player_id, target_player_id).map(|()| None)
            }
            Command::Aim { angle } => crew::aim(world, player_id, angle).map(|()| None),
            Command::ChooseAbility { ability } => {
                progression::choose_ability(world, player_id, ability).map(|_| None)
            }
        };

        match result {
            Ok(Some(duration_ms)) => self.schedule_reload(player_id, duration_ms),
            Ok(None) => {}
            Err(rejection) => {
                debug!(
                    session_id = %self.session_id,
                    player_id,
                    reason = rejection.as_str(),
                    "command dropped"
                );
            }
        }
        self.check_end();
    }

    /// Roster disconnect notification: the player dies and any owed choice is released.
    pub fn disconnect(&mut self, player_id: PlayerId) {
        if self.ended.is_some() {
            return;
        }
        if crew::disconnect(&mut self.world, player_id) {
            info!(session_id = %self.session_id, player_id, "crew member disconnected");
        }
        self.check_end();
    }

    fn schedule_reload(&mut self, player_id: PlayerId, duration_ms: u64) {
        self.reloads.push(ScheduledReload {
            player_id,
            due: self.clock + Duration::from_millis(duration_ms),
        });
    }

    /// Advances the wall clock by one step and, unless paused, the simulation.
    pub fn advance(&mut self, dt: Duration) {
        if self.ended.is_some() {
            return;
        }
        self.clock += dt;
        self.tick += 1;

        self.finish_due_reloads();

        if !self.world.pause.is_paused() {
            self.world.sim_time += dt;
            let poison = physics::integrate(&mut self.world, dt.as_secs_f32());
            collision::resolve(&mut self.world, poison);
            self.run_cadences(dt);
        }

        self.check_end();
    }

    // Reload completions follow the wall clock, so they land even during a pause.
    fn finish_due_reloads(&mut self) {
        let clock = self.clock;
        let (due, pending): (Vec<_>, Vec<_>) =
            self.reloads.drain(..).partition(|reload| reload.due <= clock);
        self.reloads = pending;
        for reload in due {
            weapons::finish_reload(&mut self.world, reload.player_id);
        }
    }

    fn run_cadences(&mut self, dt: Duration) {
        // A level-up during this step's collisions may already have paused us.
        if self.world.pause.is_paused() {
            return;
        }
        let hostile = self.world.tuning.hostile;

        self.since_spawn += dt;
        let spawn_interval = Duration::from_millis(hostile.spawn_interval_ms);
        if self.since_spawn >= spawn_interval {
            self.since_spawn -= spawn_interval;
            spawning::spawn_wave(&mut self.world);
        }

        self.since_difficulty += dt;
        let difficulty_interval = Duration::from_millis(hostile.difficulty_interval_ms);
        if self.since_difficulty >= difficulty_interval {
            self.since_difficulty -= difficulty_interval;
            let difficulty = spawning::raise_difficulty(&mut self.world);
            info!(session_id = %self.session_id, difficulty, "difficulty increased");
        }
    }

    fn check_end(&mut self) {
        if self.ended.is_some() {
            return;
        }
        let outcome = if self.world.store.all_vehicles_destroyed() {
            SessionOutcome::Defeat
        } else if self.world.store.all_players_disconnected() {
            SessionOutcome::Abandoned
        } else {
            return;
        };

        let summary = self.summary(outcome);
        info!(
            session_id = %self.session_id,
            ?outcome,
            elapsed_ms = summary.elapsed_ms,
            kills = summary.kills,
            "session ended"
        );
        self.world.events.broadcast(SessionEvent::SessionEnded {
            summary: summary.clone(),
        });
        self.ended = Some(summary);
    }

    fn summary(&self, outcome: SessionOutcome) -> SessionSummary {
        SessionSummary {
            outcome,
            elapsed_ms: self.clock.as_millis() as u64,
            difficulty: self.world.difficulty,
            kills: self.world.kills,
            players: self
                .world
                .store
                .players
                .values()
                .map(|p| PlayerSummary {
                    player_id: p.id,
                    level: p.level,
                    kills: p.kills,
                })
                .collect(),
        }
    }

    /// True on ticks where a snapshot should go out.
    pub fn snapshot_due(&self) -> bool {
        self.tick % self.snapshot_every == 0
    }

    pub fn snapshot(&self) -> WorldUpdate {
        let store = &self.world.store;
        WorldUpdate {
            tick: self.tick,
            elapsed_ms: self.clock.as_millis() as u64,
            paused: self.world.pause.is_paused(),
            pending: self.world.pause.pending(),
            difficulty: self.world.difficulty,
            vehicles: store.vehicles.values().map(VehicleSnapshot::from).collect(),
            players: store.players.values().map(PlayerSnapshot::from).collect(),
            hostiles: store.hostiles.values().map(HostileSnapshot::from).collect(),
            pickups: store.pickups.values().map(PickupSnapshot::from).collect(),
            projectiles: store
                .projectiles
                .values()
                .map(ProjectileSnapshot::from)
                .collect(),
        }
    }

    /// Takes the events produced since the last drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<Outbound> {
        self.world.events.drain()
    }
}

/// Single actor for one session: commands and ticks are applied in arrival order.
#[allow(clippy::too_many_arguments)]
pub async fn session_task(
    mut session: Session,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    events_tx: broadcast::Sender<Outbound>,
    state_tx: watch::Sender<SessionState>,
    tick_interval: Duration,
    teardown_grace: Duration,
    shutdown: Arc<Notify>,
) {
    let session_id = session.session_id.clone();
    let _ = state_tx.send(SessionState::Running);
    let _ = world_tx.send(session.snapshot());

    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!(session_id = %session_id, "session shut down");
                return;
            }
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!(session_id = %session_id, "input channel closed; session exiting");
                    return;
                };
                session.apply(event);
            }
            _ = interval.tick() => {
                session.advance(tick_interval);
                if session.snapshot_due() {
                    let _ = world_tx.send(session.snapshot());
                }
            }
        }

        for outbound in session.drain_events() {
            // No receivers just means nobody is connected right now.
            let _ = events_tx.send(outbound);
        }

        if let Some(summary) = session.ended() {
            let _ = world_tx.send(session.snapshot());
            let _ = state_tx.send(SessionState::Ended {
                summary: summary.clone(),
            });
            break;
        }
    }

    // Keep accepting (and discarding) input so in-flight sends do not fail
    // while clients receive the final events.
    let grace = tokio::time::sleep(teardown_grace);
    tokio::pin!(grace);
    loop {
        tokio::select! {
            _ = &mut grace => break,
            _ = shutdown.notified() => break,
            event = input_rx.recv() => {
                if event.is_none() {
                    break;
                }
            }
        }
    }
    debug!(session_id = %session_id, "session task exited");
}
