// Session orchestration: spawning, lookup and teardown of session actors.

use crate::domain::tuning::Tuning;
use crate::domain::{Outbound, PlayerId};
use crate::use_cases::session::{Session, session_task};
use crate::use_cases::{GameEvent, SessionState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning session actors.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for inbound crew commands.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world snapshots.
    pub world_broadcast_capacity: usize,
    /// Capacity for broadcast gameplay events.
    pub event_broadcast_capacity: usize,
    /// Fixed physics step.
    pub tick_interval: Duration,
    /// A snapshot goes out every this many ticks.
    pub snapshot_every: u64,
    /// How long an ended session lingers before it is removed.
    pub teardown_grace: Duration,
    /// Fixed RNG seed; random per session when unset.
    pub seed: Option<u64>,
    pub tuning: Tuning,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    AlreadyExists,
    EmptyRoster,
}

// The live connection that currently owns a player id.
#[derive(Debug)]
struct PlayerConnection {
    token: u64,
    shutdown: Arc<Notify>,
}

/// Per-session channels and roster.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: Arc<str>,
    /// Sender for crew commands into the session actor.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world snapshots.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world snapshots.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Latest serialized snapshot, for lagging clients.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Broadcast sender for gameplay events (filtered per client).
    pub events_tx: broadcast::Sender<Outbound>,
    pub state_tx: watch::Sender<SessionState>,
    shutdown: Arc<Notify>,
    roster: Arc<HashSet<PlayerId>>,
    connections: Arc<Mutex<HashMap<PlayerId, PlayerConnection>>>,
}

impl SessionHandle {
    /// Roster members are crew; everyone else may only watch.
    pub fn is_crew(&self, player_id: PlayerId) -> bool {
        self.roster.contains(&player_id)
    }

    /// Claims the player slot for a new connection and signals the previous owner to close.
    pub async fn register_or_replace_player_connection(
        &self,
        player_id: PlayerId,
        token: u64,
    ) -> Arc<Notify> {
        let shutdown = Arc::new(Notify::new());
        let mut connections = self.connections.lock().await;
        let previous = connections.insert(
            player_id,
            PlayerConnection {
                token,
                shutdown: shutdown.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.shutdown.notify_one();
        }
        shutdown
    }

    /// Releases the slot if `token` still owns it. Returns true when it did.
    pub async fn unregister_player_connection_if_owner(
        &self,
        player_id: PlayerId,
        token: u64,
    ) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get(&player_id) {
            Some(conn) if conn.token == token => {
                connections.remove(&player_id);
                true
            }
            _ => false,
        }
    }
}

/// Thread-safe registry for active sessions.
pub struct SessionRegistry {
    settings: SessionSettings,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Starts a session for the roster and spawns its actor.
    pub async fn create_session(
        &self,
        session_id: String,
        roster: Vec<PlayerId>,
    ) -> Result<SessionHandle, SessionError> {
        let mut unique = HashSet::new();
        let roster: Vec<PlayerId> = roster.into_iter().filter(|id| unique.insert(*id)).collect();
        if roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(SessionError::AlreadyExists);
        }

        let (input_tx, input_rx) =
            mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (events_tx, _events_rx) =
            broadcast::channel::<Outbound>(self.settings.event_broadcast_capacity);
        let (state_tx, _state_rx) = watch::channel(SessionState::Starting);
        let shutdown = Arc::new(Notify::new());

        let session_id: Arc<str> = Arc::from(session_id);
        let seed = self.settings.seed.unwrap_or_else(rand::random);
        let session = Session::start(
            session_id.clone(),
            &roster,
            self.settings.tuning.clone(),
            seed,
            self.settings.snapshot_every,
        );

        tokio::spawn(session_task(
            session,
            input_rx,
            world_tx.clone(),
            events_tx.clone(),
            state_tx.clone(),
            self.settings.tick_interval,
            self.settings.teardown_grace,
            shutdown.clone(),
        ));

        let handle = SessionHandle {
            session_id: session_id.clone(),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            events_tx,
            state_tx,
            shutdown,
            roster: Arc::new(roster.into_iter().collect()),
            connections: Arc::new(Mutex::new(HashMap::new())),
        };

        sessions.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn get_session(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Removes the session and stops its actor if still running.
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(handle) => {
                handle.shutdown.notify_one();
                true
            }
            None => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Removes the session once it has ended and the teardown grace has elapsed.
    pub fn spawn_session_end_watcher(
        self: Arc<Self>,
        session_id: Arc<str>,
        mut state_rx: watch::Receiver<SessionState>,
    ) {
        let grace = self.settings.teardown_grace;
        tokio::spawn(async move {
            loop {
                if matches!(*state_rx.borrow_and_update(), SessionState::Ended { .. }) {
                    break;
                }
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
            tokio::time::sleep(grace).await;
            if self.remove_session(&session_id).await {
                info!(session_id = %session_id, "session torn down");
            }
        });
    }

    /// Stops every running session.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.write().await;
        for (session_id, handle) in sessions.drain() {
            handle.shutdown.notify_one();
            info!(session_id = %session_id, "session stopped");
        }
    }
}
