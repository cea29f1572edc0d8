use crate::domain::geometry::wrap_angle;
use crate::domain::{AbilityId, Outbound, PlayerId};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, EventDto, ServerMessage, WorldUpdateDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{Command, GameEvent, SessionHandle, SessionState, WorldUpdate};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    EventsClosed,
    SessionStateClosed,
    JoinRequired,
    JoinTimeout,
    InvalidPlayerId,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct SessionQuery {
    // The session the client wants to attach to.
    #[serde(default)]
    session_id: Option<String>,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_MESSAGES: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serializes each snapshot once and fans the shared bytes out to every connection.
pub async fn world_update_serializer(
    session_id: Arc<str>,
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        let update = match world_rx.recv().await {
            Ok(update) => update,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(session_id = %session_id, missed = n, "snapshot serializer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(session_id = %session_id, "snapshot channel closed; serializer exiting");
                break;
            }
        };

        let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
        let bytes = match serde_json::to_string(&msg) {
            Ok(txt) => Utf8Bytes::from(txt),
            Err(e) => {
                error!(session_id = %session_id, error = ?e, "failed to serialize snapshot");
                continue;
            }
        };
        let _ = world_latest_tx.send(bytes.clone());
        let _ = world_bytes_tx.send(bytes);
    }
}

pub fn spawn_session_serializer(session: &SessionHandle) {
    tokio::spawn(world_update_serializer(
        session.session_id.clone(),
        session.world_tx.subscribe(),
        session.world_bytes_tx.clone(),
        session.world_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("session_id is required")),
        )
            .into_response();
    };

    let Some(session) = state.session_registry.get_session(session_id.trim()).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("session not found")),
        )
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

async fn handle_socket(socket: WebSocket, session: SessionHandle) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = rand_id();
    let span = info_span!(
        "conn",
        conn_id,
        session_id = %session.session_id,
        player_id = tracing::field::Empty
    );
    serve_connection(socket, session).instrument(span).await;
}

async fn serve_connection(mut socket: WebSocket, session: SessionHandle) {
    let mut ctx = match bootstrap_connection(&mut socket, &session).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    tracing::Span::current().record("player_id", ctx.player_id);
    info!(player_id = ctx.player_id, crew = ctx.crew, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

#[derive(Debug, Default)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_messages: u32,
    lag_recoveries: u64,
}

impl ConnStats {
    fn sent(&mut self, bytes: usize) {
        self.msgs_out += 1;
        self.bytes_out += bytes as u64;
    }
}

// Last time each noisy warning was logged for this connection.
struct LogThrottle {
    input_full: Instant,
    lagged: Instant,
    invalid: Instant,
}

impl LogThrottle {
    fn new() -> Self {
        let past = Instant::now() - LOG_THROTTLE;
        Self {
            input_full: past,
            lagged: past,
            invalid: past,
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

struct ConnCtx {
    player_id: PlayerId,
    // Roster members control the crew; everyone else only watches.
    crew: bool,
    session: SessionHandle,
    // Token used to verify ownership of the player slot on cleanup.
    conn_token: u64,
    // Fired when a newer connection for the same player takes over.
    conn_shutdown: Arc<Notify>,
    world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    events_rx: broadcast::Receiver<Outbound>,
    state_rx: watch::Receiver<SessionState>,
    stats: ConnStats,
    throttle: LogThrottle,
    close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    session: &SessionHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe before awaiting anything so nothing published during the handshake is missed.
    let world_bytes_rx = session.world_bytes_tx.subscribe();
    let world_latest_rx = session.world_latest_tx.subscribe();
    let events_rx = session.events_tx.subscribe();
    let state_rx = session.state_tx.subscribe();

    let (player_id, bytes_in) = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket))
        .await
    {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let conn_token = rand_id();
    let conn_shutdown = session
        .register_or_replace_player_connection(player_id, conn_token)
        .await;
    let crew = session.is_crew(player_id);

    let mut stats = ConnStats {
        msgs_in: 1,
        bytes_in,
        ..ConnStats::default()
    };

    let identity = ServerMessage::Identity {
        player_id: player_id.to_string(),
        crew,
    };
    let initial_state = state_rx.borrow().clone();
    let state_msg = ServerMessage::SessionState(initial_state.into());
    for msg in [&identity, &state_msg] {
        match send_message(socket, msg).await {
            Ok(bytes) => stats.sent(bytes),
            Err(err) => {
                session
                    .unregister_player_connection_if_owner(player_id, conn_token)
                    .await;
                return Err(err);
            }
        }
    }

    // Late joiners get the current world right away instead of waiting a cadence.
    let latest = world_latest_rx.borrow().clone();
    if !latest.is_empty() {
        let bytes = latest.len();
        if let Err(err) = socket.send(Message::Text(latest)).await {
            session
                .unregister_player_connection_if_owner(player_id, conn_token)
                .await;
            return Err(NetError::Ws(err));
        }
        stats.sent(bytes);
    }

    // An offer sent to an earlier connection would otherwise never reach this one.
    // `events_rx` is already subscribed, so the resent offer is not missed.
    if crew
        && session
            .input_tx
            .send(GameEvent::Resync { player_id })
            .await
            .is_err()
    {
        debug!(player_id, "session input closed; skipping resync");
    }

    Ok(ConnCtx {
        player_id,
        crew,
        session: session.clone(),
        conn_token,
        conn_shutdown,
        world_bytes_rx,
        world_latest_rx,
        events_rx,
        state_rx,
        stats,
        throttle: LogThrottle::new(),
        close_frame: None,
    })
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<(PlayerId, u64), NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) | Err(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let Ok(player_id) = payload.player_id.trim().parse::<PlayerId>() else {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid player id")
                            .await;
                    return Err(NetError::InvalidPlayerId);
                };
                return Ok((player_id, bytes_in));
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

/// Turns a client message into a session command, normalizing what the simulation
/// expects. Returns `None` for values no command can carry.
fn sanitize_command(msg: ClientMessage) -> Option<Command> {
    match msg {
        ClientMessage::Join(_) => None,
        ClientMessage::Fire { dir_x, dir_y } => {
            let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
            if !len.is_finite() || len <= f32::EPSILON {
                return None;
            }
            Some(Command::Fire {
                dir_x: dir_x / len,
                dir_y: dir_y / len,
            })
        }
        ClientMessage::ReloadRequest => Some(Command::Reload),
        ClientMessage::ReviveRequest { target_player_id } => {
            let target_player_id = target_player_id.trim().parse().ok()?;
            Some(Command::Revive { target_player_id })
        }
        ClientMessage::AimUpdate { angle } => angle.is_finite().then(|| Command::Aim {
            angle: wrap_angle(angle),
        }),
        ClientMessage::AbilityChoice { ability_id } => {
            let ability = ability_id.trim().parse::<AbilityId>().ok()?;
            Some(Command::ChooseAbility { ability })
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let crew = ctx.crew;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        session,
        conn_token,
        conn_shutdown,
        world_bytes_rx,
        world_latest_rx,
        events_rx,
        state_rx,
        stats,
        throttle,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let control = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    crew,
                    &session.input_tx,
                    stats,
                    throttle,
                    close_frame,
                ) {
                    Ok(control) => control,
                    Err(e) => {
                        fatal = Some(e);
                        LoopControl::Disconnect
                    }
                }
            }

            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => forward_text(bytes, socket, stats).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut throttle.lagged) {
                            warn!(missed = n, "snapshots lagged; sending latest");
                        }
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            LoopControl::Continue
                        } else {
                            stats.lag_recoveries += 1;
                            forward_text(latest, socket, stats).await
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        LoopControl::Disconnect
                    }
                }
            }

            event = events_rx.recv() => {
                match event {
                    Ok(outbound) if outbound.to.includes(player_id) => {
                        let msg = ServerMessage::Event(EventDto::from(&outbound.event));
                        forward_message(&msg, socket, stats).await
                    }
                    Ok(_) => LoopControl::Continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Events are not replayable; the next snapshot resyncs the client.
                        if should_log(&mut throttle.lagged) {
                            warn!(missed = n, "events lagged; dropping");
                        }
                        LoopControl::Continue
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::EventsClosed);
                        LoopControl::Disconnect
                    }
                }
            }

            changed = state_rx.changed() => {
                match changed {
                    Ok(()) => {
                        let state = state_rx.borrow_and_update().clone();
                        let ended = matches!(state, SessionState::Ended { .. });
                        let msg = ServerMessage::SessionState(state.into());
                        match forward_message(&msg, socket, stats).await {
                            LoopControl::Continue if ended => {
                                *close_frame = Some(CloseFrame {
                                    code: close_code::NORMAL,
                                    reason: "session ended".into(),
                                });
                                LoopControl::Disconnect
                            }
                            control => control,
                        }
                    }
                    Err(_) => {
                        fatal = Some(NetError::SessionStateClosed);
                        LoopControl::Disconnect
                    }
                }
            }

            _ = conn_shutdown.notified() => {
                *close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                });
                info!(player_id, "connection replaced by newer connection");
                LoopControl::Disconnect
            }
        };

        if let LoopControl::Disconnect = control {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(player_id, crew, session, *conn_token, stats).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: PlayerId,
    crew: bool,
    input_tx: &mpsc::Sender<GameEvent>,
    stats: &mut ConnStats,
    throttle: &mut LogThrottle,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    let msg = match incoming {
        Some(Ok(msg)) => msg,
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            return Ok(LoopControl::Disconnect);
        }
        None => {
            info!(player_id, "websocket closed");
            return Ok(LoopControl::Disconnect);
        }
    };

    let text = match msg {
        Message::Text(text) => text,
        Message::Binary(_) => {
            *close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            return Ok(LoopControl::Disconnect);
        }
        Message::Ping(_) | Message::Pong(_) => return Ok(LoopControl::Continue),
        Message::Close(_) => return Ok(LoopControl::Disconnect),
    };

    stats.msgs_in += 1;
    stats.bytes_in += text.len() as u64;

    let parsed = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(parsed) => parsed,
        Err(parse_err) => {
            stats.invalid_messages += 1;
            if should_log(&mut throttle.invalid) {
                warn!(
                    player_id,
                    bytes = text.len(),
                    error = %parse_err,
                    "failed to parse client message"
                );
            }
            if stats.invalid_messages > MAX_INVALID_MESSAGES {
                *close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "too many invalid messages".into(),
                });
                return Ok(LoopControl::Disconnect);
            }
            return Ok(LoopControl::Continue);
        }
    };

    if let ClientMessage::Join(_) = parsed {
        debug!(player_id, "duplicate join ignored");
        return Ok(LoopControl::Continue);
    }
    if !crew {
        debug!(player_id, "spectator command ignored");
        return Ok(LoopControl::Continue);
    }

    let Some(command) = sanitize_command(parsed) else {
        if should_log(&mut throttle.invalid) {
            warn!(player_id, "unusable command values; dropping");
        }
        return Ok(LoopControl::Continue);
    };

    match input_tx.try_send(GameEvent::Command { player_id, command }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_)) => {
            if should_log(&mut throttle.input_full) {
                warn!(player_id, "input channel full; dropping command");
            }
            Ok(LoopControl::Continue)
        }
        // The session actor is gone (ended and torn down).
        Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::InputClosed),
    }
}

async fn forward_text(text: Utf8Bytes, socket: &mut WebSocket, stats: &mut ConnStats) -> LoopControl {
    let bytes = text.len();
    match socket.send(Message::Text(text)).await {
        Ok(()) => {
            stats.sent(bytes);
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn forward_message(
    msg: &ServerMessage,
    socket: &mut WebSocket,
    stats: &mut ConnStats,
) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            stats.sent(bytes);
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(
    player_id: PlayerId,
    crew: bool,
    session: &SessionHandle,
    conn_token: u64,
    stats: &ConnStats,
) -> Result<(), NetError> {
    // A replaced connection no longer speaks for the player.
    let owner = session
        .unregister_player_connection_if_owner(player_id, conn_token)
        .await;

    let result = if crew && owner {
        session
            .input_tx
            .send(GameEvent::Disconnect { player_id })
            .await
            .map_err(|_| NetError::InputClosed)
    } else {
        Ok(())
    };

    debug!(
        player_id,
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_messages = stats.invalid_messages,
        lag_recoveries = stats.lag_recoveries,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_fire_direction_is_long_then_it_is_normalized() {
        let command = sanitize_command(ClientMessage::Fire {
            dir_x: 3.0,
            dir_y: 4.0,
        });
        match command {
            Some(Command::Fire { dir_x, dir_y }) => {
                assert!((dir_x - 0.6).abs() < 1e-6);
                assert!((dir_y - 0.8).abs() < 1e-6);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn when_values_are_unusable_then_command_is_dropped() {
        assert!(
            sanitize_command(ClientMessage::Fire {
                dir_x: 0.0,
                dir_y: 0.0
            })
            .is_none()
        );
        assert!(sanitize_command(ClientMessage::AimUpdate { angle: f32::INFINITY }).is_none());
        assert!(
            sanitize_command(ClientMessage::AbilityChoice {
                ability_id: "teleport".to_string()
            })
            .is_none()
        );
        assert!(
            sanitize_command(ClientMessage::ReviveRequest {
                target_player_id: "abc".to_string()
            })
            .is_none()
        );
    }

    #[test]
    fn when_ability_id_is_known_then_choice_is_forwarded() {
        assert_eq!(
            sanitize_command(ClientMessage::AbilityChoice {
                ability_id: "multi_shot".to_string()
            }),
            Some(Command::ChooseAbility {
                ability: AbilityId::MultiShot
            })
        );
    }
}
