//! WebSocket handler — frame intake and room event delivery.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Frames from the joined room's actor → forward to client
//!
//! The handler never replies directly. Every outbound frame, including the
//! joiner's own initial state, comes back through the connection's channel
//! from the room actor, so a client sees events in room order. Old and new
//! rooms share that channel across a room switch, so frames stamped with any
//! room other than the current one are dropped before they reach the socket.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `clientId`
//! 2. `presence:join` → part previous room, join the named one
//! 3. Cursor, stroke and op frames → command to the current room
//! 4. Close → leave the current room (presence update, staging discarded)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::room::actor::RoomHandle;
use crate::room::canvas::Point;
use crate::room::presence::User;
use crate::room::registry::normalize_room_key;
use crate::room::staging::{DEFAULT_STROKE_COLOR, DEFAULT_STROKE_MODE, DEFAULT_STROKE_WIDTH, StrokeStyle, TempId};
use crate::room::{ClientId, RoomCommand};
use crate::state::AppState;

// =============================================================================
// SESSION
// =============================================================================

/// Per-connection state: identity, outbound channel, current room.
struct Session {
    client_id: ClientId,
    tx: mpsc::Sender<Frame>,
    room: Option<RoomHandle>,
}

impl Session {
    fn new(client_id: ClientId, tx: mpsc::Sender<Frame>) -> Self {
        Self { client_id, tx, room: None }
    }

    /// Whether an outbound frame may reach the client. Room events must come
    /// from the room the session is currently in; frames a previous room
    /// queued before it processed our leave are dropped.
    fn accepts(&self, frame: &Frame) -> bool {
        match (&frame.room, &self.room) {
            (None, _) => true,
            (Some(room), Some(current)) => room == current.key(),
            (Some(_), None) => false,
        }
    }

    /// Forward a command to the current room. Dropped before any join.
    async fn send(&self, command: RoomCommand) {
        let Some(room) = &self.room else {
            debug!(client_id = %self.client_id, "ws: command before join ignored");
            return;
        };
        if let Err(e) = room.send(command).await {
            warn!(client_id = %self.client_id, error = %e, "ws: room command dropped");
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for frames from the room actor.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);

    let welcome = Frame::request("session:connected", Data::new()).with_data("clientId", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");
    let mut session = Session::new(client_id, client_tx);

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => process_inbound_text(&state, &mut session, &text).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if !session.accepts(&frame) {
                    debug!(%client_id, room = ?frame.room, syscall = %frame.syscall, "ws: stale room frame dropped");
                } else if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    leave_current_room(&state, &mut session).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse one inbound text frame and route it by syscall prefix.
///
/// Kept apart from the socket so tests can drive dispatch with a plain
/// channel standing in for the connection.
async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(client_id = %session.client_id, error = %e, "ws: invalid inbound frame");
            return;
        }
    };
    let req = req.with_from(session.client_id.to_string());

    match req.prefix() {
        "presence" => handle_presence(state, session, &req).await,
        "cursor" | "stroke" | "op" => match room_command(session.client_id, &req) {
            Some(command) => session.send(command).await,
            None => debug!(client_id = %session.client_id, syscall = %req.syscall, "ws: frame ignored"),
        },
        _ => debug!(client_id = %session.client_id, syscall = %req.syscall, "ws: unknown syscall"),
    }
}

// =============================================================================
// PRESENCE
// =============================================================================

async fn handle_presence(state: &AppState, session: &mut Session, req: &Frame) {
    match req.op() {
        "join" => {
            let envelope_room = req.room.clone().map(serde_json::Value::String);
            let key = normalize_room_key(req.field("roomId").or(envelope_room.as_ref()));

            leave_current_room(state, session).await;

            let user = User::generate(session.client_id, req.str_field("name"));
            match state.rooms.add_user(&key, user, session.tx.clone()).await {
                Ok(handle) => session.room = Some(handle),
                Err(e) => warn!(client_id = %session.client_id, room = %key, error = %e, "ws: join failed"),
            }
        }
        "leave" => leave_current_room(state, session).await,
        op => debug!(client_id = %session.client_id, op, "ws: unknown presence op"),
    }
}

async fn leave_current_room(state: &AppState, session: &mut Session) {
    let Some(room) = session.room.take() else {
        return;
    };
    if let Err(e) = state.rooms.remove_user(room.key(), session.client_id).await {
        warn!(client_id = %session.client_id, room = %room.key(), error = %e, "ws: leave failed");
    }
}

// =============================================================================
// ROOM COMMANDS
// =============================================================================

/// Translate a cursor, stroke or op frame into a room command. `None` when
/// the frame is malformed or names an unknown op.
fn room_command(client_id: ClientId, req: &Frame) -> Option<RoomCommand> {
    match (req.prefix(), req.op()) {
        ("cursor", "update") => {
            let (x, y) = (req.f64_field("x")?, req.f64_field("y")?);
            Some(RoomCommand::Cursor { client_id, x, y })
        }
        ("stroke", "start") => {
            let temp_id = temp_id(req)?;
            let style = StrokeStyle {
                color: req.str_field("color").unwrap_or(DEFAULT_STROKE_COLOR).to_string(),
                width: req.f64_field("width").unwrap_or(DEFAULT_STROKE_WIDTH),
                mode: req.str_field("mode").unwrap_or(DEFAULT_STROKE_MODE).to_string(),
            };
            Some(RoomCommand::StrokeStart { client_id, temp_id, style })
        }
        ("stroke", "point") => {
            let temp_id = temp_id(req)?;
            let point = Point { x: req.f64_field("x")?, y: req.f64_field("y")? };
            Some(RoomCommand::StrokePoint { client_id, temp_id, point })
        }
        ("stroke", "end") => Some(RoomCommand::StrokeEnd { client_id, temp_id: temp_id(req)? }),
        ("op", "undo") => Some(RoomCommand::Undo { client_id }),
        ("op", "redo") => Some(RoomCommand::Redo { client_id }),
        _ => None,
    }
}

fn temp_id(req: &Frame) -> Option<TempId> {
    req.field("tempId").and_then(TempId::from_value)
}

// =============================================================================
// OUTBOUND
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
