//! Room — the per-room aggregate and its event handlers.
//!
//! ARCHITECTURE
//! ============
//! Each room is owned by exactly one actor task (see `actor`). The actor
//! feeds `RoomCommand`s to `Room::apply` one at a time, so canvas, cursors,
//! presence and staging are only ever touched from one place. Handlers are
//! synchronous: they mutate state, then push frames through `Fanout`.
//!
//! PROTOCOL ERRORS
//! ===============
//! Commands from connections that are not members of the room, points and
//! ends for unknown strokes, and undo/redo with nothing to move are all
//! dropped without a reply.

pub mod actor;
pub mod canvas;
pub mod cursor;
pub mod fanout;
pub mod presence;
pub mod registry;
pub mod staging;

use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use canvas::{CanvasState, Operation, Point};
use cursor::CursorTable;
use fanout::Fanout;
use presence::{Presence, User};
use staging::{StrokeStaging, StrokeStyle, TempId};

/// Connection identity. Also the user id of whoever holds the connection.
pub type ClientId = Uuid;

/// Room key used when a join names no room.
pub const DEFAULT_ROOM: &str = "lobby";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("room actor closed: {0}")]
    Closed(String),
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Everything a room actor can be asked to do.
#[derive(Debug)]
pub enum RoomCommand {
    Join { user: User, tx: mpsc::Sender<Frame> },
    Leave { client_id: ClientId },
    Cursor { client_id: ClientId, x: f64, y: f64 },
    StrokeStart { client_id: ClientId, temp_id: TempId, style: StrokeStyle },
    StrokePoint { client_id: ClientId, temp_id: TempId, point: Point },
    StrokeEnd { client_id: ClientId, temp_id: TempId },
    Undo { client_id: ClientId },
    Redo { client_id: ClientId },
    Users { reply: oneshot::Sender<Vec<User>> },
    Snapshot { reply: oneshot::Sender<Vec<Operation>> },
}

// =============================================================================
// ROOM
// =============================================================================

pub struct Room {
    key: String,
    canvas: CanvasState,
    cursors: CursorTable,
    presence: Presence,
    staging: StrokeStaging,
    fanout: Fanout,
}

impl Room {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            canvas: CanvasState::new(),
            cursors: CursorTable::new(),
            presence: Presence::new(),
            staging: StrokeStaging::new(),
            fanout: Fanout::new(),
        }
    }

    /// Cap the points one open stroke may stage.
    #[must_use]
    pub fn with_max_stroke_points(mut self, max_points: usize) -> Self {
        self.staging = StrokeStaging::with_max_points(max_points);
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Apply one command. The only entry point that mutates the room.
    pub fn apply(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { user, tx } => self.join(user, tx),
            RoomCommand::Leave { client_id } => self.leave(client_id),
            RoomCommand::Cursor { client_id, x, y } => self.cursor(client_id, x, y),
            RoomCommand::StrokeStart { client_id, temp_id, style } => self.stroke_start(client_id, temp_id, style),
            RoomCommand::StrokePoint { client_id, temp_id, point } => self.stroke_point(client_id, temp_id, point),
            RoomCommand::StrokeEnd { client_id, temp_id } => self.stroke_end(client_id, temp_id),
            RoomCommand::Undo { client_id } => self.undo(client_id),
            RoomCommand::Redo { client_id } => self.redo(client_id),
            RoomCommand::Users { reply } => {
                let _ = reply.send(self.presence.user_list());
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.canvas.snapshot());
            }
        }
    }

    // =========================================================================
    // PRESENCE
    // =========================================================================

    fn join(&mut self, user: User, tx: mpsc::Sender<Frame>) {
        let client_id = user.id;
        self.presence.add_user(user);
        self.fanout.insert(client_id, tx);

        let users = self.presence.user_list();
        info!(room = %self.key, %client_id, members = users.len(), "room: user joined");

        let mut own = Data::new();
        own.insert("users".into(), to_json(&users));
        own.insert("selfId".into(), json!(client_id));
        self.fanout.send_to(client_id, self.event("presence:state", own));
        self.fanout.send_to(client_id, self.state_replace_frame());

        let mut others = Data::new();
        others.insert("users".into(), to_json(&users));
        self.fanout
            .broadcast(&self.event("presence:state", others), Some(client_id));
    }

    fn leave(&mut self, client_id: ClientId) {
        let was_member = self.presence.remove_user(client_id).is_some();
        self.cursors.remove(client_id);
        self.fanout.remove(client_id);
        if let Some(abandoned) = self.staging.discard(client_id) {
            info!(room = %self.key, %client_id, points = abandoned, "room: discarded unfinished stroke");
        }
        if !was_member {
            return;
        }

        info!(room = %self.key, %client_id, members = self.presence.len(), "room: user left");
        let mut data = Data::new();
        data.insert("users".into(), to_json(&self.presence.user_list()));
        self.fanout.broadcast(&self.event("presence:state", data), None);
    }

    fn cursor(&mut self, client_id: ClientId, x: f64, y: f64) {
        if !self.presence.contains(client_id) {
            return;
        }
        self.cursors.update(client_id, x, y);

        let mut data = Data::new();
        data.insert("cursors".into(), to_json(&self.cursors.snapshot()));
        data.insert("users".into(), to_json(&self.presence.user_list()));
        self.fanout.broadcast(&self.event("cursor:state", data), None);
    }

    // =========================================================================
    // STROKES
    // =========================================================================

    fn stroke_start(&mut self, client_id: ClientId, temp_id: TempId, style: StrokeStyle) {
        if !self.presence.contains(client_id) {
            return;
        }

        let mut data = Data::new();
        data.insert("userId".into(), json!(client_id));
        data.insert("tempId".into(), to_json(&temp_id));
        data.insert("color".into(), json!(style.color));
        data.insert("width".into(), json!(style.width));
        data.insert("mode".into(), json!(style.mode));
        self.fanout
            .broadcast(&self.event("stroke:remoteStart", data), Some(client_id));

        debug!(room = %self.key, %client_id, %temp_id, "room: stroke started");
        self.staging.start(client_id, temp_id, style);
    }

    fn stroke_point(&mut self, client_id: ClientId, temp_id: TempId, point: Point) {
        if !self.presence.contains(client_id) {
            return;
        }
        if self.staging.is_full(client_id, &temp_id) {
            debug!(room = %self.key, %client_id, %temp_id, "room: stroke point cap reached");
            return;
        }

        let mut data = Data::new();
        data.insert("userId".into(), json!(client_id));
        data.insert("tempId".into(), to_json(&temp_id));
        data.insert("x".into(), json!(point.x));
        data.insert("y".into(), json!(point.y));
        self.fanout
            .broadcast(&self.event("stroke:remotePoint", data), Some(client_id));

        self.staging.push_point(client_id, &temp_id, point);
    }

    fn stroke_end(&mut self, client_id: ClientId, temp_id: TempId) {
        if !self.presence.contains(client_id) {
            return;
        }

        let mut data = Data::new();
        data.insert("userId".into(), json!(client_id));
        data.insert("tempId".into(), to_json(&temp_id));
        self.fanout
            .broadcast(&self.event("stroke:remoteEnd", data), Some(client_id));

        let Some(stroke) = self.staging.finish(client_id, &temp_id) else {
            debug!(room = %self.key, %client_id, %temp_id, "room: end for unknown stroke");
            return;
        };

        let op = self.canvas.commit_op(stroke, client_id);
        info!(room = %self.key, %client_id, op_id = op.id, points = op.points.len(), "room: operation committed");

        let mut data = Data::new();
        data.insert("op".into(), to_json(&op));
        self.fanout.broadcast(&self.event("op:commit", data), None);
    }

    // =========================================================================
    // UNDO / REDO
    // =========================================================================

    fn undo(&mut self, client_id: ClientId) {
        if !self.presence.contains(client_id) || !self.canvas.undo() {
            return;
        }
        info!(room = %self.key, %client_id, ops = self.canvas.len(), redo = self.canvas.redo_depth(), "room: undo");
        self.replace_state();
    }

    fn redo(&mut self, client_id: ClientId) {
        if !self.presence.contains(client_id) || !self.canvas.redo() {
            return;
        }
        info!(room = %self.key, %client_id, ops = self.canvas.len(), redo = self.canvas.redo_depth(), "room: redo");
        self.replace_state();
    }

    /// Push the full active log to every member as an authoritative replace.
    fn replace_state(&self) {
        self.fanout.broadcast(&self.state_replace_frame(), None);
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn state_replace_frame(&self) -> Frame {
        let mut data = Data::new();
        data.insert("operations".into(), to_json(&self.canvas.snapshot()));
        self.event("state:replace", data)
    }

    fn event(&self, syscall: &str, data: Data) -> Frame {
        Frame::request(syscall, data).with_room(&self.key)
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "room: failed to serialize payload");
        serde_json::Value::Null
    })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
