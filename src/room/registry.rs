//! Room registry — lazily created rooms keyed by room string.
//!
//! DESIGN
//! ======
//! The registry maps room keys to actor handles behind a Tokio `RwLock`.
//! Lookups take the read lock; creation re-checks under the write lock so two
//! first joins racing on the same key end up in the same room. Rooms are
//! never evicted: an empty room keeps its history for the next joiner.
//!
//! Membership changes are not done here. `add_user` and `remove_user` only
//! route a command to the right actor, which owns the user set.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::info;

use super::actor::{RoomHandle, spawn_room};
use super::canvas::Operation;
use super::presence::User;
use super::staging::DEFAULT_MAX_STROKE_POINTS;
use super::{ClientId, DEFAULT_ROOM, Room, RoomCommand, RoomError};
use crate::frame::Frame;

#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    queue_capacity: usize,
    max_stroke_points: usize,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            queue_capacity,
            max_stroke_points: DEFAULT_MAX_STROKE_POINTS,
        }
    }

    /// Point cap for open strokes in rooms created from here on.
    #[must_use]
    pub fn with_max_stroke_points(mut self, max_stroke_points: usize) -> Self {
        self.max_stroke_points = max_stroke_points;
        self
    }

    /// Existing room for `key`, or a freshly spawned empty one.
    pub async fn ensure(&self, key: &str) -> RoomHandle {
        if let Some(handle) = self.rooms.read().await.get(key) {
            return handle.clone();
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(key.to_owned())
            .or_insert_with(|| {
                info!(room = %key, "registry: room created");
                let room = Room::new(key).with_max_stroke_points(self.max_stroke_points);
                spawn_room(room, self.queue_capacity)
            })
            .clone()
    }

    /// Lookup without creating.
    pub async fn get(&self, key: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(key).cloned()
    }

    /// Join `user` to the room at `key`, creating the room if needed.
    /// Frames for the user are delivered on `tx`.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Closed` if the room's actor is gone.
    pub async fn add_user(&self, key: &str, user: User, tx: mpsc::Sender<Frame>) -> Result<RoomHandle, RoomError> {
        let handle = self.ensure(key).await;
        handle.send(RoomCommand::Join { user, tx }).await?;
        Ok(handle)
    }

    /// Remove a member. Unknown rooms and non-members are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Closed` if the room's actor is gone.
    pub async fn remove_user(&self, key: &str, client_id: ClientId) -> Result<(), RoomError> {
        let Some(handle) = self.get(key).await else {
            return Ok(());
        };
        handle.send(RoomCommand::Leave { client_id }).await
    }

    /// Members of an existing room in join order.
    ///
    /// # Errors
    ///
    /// `RoomError::NotFound` for a key that was never referenced.
    pub async fn user_list(&self, key: &str) -> Result<Vec<User>, RoomError> {
        let handle = self.get(key).await.ok_or_else(|| RoomError::NotFound(key.to_owned()))?;
        handle.user_list().await
    }

    /// Active operation log of an existing room.
    ///
    /// # Errors
    ///
    /// `RoomError::NotFound` for a key that was never referenced.
    pub async fn snapshot(&self, key: &str) -> Result<Vec<Operation>, RoomError> {
        let handle = self.get(key).await.ok_or_else(|| RoomError::NotFound(key.to_owned()))?;
        handle.snapshot().await
    }
}

/// Room key carried by a join. Strings are trimmed, numbers stringified;
/// anything else, or an empty result, is the default room.
#[must_use]
pub fn normalize_room_key(raw: Option<&Value>) -> String {
    let key = match raw {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if key.is_empty() { DEFAULT_ROOM.to_owned() } else { key }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
