//! Room actor — one Tokio task per room, fed by a bounded command queue.
//!
//! The task owns its `Room` outright; `RoomHandle` is the only way in.
//! Commands from one connection arrive in the order that connection sent
//! them, and commands from different connections are interleaved in queue
//! order. Nothing else can reach the room's state.

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::canvas::Operation;
use super::presence::User;
use super::{Room, RoomCommand, RoomError};

/// Cheap, cloneable sender side of a room actor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    key: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Queue a command. Waits only if the room's queue is full.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Closed` if the actor task has exited.
    pub async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RoomError::Closed(self.key.clone()))
    }

    /// Current members in join order.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Closed` if the actor task has exited.
    pub async fn user_list(&self) -> Result<Vec<User>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Users { reply }).await?;
        rx.await.map_err(|_| RoomError::Closed(self.key.clone()))
    }

    /// Active operation log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Closed` if the actor task has exited.
    pub async fn snapshot(&self) -> Result<Vec<Operation>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| RoomError::Closed(self.key.clone()))
    }
}

/// Hand `room` to a new actor task.
#[must_use]
pub fn spawn_room(mut room: Room, queue_capacity: usize) -> RoomHandle {
    let key = room.key().to_owned();
    let (tx, mut rx) = mpsc::channel::<RoomCommand>(queue_capacity);

    tokio::spawn(async move {
        info!(room = %room.key(), "room actor started");
        while let Some(command) = rx.recv().await {
            room.apply(command);
        }
        info!(room = %room.key(), "room actor stopped");
    });

    RoomHandle { key, tx }
}
