//! Broadcast fanout — outbound channels of a room's members.
//!
//! Delivery is best-effort `try_send`. A member whose channel is full or
//! closed misses that frame; everyone else still gets it, and the room actor
//! never waits on a slow socket.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;

use super::ClientId;
use crate::frame::Frame;

#[derive(Debug, Default)]
pub struct Fanout {
    members: HashMap<ClientId, mpsc::Sender<Frame>>,
}

impl Fanout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, client_id: ClientId, tx: mpsc::Sender<Frame>) {
        self.members.insert(client_id, tx);
    }

    pub fn remove(&mut self, client_id: ClientId) -> bool {
        self.members.remove(&client_id).is_some()
    }

    /// Send to one member. Returns whether the frame was queued.
    pub fn send_to(&self, client_id: ClientId, frame: Frame) -> bool {
        let Some(tx) = self.members.get(&client_id) else {
            return false;
        };
        deliver(client_id, tx, frame)
    }

    /// Send to every member, optionally excluding one. Returns how many
    /// members the frame was queued for.
    pub fn broadcast(&self, frame: &Frame, exclude: Option<ClientId>) -> usize {
        self.members
            .iter()
            .filter(|(client_id, _)| exclude != Some(**client_id))
            .filter(|(client_id, tx)| deliver(**client_id, tx, frame.clone()))
            .count()
    }
}

fn deliver(client_id: ClientId, tx: &mpsc::Sender<Frame>, frame: Frame) -> bool {
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(e) => {
            debug!(%client_id, error = %e, "fanout: dropped frame");
            false
        }
    }
}
