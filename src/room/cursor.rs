//! Cursor table — last known pointer position per connection.
//!
//! Entries are overwritten in place and removed on leave. Cursor positions
//! are never logged or persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ClientId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Default)]
pub struct CursorTable {
    cursors: HashMap<ClientId, Cursor>,
}

impl CursorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn update(&mut self, client_id: ClientId, x: f64, y: f64) {
        self.cursors.insert(client_id, Cursor { x, y });
    }

    pub fn remove(&mut self, client_id: ClientId) -> Option<Cursor> {
        self.cursors.remove(&client_id)
    }

    #[must_use]
    pub fn get(&self, client_id: ClientId) -> Option<Cursor> {
        self.cursors.get(&client_id).copied()
    }

    /// Full table keyed by client id, as sent in `cursor:state`.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<ClientId, Cursor> {
        self.cursors.clone()
    }
}
