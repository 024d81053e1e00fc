//! Presence — who is in a room, and what they look like.
//!
//! DESIGN
//! ======
//! Identity is ephemeral: the user id is the connection id, the display
//! name comes from the join request, and the color is drawn from a fixed
//! palette at join. Nothing here outlives the connection.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ClientId;

pub const DEFAULT_USER_NAME: &str = "Anonymous";

/// Presence colors handed out at join.
pub const PALETTE: [&str; 9] = [
    "#ef4444", "#f59e0b", "#10b981", "#3b82f6", "#a855f7", "#ec4899", "#22c55e", "#eab308", "#06b6d4",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: ClientId,
    pub name: String,
    pub color: String,
}

impl User {
    /// Build the identity for a joining connection. A missing or blank name
    /// becomes `Anonymous`.
    #[must_use]
    pub fn generate(id: ClientId, name: Option<&str>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_USER_NAME);
        Self { id, name: name.to_owned(), color: random_color().to_owned() }
    }
}

fn random_color() -> &'static str {
    PALETTE[rand::rng().random_range(0..PALETTE.len())]
}

/// Room membership in join order.
#[derive(Debug, Default)]
pub struct Presence {
    users: Vec<User>,
}

impl Presence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. A user already present under the same id is replaced in
    /// place, keeping its join position.
    pub fn add_user(&mut self, user: User) {
        if let Some(existing) = self.users.iter_mut().find(|u| u.id == user.id) {
            *existing = user;
        } else {
            self.users.push(user);
        }
    }

    /// Remove a user. Returns the removed user, `None` for a non-member.
    pub fn remove_user(&mut self, id: ClientId) -> Option<User> {
        let idx = self.users.iter().position(|u| u.id == id)?;
        Some(self.users.remove(idx))
    }

    #[must_use]
    pub fn contains(&self, id: ClientId) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    /// Snapshot of current members, oldest join first.
    #[must_use]
    pub fn user_list(&self) -> Vec<User> {
        self.users.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
