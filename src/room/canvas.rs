//! Canvas state — ordered operation log with global undo/redo.
//!
//! DESIGN
//! ======
//! The room's history lives in two stacks. `ops` is the active log that
//! clients render; `undone` holds operations moved off the top of `ops` by
//! undo, newest last. An operation sits in exactly one of the two. A commit
//! while `undone` is non-empty drops that branch for good.
//!
//! Ordering is arrival order at the room actor. There is no per-operation
//! conflict resolution.

use serde::{Deserialize, Serialize};

use super::ClientId;
use super::staging::LiveStroke;

/// Point in canvas coordinates. Opaque to the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Immutable committed stroke record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Per-room, monotonic, starts at 1. Never reused, even after undo.
    pub id: u64,
    pub user_id: ClientId,
    pub color: String,
    pub width: f64,
    pub mode: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Default)]
pub struct CanvasState {
    ops: Vec<Operation>,
    undone: Vec<Operation>,
    next_id: u64,
}

impl CanvasState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a finished stroke as a new operation and clear the redo stack.
    ///
    /// Strokes with zero or one point are committed as-is.
    pub fn commit_op(&mut self, stroke: LiveStroke, user_id: ClientId) -> Operation {
        self.next_id += 1;
        let op = Operation {
            id: self.next_id,
            user_id,
            color: stroke.style.color,
            width: stroke.style.width,
            mode: stroke.style.mode,
            points: stroke.points,
        };
        self.undone.clear();
        self.ops.push(op.clone());
        op
    }

    /// Move the newest operation to the redo stack. `false` if the log is empty.
    pub fn undo(&mut self) -> bool {
        let Some(op) = self.ops.pop() else {
            return false;
        };
        self.undone.push(op);
        true
    }

    /// Move the newest undone operation back onto the log. `false` if none.
    pub fn redo(&mut self) -> bool {
        let Some(op) = self.undone.pop() else {
            return false;
        };
        self.ops.push(op);
        true
    }

    /// Owned copy of the active log, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Operation> {
        self.ops.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
