//! Stroke staging — in-flight strokes between `stroke:start` and `stroke:end`.
//!
//! DESIGN
//! ======
//! One buffer per connection, keyed by client id and tagged with the
//! client-chosen temporary id. Points and ends are matched against that tag;
//! anything that does not match is left for the caller to relay and is never
//! staged. A buffer leaves the table either by `finish` (the caller commits
//! it) or by `discard` (disconnect/leave, never committed).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ClientId;
use super::canvas::Point;

pub const DEFAULT_STROKE_COLOR: &str = "#000000";
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
pub const DEFAULT_STROKE_MODE: &str = "draw";
/// Points a single open stroke may hold before further points are dropped.
pub const DEFAULT_MAX_STROKE_POINTS: usize = 10_000;

/// Client-chosen temporary stroke id. Either a JSON string or a JSON number,
/// echoed back verbatim in relays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(serde_json::Value);

impl TempId {
    /// Accept strings and numbers; anything else is not a usable id.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(_) | serde_json::Value::Number(_) => Some(Self(value.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    pub mode: String,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_STROKE_COLOR.to_string(),
            width: DEFAULT_STROKE_WIDTH,
            mode: DEFAULT_STROKE_MODE.to_string(),
        }
    }
}

/// Uncommitted stroke owned by one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStroke {
    pub temp_id: TempId,
    pub style: StrokeStyle,
    pub points: Vec<Point>,
}

#[derive(Debug)]
pub struct StrokeStaging {
    live: HashMap<ClientId, LiveStroke>,
    max_points: usize,
}

impl Default for StrokeStaging {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeStaging {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_points(DEFAULT_MAX_STROKE_POINTS)
    }

    #[must_use]
    pub fn with_max_points(max_points: usize) -> Self {
        Self { live: HashMap::new(), max_points }
    }

    /// Whether the client's open buffer carries `temp_id` and has reached
    /// the point cap.
    #[must_use]
    pub fn is_full(&self, client_id: ClientId, temp_id: &TempId) -> bool {
        self.live
            .get(&client_id)
            .is_some_and(|stroke| stroke.temp_id == *temp_id && stroke.points.len() >= self.max_points)
    }

    /// Open a buffer for `client_id`. Replaces any buffer already open for
    /// that client, dropping its points.
    pub fn start(&mut self, client_id: ClientId, temp_id: TempId, style: StrokeStyle) {
        self.live
            .insert(client_id, LiveStroke { temp_id, style, points: Vec::new() });
    }

    /// Append a point if the client's open buffer carries `temp_id` and is
    /// below the point cap. Returns whether the point was staged.
    pub fn push_point(&mut self, client_id: ClientId, temp_id: &TempId, point: Point) -> bool {
        match self.live.get_mut(&client_id) {
            Some(stroke) if stroke.temp_id == *temp_id && stroke.points.len() < self.max_points => {
                stroke.points.push(point);
                true
            }
            _ => false,
        }
    }

    /// Close and return the client's buffer if it carries `temp_id`. A
    /// mismatched id leaves the open buffer untouched.
    pub fn finish(&mut self, client_id: ClientId, temp_id: &TempId) -> Option<LiveStroke> {
        if self.live.get(&client_id)?.temp_id != *temp_id {
            return None;
        }
        self.live.remove(&client_id)
    }

    /// Drop the client's open buffer without committing. Returns the number
    /// of points that were abandoned, if a buffer existed.
    pub fn discard(&mut self, client_id: ClientId) -> Option<usize> {
        self.live.remove(&client_id).map(|stroke| stroke.points.len())
    }
}

#[cfg(test)]
#[path = "staging_test.rs"]
mod tests;
