//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room registry and the startup configuration. Clone is
//! required by Axum; both fields are cheap to clone.

use std::sync::Arc;

use crate::config::Config;
use crate::room::registry::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let rooms = RoomRegistry::new(config.room_queue_capacity).with_max_stroke_points(config.max_stroke_points);
        Self { rooms, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
