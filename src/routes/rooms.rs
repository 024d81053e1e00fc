//! Read-only room inspection routes.
//!
//! Neither handler creates a room: an unknown key is a 404.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::warn;

use crate::room::RoomError;
use crate::room::canvas::Operation;
use crate::room::presence::User;
use crate::state::AppState;

/// `GET /api/rooms/{room}/users` — current members in join order.
pub async fn list_users(State(state): State<AppState>, Path(room): Path<String>) -> Result<Json<Vec<User>>, StatusCode> {
    let users = state.rooms.user_list(&room).await.map_err(room_error_to_status)?;
    Ok(Json(users))
}

/// `GET /api/rooms/{room}/operations` — active operation log, oldest first.
pub async fn list_operations(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<Vec<Operation>>, StatusCode> {
    let ops = state.rooms.snapshot(&room).await.map_err(room_error_to_status)?;
    Ok(Json(ops))
}

pub(crate) fn room_error_to_status(err: RoomError) -> StatusCode {
    match err {
        RoomError::NotFound(_) => StatusCode::NOT_FOUND,
        RoomError::Closed(room) => {
            warn!(%room, "rooms: actor unavailable");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
