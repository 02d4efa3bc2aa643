use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::room::{JoinRoomRequest, JoinRoomResponse},
    error::AppError,
    services::user_service,
    state::SharedState,
};

/// Routes for players joining rooms.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/user", post(join_room))
}

/// Join a room by its six digit code.
#[utoipa::path(
    post,
    path = "/api/user",
    tag = "users",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined the room", body = JoinRoomResponse),
        (status = 400, description = "Invalid room code or user name"),
        (status = 404, description = "No room uses this code")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<JoinRoomResponse>, AppError> {
    let joined = user_service::join_room(&state, payload).await?;
    Ok(Json(joined))
}
