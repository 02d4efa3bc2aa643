use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppError,
    services::{room_service, websocket_service},
    state::SharedState,
};

/// Query string of the live endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WsParams {
    /// Room to attach the connection to.
    pub room_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "live",
    params(WsParams),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 400, description = "Missing or malformed room_id"),
        (status = 404, description = "Room not found")
    )
)]
/// Upgrade the HTTP connection into a live room session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let room_id = parse_room_id(params.room_id.as_deref())?;
    room_service::load_room(&state, room_id).await?;

    let shared_state = state.clone();
    Ok(ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(shared_state.clone(), socket, room_id)
    }))
}

fn parse_room_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("room_id query parameter is required".into()))?;
    Uuid::parse_str(raw.trim())
        .map_err(|err| AppError::BadRequest(format!("invalid room_id `{raw}`: {err}")))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_is_required_and_must_be_a_uuid() {
        assert!(matches!(parse_room_id(None), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_room_id(Some("  ")), Err(AppError::BadRequest(_))));
        assert!(matches!(
            parse_room_id(Some("not-a-uuid")),
            Err(AppError::BadRequest(_))
        ));

        let room_id = Uuid::new_v4();
        assert_eq!(parse_room_id(Some(&room_id.to_string())).unwrap(), room_id);
    }
}
