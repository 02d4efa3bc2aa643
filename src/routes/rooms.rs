use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        room::{
            ActionResponse, CreateRoomResponse, RoomActionRequest, RoomSummary, SetTopicRequest,
            SubmitAnswerRequest,
        },
        ws::ParticipantView,
    },
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Room lifecycle endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{room_id}", get(get_room))
        .route("/api/rooms/{room_id}/participants", get(get_participants))
        .route("/api/rooms/{room_id}/start", post(start_game))
        .route("/api/rooms/{room_id}/topic", post(set_topic))
        .route("/api/rooms/{room_id}/skip-discussion", post(skip_discussion))
        .route("/api/rooms/{room_id}/answer", post(submit_answer))
        .route("/api/rooms/{room_id}/finish", post(finish_game))
}

/// Create a room around a random theme.
#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "rooms",
    responses(
        (status = 200, description = "Room created", body = CreateRoomResponse),
        (status = 409, description = "No theme available")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let created = room_service::create_room(&state).await?;
    Ok(Json(created))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room summary", body = RoomSummary),
        (status = 404, description = "Room not found")
    )
)]
/// Summary of a room.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomSummary>, AppError> {
    let room = room_service::fetch_room(&state, room_id).await?;
    Ok(Json(room))
}

/// Participants in join order.
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/participants",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Participants of the room", body = [ParticipantView])
    )
)]
pub async fn get_participants(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<ParticipantView>>, AppError> {
    let participants = room_service::fetch_participants(&state, room_id).await?;
    Ok(Json(participants))
}

/// Host starts the game.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/start",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Game started", body = ActionResponse),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Room is not waiting")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RoomActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    room_service::start_game(&state, room_id, payload.user_id).await?;
    Ok(Json(ActionResponse::new("started")))
}

/// Host sets the topic, optionally with the round material.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/topic",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    request_body = SetTopicRequest,
    responses(
        (status = 200, description = "Topic set", body = ActionResponse),
        (status = 400, description = "Empty topic or invalid round material"),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Room is not setting its topic")
    )
)]
pub async fn set_topic(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SetTopicRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    room_service::set_topic(&state, room_id, payload).await?;
    Ok(Json(ActionResponse::new("topic_set")))
}

/// Host ends the discussion early.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/skip-discussion",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Discussion skipped", body = ActionResponse),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Room is not discussing")
    )
)]
pub async fn skip_discussion(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RoomActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    room_service::skip_discussion(&state, room_id, payload.user_id).await?;
    Ok(Json(ActionResponse::new("discussion_skipped")))
}

/// Leader submits the final answer.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/answer",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer submitted", body = ActionResponse),
        (status = 403, description = "Caller is not the leader"),
        (status = 409, description = "Room is not answering")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    room_service::submit_answer(&state, room_id, payload.user_id, &payload.answer).await?;
    Ok(Json(ActionResponse::new("answer_submitted")))
}

/// Host closes the room.
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/finish",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    request_body = RoomActionRequest,
    responses(
        (status = 200, description = "Game finished", body = ActionResponse),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Room is not checking")
    )
)]
pub async fn finish_game(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RoomActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    room_service::finish_game(&state, room_id, payload.user_id).await?;
    Ok(Json(ActionResponse::new("finished")))
}
