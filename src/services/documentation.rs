use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Emoji Guess Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::users::join_room,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::get_participants,
        crate::routes::rooms::start_game,
        crate::routes::rooms::set_topic,
        crate::routes::rooms::skip_discussion,
        crate::routes::rooms::submit_answer,
        crate::routes::rooms::finish_game,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::RoomSummary,
            crate::dto::room::RoomActionRequest,
            crate::dto::room::SetTopicRequest,
            crate::dto::room::SubmitAnswerRequest,
            crate::dto::room::ActionResponse,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::JoinRoomResponse,
            crate::dto::ws::ClientConnectedPayload,
            crate::dto::ws::RoundPayload,
            crate::dto::ws::AnsweringPayload,
            crate::dto::ws::StateUpdatePayload,
            crate::dto::ws::StateUpdateData,
            crate::dto::ws::ParticipantView,
            crate::dto::ws::ParticipantUpdatePayload,
            crate::dto::ws::TimerTickPayload,
            crate::dto::ws::ErrorPayload,
            crate::error::ErrorCode,
            crate::state::participant::Role,
            crate::state::state_machine::RoomStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle operations"),
        (name = "users", description = "Joining rooms"),
        (name = "live", description = "WebSocket protocol for room participants"),
    )
)]
pub struct ApiDoc;
