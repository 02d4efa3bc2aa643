//! DTO definitions used by the room REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_room_code},
    state::{room::Room, state_machine::RoomStatus},
};

/// Identifiers handed to the host of a freshly created room.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    /// Identifier of the new room.
    pub room_id: Uuid,
    /// User created for the host.
    pub user_id: Uuid,
    /// Six digit code players join with.
    pub room_code: String,
    /// Title of the theme the players have to guess.
    pub theme: String,
    /// Clue for the host.
    pub hint: String,
}

/// Public projection of a room.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Room identifier.
    pub room_id: Uuid,
    /// Six digit join code.
    pub room_code: String,
    /// Current phase.
    pub status: RoomStatus,
    /// User who created the room.
    pub host_user_id: Uuid,
    /// Topic, once set.
    pub topic: Option<String>,
    /// RFC 3339 timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp, set once the host started the game.
    pub started_at: Option<String>,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id(),
            room_code: room.code().to_string(),
            status: room.status(),
            host_user_id: room.host_user_id(),
            topic: room.topic().map(|topic| topic.as_str().to_string()),
            created_at: format_system_time(room.created_at()),
            started_at: room.started_at().map(format_system_time),
        }
    }
}

/// Request carrying only the acting user, used by host-only transitions.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RoomActionRequest {
    /// Acting user.
    pub user_id: Uuid,
}

/// Topic chosen by the host, optionally with the round material.
///
/// Round material is only applied when both emoji lists are non-empty.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetTopicRequest {
    /// Acting user, must be the host.
    pub user_id: Uuid,
    /// Topic of the round.
    #[validate(length(min = 1, max = 255))]
    pub topic: String,
    /// Emojis shown to the players, decoy included.
    #[serde(default)]
    pub displayed_emojis: Vec<String>,
    /// Emojis chosen by the host.
    #[serde(default)]
    pub original_emojis: Vec<String>,
    /// Position of the decoy in `displayed_emojis`.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub dummy_index: i64,
    /// Decoy emoji.
    #[serde(default)]
    pub dummy_emoji: String,
}

impl SetTopicRequest {
    /// Whether the request carries round material.
    pub fn has_round(&self) -> bool {
        !self.displayed_emojis.is_empty() && !self.original_emojis.is_empty()
    }
}

/// Final answer submitted by the leader.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Acting user, must be the leader.
    pub user_id: Uuid,
    /// Guessed theme.
    #[validate(length(min = 1, max = 255))]
    pub answer: String,
}

/// Acknowledgement of a room action.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct ActionResponse {
    /// Short label of the performed action.
    pub status: String,
}

impl ActionResponse {
    /// Build a response carrying `status`.
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Request to join a room by its code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Six digit code of the room.
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    /// Display name of the joining user.
    #[validate(length(min = 1, max = 255))]
    pub user_name: String,
}

/// Identifiers of the user created by a join.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinRoomResponse {
    /// Joined room.
    pub room_id: Uuid,
    /// User created for the player.
    pub user_id: Uuid,
    /// Whether the player submits the final answer.
    pub is_leader: bool,
}
