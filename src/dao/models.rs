use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::state_machine::RoomStatus;

/// Round material chosen by the host when the topic is submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameDataEntity {
    /// Emoji sequence as picked by the host.
    pub original_emojis: Vec<String>,
    /// Emoji sequence shown to the players, decoy included.
    pub displayed_emojis: Vec<String>,
    /// Position of the decoy inside `displayed_emojis`.
    pub dummy_index: u32,
    /// The decoy emoji itself.
    pub dummy_emoji: String,
}

/// One emoji handed to one non-host participant for the discussion phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentEntity {
    /// Participant holding the emoji.
    pub user_id: Uuid,
    /// Emoji handed out.
    pub emoji: String,
}

/// Room record as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Six digit join code.
    pub code: String,
    /// Theme the players have to guess.
    pub theme_id: Uuid,
    /// User that created the room.
    pub host_user_id: Uuid,
    /// Topic chosen by the host.
    pub topic: Option<String>,
    /// Final answer submitted by the leader.
    pub answer: Option<String>,
    /// Stored status, restored without transition checks.
    pub status: RoomStatus,
    /// Round material, once submitted.
    pub game_data: Option<GameDataEntity>,
    /// Emoji handed to each non-host participant.
    pub assignments: Vec<AssignmentEntity>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Set when the host starts the game.
    pub started_at: Option<SystemTime>,
}

/// Membership of a user in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Participant identifier.
    pub id: Uuid,
    /// Room joined.
    pub room_id: Uuid,
    /// User behind the participant.
    pub user_id: Uuid,
    /// `host` or `player`.
    pub role: String,
    /// Whether this participant submits the final answer.
    pub is_leader: bool,
    /// Join time, used to order participants.
    pub joined_at: SystemTime,
}

/// Catalog entry describing what the players have to guess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeEntity {
    /// Theme identifier.
    pub id: Uuid,
    /// Title players have to guess.
    pub title: String,
    /// Clue shown to the host.
    pub hint: String,
}

/// Player profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// User identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Creation time.
    pub created_at: SystemTime,
}
