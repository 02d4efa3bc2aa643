use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::ParticipantEntity;

/// Role a user holds inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creator of the room.
    Host,
    /// Joined by code.
    Player,
}

impl Role {
    /// Snake case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Player => "player",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership of a user in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Participant identifier.
    pub id: Uuid,
    /// Room joined.
    pub room_id: Uuid,
    /// User behind the participant.
    pub user_id: Uuid,
    /// Host or player.
    pub role: Role,
    /// Whether this participant submits the final answer.
    pub is_leader: bool,
    /// Join time.
    pub joined_at: SystemTime,
}

impl Participant {
    /// New participant joining now.
    pub fn new(room_id: Uuid, user_id: Uuid, role: Role, is_leader: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id,
            role,
            is_leader,
            joined_at: SystemTime::now(),
        }
    }

    /// Whether this participant created the room.
    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(entity: ParticipantEntity) -> Self {
        let role = if entity.role == Role::Host.as_str() {
            Role::Host
        } else {
            Role::Player
        };
        Self {
            id: entity.id,
            room_id: entity.room_id,
            user_id: entity.user_id,
            role,
            is_leader: entity.is_leader,
            joined_at: entity.joined_at,
        }
    }
}

impl From<&Participant> for ParticipantEntity {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            room_id: participant.room_id,
            user_id: participant.user_id,
            role: participant.role.as_str().to_string(),
            is_leader: participant.is_leader,
            joined_at: participant.joined_at,
        }
    }
}
