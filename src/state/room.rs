//! Room aggregate: the authoritative status, topic, answer and round material of one room.

use std::{fmt, time::SystemTime};

use rand::{Rng, rng};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{AssignmentEntity, GameDataEntity, RoomEntity},
    state::{
        participant::Participant,
        state_machine::{InvalidTransition, RoomStatus},
    },
};

/// Failures raised by the aggregate. None of them leave a partial write behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Malformed value object.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Status change outside the transition table.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The topic can only change while the host is choosing it.
    #[error("topic can only be set while setting the topic (room is {0})")]
    TopicLocked(RoomStatus),
    /// `checking` needs an answer to check.
    #[error("an answer is required before checking")]
    AnswerRequired,
}

/// Six digit code typed by players to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Draw a fresh code in `100000..=999999`.
    pub fn generate() -> Self {
        let value: u32 = rng().random_range(100_000..1_000_000);
        Self(format!("{value:06}"))
    }

    /// Accept exactly six ASCII digits.
    pub fn parse(value: &str) -> Result<Self, RoomError> {
        if value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_string()))
        } else {
            Err(RoomError::Validation(format!(
                "room code must be 6 digits (got `{value}`)"
            )))
        }
    }

    /// The six digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_empty(field: &str, value: &str) -> Result<String, RoomError> {
    if value.trim().is_empty() {
        Err(RoomError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(value.to_string())
    }
}

/// Subject the players discuss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Trimmed topic; fails when blank.
    pub fn new(value: &str) -> Result<Self, RoomError> {
        non_empty("topic", value).map(Self)
    }

    /// Topic text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Final guess submitted by the leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer(String);

impl Answer {
    /// Trimmed answer; fails when blank.
    pub fn new(value: &str) -> Result<Self, RoomError> {
        non_empty("answer", value).map(Self)
    }

    /// Answer text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Emoji material of a round, decoy included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameData {
    /// Emojis chosen by the host.
    pub original_emojis: Vec<String>,
    /// Emojis shown to the players, decoy included.
    pub displayed_emojis: Vec<String>,
    /// Position of the decoy in `displayed_emojis`.
    pub dummy_index: u32,
    /// Decoy emoji.
    pub dummy_emoji: String,
}

impl GameData {
    /// Validate raw round material. The index arrives signed from clients.
    pub fn new(
        original_emojis: Vec<String>,
        displayed_emojis: Vec<String>,
        dummy_index: i64,
        dummy_emoji: &str,
    ) -> Result<Self, RoomError> {
        let dummy_index = u32::try_from(dummy_index).map_err(|_| {
            RoomError::Validation(format!(
                "dummy index must be a non-negative integer (got {dummy_index})"
            ))
        })?;
        let dummy_emoji = non_empty("dummy emoji", dummy_emoji)?;
        Ok(Self {
            original_emojis,
            displayed_emojis,
            dummy_index,
            dummy_emoji,
        })
    }
}

/// Emoji handed to one non-host participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Participant holding the emoji.
    pub user_id: Uuid,
    /// Emoji handed out.
    pub emoji: String,
}

impl Assignment {
    /// Hand out `emojis` in order to the non-host participants, in join order, until either
    /// side runs out.
    pub fn distribute(participants: &[Participant], emojis: &[String]) -> Vec<Assignment> {
        participants
            .iter()
            .filter(|participant| !participant.is_host())
            .zip(emojis)
            .map(|(participant, emoji)| Assignment {
                user_id: participant.user_id,
                emoji: emoji.clone(),
            })
            .collect()
    }
}

/// Room aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    id: Uuid,
    code: RoomCode,
    theme_id: Uuid,
    host_user_id: Uuid,
    topic: Option<Topic>,
    answer: Option<Answer>,
    status: RoomStatus,
    game_data: Option<GameData>,
    assignments: Vec<Assignment>,
    created_at: SystemTime,
    started_at: Option<SystemTime>,
}

impl Room {
    /// A fresh room, waiting for players.
    pub fn new(code: RoomCode, theme_id: Uuid, host_user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            theme_id,
            host_user_id,
            topic: None,
            answer: None,
            status: RoomStatus::Waiting,
            game_data: None,
            assignments: Vec::new(),
            created_at: SystemTime::now(),
            started_at: None,
        }
    }

    /// Room identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Six digit join code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Theme players have to guess.
    pub fn theme_id(&self) -> Uuid {
        self.theme_id
    }

    /// User who created the room.
    pub fn host_user_id(&self) -> Uuid {
        self.host_user_id
    }

    /// Whether `user_id` created the room.
    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_user_id == user_id
    }

    /// Topic, once set.
    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    /// Final answer, once submitted.
    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    /// Current phase.
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Round material, once submitted.
    pub fn game_data(&self) -> Option<&GameData> {
        self.game_data.as_ref()
    }

    /// Emoji handed to each non-host participant.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Time the host started the game.
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// `waiting -> setting_topic`, stamping the start time.
    pub fn start(&mut self) -> Result<(), RoomError> {
        self.change_status(RoomStatus::SettingTopic)?;
        self.started_at = Some(SystemTime::now());
        Ok(())
    }

    /// Set the topic; only while `setting_topic`.
    pub fn set_topic(&mut self, topic: &str) -> Result<(), RoomError> {
        if self.status != RoomStatus::SettingTopic {
            return Err(RoomError::TopicLocked(self.status));
        }
        self.topic = Some(Topic::new(topic)?);
        Ok(())
    }

    /// Validate and store the round material.
    pub fn set_game_data(
        &mut self,
        original_emojis: Vec<String>,
        displayed_emojis: Vec<String>,
        dummy_index: i64,
        dummy_emoji: &str,
    ) -> Result<(), RoomError> {
        self.game_data = Some(GameData::new(
            original_emojis,
            displayed_emojis,
            dummy_index,
            dummy_emoji,
        )?);
        Ok(())
    }

    /// Replace the emoji assignments.
    pub fn set_assignments(&mut self, assignments: Vec<Assignment>) {
        self.assignments = assignments;
    }

    /// Record the final answer.
    pub fn set_answer(&mut self, answer: &str) -> Result<(), RoomError> {
        self.answer = Some(Answer::new(answer)?);
        Ok(())
    }

    /// Move to `target` if the table allows it.
    pub fn change_status(&mut self, target: RoomStatus) -> Result<(), RoomError> {
        let next = self.status.transition(target)?;
        if next == RoomStatus::Checking && self.answer.is_none() {
            return Err(RoomError::AnswerRequired);
        }
        self.status = next;
        Ok(())
    }
}

impl From<RoomEntity> for Room {
    /// Rehydrate from storage; the stored status is trusted as is.
    fn from(entity: RoomEntity) -> Self {
        Self {
            id: entity.id,
            code: RoomCode(entity.code),
            theme_id: entity.theme_id,
            host_user_id: entity.host_user_id,
            topic: entity.topic.map(Topic),
            answer: entity.answer.map(Answer),
            status: entity.status,
            game_data: entity.game_data.map(|data| GameData {
                original_emojis: data.original_emojis,
                displayed_emojis: data.displayed_emojis,
                dummy_index: data.dummy_index,
                dummy_emoji: data.dummy_emoji,
            }),
            assignments: entity
                .assignments
                .into_iter()
                .map(|assignment| Assignment {
                    user_id: assignment.user_id,
                    emoji: assignment.emoji,
                })
                .collect(),
            created_at: entity.created_at,
            started_at: entity.started_at,
        }
    }
}

impl From<&Room> for RoomEntity {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            code: room.code.0.clone(),
            theme_id: room.theme_id,
            host_user_id: room.host_user_id,
            topic: room.topic.as_ref().map(|topic| topic.0.clone()),
            answer: room.answer.as_ref().map(|answer| answer.0.clone()),
            status: room.status,
            game_data: room.game_data.as_ref().map(|data| GameDataEntity {
                original_emojis: data.original_emojis.clone(),
                displayed_emojis: data.displayed_emojis.clone(),
                dummy_index: data.dummy_index,
                dummy_emoji: data.dummy_emoji.clone(),
            }),
            assignments: room
                .assignments
                .iter()
                .map(|assignment| AssignmentEntity {
                    user_id: assignment.user_id,
                    emoji: assignment.emoji.clone(),
                })
                .collect(),
            created_at: room.created_at,
            started_at: room.started_at,
        }
    }
}
