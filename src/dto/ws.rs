//! Wire types of the live room protocol.
//!
//! Every frame is a JSON envelope `{"type": "...", "payload": {...}}`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{ErrorCode, ProtocolError},
    state::{participant::Role, state_machine::RoomStatus},
};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Messages accepted from live clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `CLIENT_CONNECTED`: binds a user to the connection.
    ClientConnected(ClientConnectedPayload),
    /// `FETCH_PARTICIPANTS`: asks for a participant broadcast.
    FetchParticipants,
    /// `SUBMIT_TOPIC`: round material from the host.
    SubmitTopic(RoundPayload),
    /// `ANSWERING`: final answer from the leader.
    Answering(AnsweringPayload),
}

impl ClientMessage {
    /// Parse a text frame: envelope first, then the payload matching its type.
    pub fn from_json_str(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(|err| {
            ProtocolError::new(ErrorCode::InvalidMessage, format!("malformed envelope: {err}"))
        })?;

        match envelope.kind.as_str() {
            "CLIENT_CONNECTED" => parse_payload(envelope.payload).map(Self::ClientConnected),
            "FETCH_PARTICIPANTS" => Ok(Self::FetchParticipants),
            "SUBMIT_TOPIC" => parse_payload(envelope.payload).map(Self::SubmitTopic),
            "ANSWERING" => parse_payload(envelope.payload).map(Self::Answering),
            other => Err(ProtocolError::new(
                ErrorCode::UnknownType,
                format!("unknown message type `{other}`"),
            )),
        }
    }
}

fn parse_payload<T>(payload: Value) -> Result<T, ProtocolError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(payload).map_err(|err| {
        ProtocolError::new(ErrorCode::InvalidPayload, format!("malformed payload: {err}"))
    })?;
    parsed
        .validate()
        .map_err(|err| ProtocolError::new(ErrorCode::Validation, err.to_string()))?;
    Ok(parsed)
}

/// Binds a user to the connection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema, Validate)]
pub struct ClientConnectedPayload {
    /// Participant identifier of the user.
    pub user_id: Uuid,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub user_name: String,
}

/// Round material sent by the host with `SUBMIT_TOPIC`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoundPayload {
    /// Emojis shown to the players, decoy included.
    #[serde(default)]
    pub displayed_emojis: Vec<String>,
    /// Emojis chosen by the host.
    #[serde(default)]
    pub original_emojis: Vec<String>,
    /// Position of the decoy in `displayedEmojis`.
    #[validate(range(min = 0))]
    pub dummy_index: i64,
    /// Decoy emoji.
    #[validate(length(min = 1))]
    pub dummy_emoji: String,
}

/// Final answer sent by the leader, together with the round material it answers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema, Validate)]
pub struct AnsweringPayload {
    /// Guessed theme.
    #[validate(length(min = 1))]
    pub answer: String,
    /// Round material the answer refers to.
    #[serde(flatten)]
    #[validate(nested)]
    pub round: RoundPayload,
}

/// Messages pushed to live clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// `STATE_UPDATE` phase change.
    StateUpdate(StateUpdatePayload),
    /// `PARTICIPANT_UPDATE` participant list.
    ParticipantUpdate(ParticipantUpdatePayload),
    /// `TIMER_TICK` countdown step.
    TimerTick(TimerTickPayload),
    /// `ERROR` reply to the sender only.
    Error(ErrorPayload),
}

impl ServerMessage {
    /// `STATE_UPDATE` announcing `next_state`.
    pub fn state_update(next_state: RoomStatus, data: StateUpdateData) -> Self {
        Self::StateUpdate(StateUpdatePayload {
            next_state,
            data: Some(data),
        })
    }

    /// `PARTICIPANT_UPDATE` with the given list.
    pub fn participants(participants: Vec<ParticipantView>) -> Self {
        Self::ParticipantUpdate(ParticipantUpdatePayload { participants })
    }

    /// `TIMER_TICK` carrying `MM:SS`.
    pub fn timer_tick(time: String) -> Self {
        Self::TimerTick(TimerTickPayload { time })
    }
}

impl From<ProtocolError> for ServerMessage {
    fn from(err: ProtocolError) -> Self {
        Self::Error(ErrorPayload {
            code: err.code,
            message: err.message,
        })
    }
}

/// Phase change notification.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StateUpdatePayload {
    /// Phase the room entered.
    #[serde(rename = "nextState")]
    pub next_state: RoomStatus,
    /// Phase dependent snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StateUpdateData>,
}

/// Phase dependent snapshot; fields only appear once the phase exposes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdateData {
    /// Theme title, from `checking` on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Topic, from `discussing` on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Final answer, from `checking` on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Emojis shown to the players.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displayed_emojis: Option<Vec<String>>,
    /// Emojis chosen by the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_emojis: Option<Vec<String>>,
    /// Position of the decoy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dummy_index: Option<u32>,
    /// Decoy emoji.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dummy_emoji: Option<String>,
    /// Each entry is itself a JSON document `{"user_id": ..., "emoji": ...}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignments: Option<Vec<String>>,
}

/// Participant as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParticipantView {
    /// User identifier.
    pub user_id: Uuid,
    /// Display name, `Unknown` when the user is gone.
    pub user_name: String,
    /// Host or player.
    pub role: Role,
    /// Whether this participant submits the final answer.
    pub is_leader: bool,
}

/// Payload of `PARTICIPANT_UPDATE`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParticipantUpdatePayload {
    /// Participants in join order.
    pub participants: Vec<ParticipantView>,
}

/// Payload of `TIMER_TICK`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimerTickPayload {
    /// Remaining discussion time as `MM:SS`.
    pub time: String,
}

/// Payload of `ERROR`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ErrorPayload {
    /// Machine readable code.
    pub code: ErrorCode,
    /// Human readable detail.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn code_of(text: &str) -> ErrorCode {
        ClientMessage::from_json_str(text).unwrap_err().code
    }

    #[test]
    fn parses_each_inbound_type() {
        let user_id = Uuid::new_v4();
        let connected = json!({
            "type": "CLIENT_CONNECTED",
            "payload": {"user_id": user_id, "user_name": "Alice"}
        });
        assert_eq!(
            ClientMessage::from_json_str(&connected.to_string()).unwrap(),
            ClientMessage::ClientConnected(ClientConnectedPayload {
                user_id,
                user_name: "Alice".into()
            })
        );

        assert_eq!(
            ClientMessage::from_json_str(r#"{"type":"FETCH_PARTICIPANTS"}"#).unwrap(),
            ClientMessage::FetchParticipants
        );

        let answering = json!({
            "type": "ANSWERING",
            "payload": {
                "answer": "Mona Lisa",
                "displayedEmojis": ["🎨", "🍕", "🖼️"],
                "originalEmojis": ["🎨", "🖼️"],
                "dummyIndex": 1,
                "dummyEmoji": "🍕"
            }
        });
        let ClientMessage::Answering(payload) =
            ClientMessage::from_json_str(&answering.to_string()).unwrap()
        else {
            panic!("expected ANSWERING");
        };
        assert_eq!(payload.answer, "Mona Lisa");
        assert_eq!(payload.round.dummy_index, 1);
        assert_eq!(payload.round.original_emojis, vec!["🎨", "🖼️"]);
    }

    #[test]
    fn protocol_errors_are_classified() {
        assert_eq!(code_of("not json"), ErrorCode::InvalidMessage);
        assert_eq!(code_of(r#"{"payload":{}}"#), ErrorCode::InvalidMessage);
        assert_eq!(code_of(r#"{"type":"DANCE","payload":{}}"#), ErrorCode::UnknownType);
        assert_eq!(
            code_of(r#"{"type":"CLIENT_CONNECTED","payload":{"user_id":"nope"}}"#),
            ErrorCode::InvalidPayload
        );
        assert_eq!(code_of(r#"{"type":"SUBMIT_TOPIC"}"#), ErrorCode::InvalidPayload);
        assert_eq!(
            code_of(
                r#"{"type":"SUBMIT_TOPIC","payload":{"displayedEmojis":[],"originalEmojis":[],"dummyIndex":-1,"dummyEmoji":"x"}}"#
            ),
            ErrorCode::Validation
        );
    }

    #[test]
    fn outbound_frames_use_the_envelope() {
        let tick = serde_json::to_value(ServerMessage::timer_tick("04:59".into())).unwrap();
        assert_eq!(tick, json!({"type": "TIMER_TICK", "payload": {"time": "04:59"}}));

        let update = serde_json::to_value(ServerMessage::state_update(
            RoomStatus::Discussing,
            StateUpdateData {
                topic: Some("Paintings".into()),
                dummy_index: Some(0),
                ..Default::default()
            },
        ))
        .unwrap();
        assert_eq!(
            update,
            json!({
                "type": "STATE_UPDATE",
                "payload": {
                    "nextState": "discussing",
                    "data": {"topic": "Paintings", "dummyIndex": 0}
                }
            })
        );

        let error = serde_json::to_value(ServerMessage::from(ProtocolError::new(
            ErrorCode::NotIdentified,
            "identify first",
        )))
        .unwrap();
        assert_eq!(
            error,
            json!({"type": "ERROR", "payload": {"code": "NOT_IDENTIFIED", "message": "identify first"}})
        );
    }
}
