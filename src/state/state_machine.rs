use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle phases a room goes through, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Room created, players are joining.
    Waiting,
    /// Host is choosing the topic and round material.
    SettingTopic,
    /// Players discuss their assigned emojis while the timer runs.
    Discussing,
    /// Leader is preparing the final answer.
    Answering,
    /// Answer submitted and revealed against the theme.
    Checking,
    /// Terminal phase.
    Finished,
}

impl RoomStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [RoomStatus; 6] = [
        RoomStatus::Waiting,
        RoomStatus::SettingTopic,
        RoomStatus::Discussing,
        RoomStatus::Answering,
        RoomStatus::Checking,
        RoomStatus::Finished,
    ];

    /// Label used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::SettingTopic => "setting_topic",
            RoomStatus::Discussing => "discussing",
            RoomStatus::Answering => "answering",
            RoomStatus::Checking => "checking",
            RoomStatus::Finished => "finished",
        }
    }

    /// The single status reachable from `self`, if any.
    pub fn next(&self) -> Option<RoomStatus> {
        match self {
            RoomStatus::Waiting => Some(RoomStatus::SettingTopic),
            RoomStatus::SettingTopic => Some(RoomStatus::Discussing),
            RoomStatus::Discussing => Some(RoomStatus::Answering),
            RoomStatus::Answering => Some(RoomStatus::Checking),
            RoomStatus::Checking => Some(RoomStatus::Finished),
            RoomStatus::Finished => None,
        }
    }

    /// Whether `target` is the legal successor of `self`.
    pub fn can_transition_to(&self, target: RoomStatus) -> bool {
        self.next() == Some(target)
    }

    /// Validate a transition, returning the target status when allowed.
    pub fn transition(self, target: RoomStatus) -> Result<RoomStatus, InvalidTransition> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status label is not one of the known phases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown room status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for RoomStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RoomStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Error returned when attempting a status change that the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: cannot move from {from} to {to}")]
pub struct InvalidTransition {
    /// Status the room was in.
    pub from: RoomStatus,
    /// Status that was requested.
    pub to: RoomStatus,
}
