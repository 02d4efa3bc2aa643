//! Mirrors room events onto live connections: state snapshots, participant lists and the
//! discussion countdown.

use std::sync::{Arc, Weak};

use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ServerMessage, StateUpdateData},
    error::ServiceError,
    services::room_service,
    state::{
        AppState, SharedState,
        events::{DomainEvent, EventKind},
        room::Room,
        state_machine::RoomStatus,
    },
};

/// Install the live handlers for every event kind.
pub fn subscribe(state: &SharedState) {
    for kind in EventKind::ALL {
        let weak = Arc::downgrade(state);
        state
            .publisher()
            .subscribe(kind, move |event| on_room_event(weak.clone(), event));
    }
}

async fn on_room_event(state: Weak<AppState>, event: DomainEvent) -> Result<(), ServiceError> {
    let Some(state) = state.upgrade() else {
        return Ok(());
    };
    debug!(kind = ?event.kind, room_id = %event.room_id, "mirroring room event");
    mirror_room_state(&state, event.room_id, event.status(), true).await?;
    Ok(())
}

/// Broadcast the `status` snapshot of a room and align its countdown with that phase.
///
/// Runs under the room gate and does nothing when the stored room has already left `status`,
/// so late events never rewind what clients see. `restart_timer` forces a fresh countdown on
/// `discussing`; otherwise a running countdown is left alone. Returns whether anything was sent.
pub async fn mirror_room_state(
    state: &SharedState,
    room_id: Uuid,
    status: RoomStatus,
    restart_timer: bool,
) -> Result<bool, ServiceError> {
    let _gate = state.gates().lock(room_id).await;
    let room = room_service::load_room(state, room_id).await?;
    if room.status() != status {
        debug!(
            room_id = %room_id,
            expected = ?status,
            current = ?room.status(),
            "skipping stale room state"
        );
        return Ok(false);
    }

    broadcast_room_state(state, &room, status).await;
    match status {
        RoomStatus::Discussing => {
            if restart_timer || !state.timers().is_active(room_id) {
                state.timers().start(room_id).await;
            }
        }
        RoomStatus::Answering | RoomStatus::Checking | RoomStatus::Finished => {
            state.timers().stop(room_id).await;
        }
        RoomStatus::Waiting | RoomStatus::SettingTopic => {}
    }
    Ok(true)
}

/// Broadcast the `status` snapshot of `room` to the whole room.
pub async fn broadcast_room_state(state: &SharedState, room: &Room, status: RoomStatus) {
    let message = build_room_state(state, room, status).await;
    state.hub().broadcast(room.id(), &message).await;
}

/// Snapshot of `room` as seen in `status`, fetching the theme title when the phase reveals it.
pub async fn build_room_state(state: &SharedState, room: &Room, status: RoomStatus) -> ServerMessage {
    let theme = if reveals_answer(status) {
        theme_title(state, room).await
    } else {
        None
    };
    ServerMessage::state_update(status, build_state_data(room, status, theme))
}

fn reveals_round(status: RoomStatus) -> bool {
    !matches!(status, RoomStatus::Waiting | RoomStatus::SettingTopic)
}

fn reveals_answer(status: RoomStatus) -> bool {
    matches!(status, RoomStatus::Checking | RoomStatus::Finished)
}

/// Phase dependent payload: round material from `discussing` on, theme and answer from
/// `checking` on.
pub fn build_state_data(room: &Room, status: RoomStatus, theme: Option<String>) -> StateUpdateData {
    let mut data = StateUpdateData::default();
    if !reveals_round(status) {
        return data;
    }

    data.topic = room.topic().map(|topic| topic.as_str().to_string());
    if let Some(game) = room.game_data() {
        data.displayed_emojis = Some(game.displayed_emojis.clone());
        data.original_emojis = Some(game.original_emojis.clone());
        data.dummy_index = Some(game.dummy_index);
        data.dummy_emoji = Some(game.dummy_emoji.clone());
    }
    data.assignments = Some(
        room.assignments()
            .iter()
            .map(|assignment| {
                json!({"user_id": assignment.user_id, "emoji": assignment.emoji}).to_string()
            })
            .collect(),
    );

    if reveals_answer(status) {
        data.theme = theme;
        data.answer = room.answer().map(|answer| answer.as_str().to_string());
    }
    data
}

async fn theme_title(state: &SharedState, room: &Room) -> Option<String> {
    match state.themes().find_by_id(room.theme_id()).await {
        Ok(theme) => Some(theme.title),
        Err(err) => {
            warn!(room_id = %room.id(), theme_id = %room.theme_id(), error = %err, "theme lookup failed");
            None
        }
    }
}

/// Broadcast the participant list of a room.
pub async fn broadcast_participants(state: &SharedState, room_id: Uuid) -> Result<(), ServiceError> {
    let participants = room_service::fetch_participants(state, room_id).await?;
    state
        .hub()
        .broadcast(room_id, &ServerMessage::participants(participants))
        .await;
    Ok(())
}
