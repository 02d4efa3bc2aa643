//! Room use cases, shared by the REST routes and the live dispatcher.
//!
//! Every read-modify-write of a room runs under that room's gate so the HTTP and live paths
//! never overwrite each other.

use std::time::SystemTime;

use rand::seq::IndexedRandom;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{ParticipantEntity, RoomEntity, UserEntity},
    dto::{
        room::{CreateRoomResponse, RoomSummary, SetTopicRequest},
        ws::{AnsweringPayload, ParticipantView, RoundPayload},
    },
    error::ServiceError,
    state::{
        SharedState,
        events::{DomainEvent, EventKind},
        participant::{Participant, Role},
        room::{Assignment, Room, RoomCode},
        state_machine::RoomStatus,
    },
};

const HOST_NAME: &str = "Host";
const UNKNOWN_NAME: &str = "Unknown";
const CODE_ATTEMPTS: usize = 8;

/// Result of a live discussion start.
#[derive(Debug)]
pub struct DiscussionOutcome {
    /// Room as saved.
    pub room: Room,
    /// Whether this call moved the room into `discussing`.
    pub transitioned: bool,
}

/// Create a room around a random theme, along with its host user and participant.
pub async fn create_room(state: &SharedState) -> Result<CreateRoomResponse, ServiceError> {
    let themes = state.themes().find_all().await?;
    let theme = themes
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| ServiceError::InvalidState("no theme available".into()))?;

    let host = UserEntity {
        id: Uuid::new_v4(),
        name: HOST_NAME.into(),
        created_at: SystemTime::now(),
    };
    state.users().save(host.clone()).await?;

    let code = unused_room_code(state).await?;
    let room = Room::new(code, theme.id, host.id);
    save_room(state, &room).await?;

    let participant = Participant::new(room.id(), host.id, Role::Host, false);
    state
        .participants()
        .save(ParticipantEntity::from(&participant))
        .await?;

    info!(room_id = %room.id(), code = %room.code(), theme = %theme.title, "room created");
    Ok(CreateRoomResponse {
        room_id: room.id(),
        user_id: host.id,
        room_code: room.code().to_string(),
        theme: theme.title,
        hint: theme.hint,
    })
}

async fn unused_room_code(state: &SharedState) -> Result<RoomCode, ServiceError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = RoomCode::generate();
        match state.rooms().find_by_code(code.to_string()).await {
            Err(err) if err.is_not_found() => return Ok(code),
            Err(err) => return Err(err.into()),
            Ok(_) => continue,
        }
    }
    Err(ServiceError::InvalidState(
        "could not allocate a free room code".into(),
    ))
}

/// Load a room aggregate.
pub async fn load_room(state: &SharedState, room_id: Uuid) -> Result<Room, ServiceError> {
    Ok(Room::from(state.rooms().find_by_id(room_id).await?))
}

async fn save_room(state: &SharedState, room: &Room) -> Result<(), ServiceError> {
    state.rooms().save(RoomEntity::from(room)).await?;
    Ok(())
}

/// Participants of a room in join order.
pub async fn load_participants(
    state: &SharedState,
    room_id: Uuid,
) -> Result<Vec<Participant>, ServiceError> {
    Ok(state
        .participants()
        .find_by_room(room_id)
        .await?
        .into_iter()
        .map(Participant::from)
        .collect())
}

fn ensure_host(room: &Room, user_id: Uuid, action: &str) -> Result<(), ServiceError> {
    if room.is_host(user_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("only the host can {action}")))
    }
}

async fn ensure_leader(state: &SharedState, room_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
    match state.participants().find_by_room_and_user(room_id, user_id).await {
        Ok(participant) if participant.is_leader => Ok(()),
        Ok(_) => Err(ServiceError::Forbidden(
            "only the leader can submit the answer".into(),
        )),
        Err(err) if err.is_not_found() => Err(ServiceError::Forbidden(format!(
            "user `{user_id}` is not a participant of this room"
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Summary of a room.
pub async fn fetch_room(state: &SharedState, room_id: Uuid) -> Result<RoomSummary, ServiceError> {
    let room = load_room(state, room_id).await?;
    Ok(RoomSummary::from(&room))
}

/// Participants of a room with their display names.
pub async fn fetch_participants(
    state: &SharedState,
    room_id: Uuid,
) -> Result<Vec<ParticipantView>, ServiceError> {
    let participants = load_participants(state, room_id).await?;
    let mut views = Vec::with_capacity(participants.len());
    for participant in participants {
        let user_name = match state.users().find_by_id(participant.user_id).await {
            Ok(user) => user.name,
            Err(err) if err.is_not_found() => UNKNOWN_NAME.to_string(),
            Err(err) => return Err(err.into()),
        };
        views.push(ParticipantView {
            user_id: participant.user_id,
            user_name,
            role: participant.role,
            is_leader: participant.is_leader,
        });
    }
    Ok(views)
}

/// Host starts the game: `waiting -> setting_topic`.
pub async fn start_game(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    {
        let _gate = state.gates().lock(room_id).await;
        let mut room = load_room(state, room_id).await?;
        ensure_host(&room, user_id, "start the game")?;
        room.start()?;
        save_room(state, &room).await?;
    }

    info!(room_id = %room_id, "game started");
    state
        .publisher()
        .publish(DomainEvent::new(EventKind::GameStarted, room_id));
    Ok(())
}

/// Host sets the topic, optionally with the round material.
///
/// Once the room holds both a topic and round material it moves to `discussing`, whichever
/// of this call or [`start_discussion`] supplied the material.
pub async fn set_topic(
    state: &SharedState,
    room_id: Uuid,
    request: SetTopicRequest,
) -> Result<(), ServiceError> {
    let transitioned = {
        let _gate = state.gates().lock(room_id).await;
        let mut room = load_room(state, room_id).await?;
        ensure_host(&room, request.user_id, "set the topic")?;
        room.set_topic(&request.topic)?;

        if request.has_round() {
            room.set_game_data(
                request.original_emojis,
                request.displayed_emojis.clone(),
                request.dummy_index,
                &request.dummy_emoji,
            )?;
            let participants = load_participants(state, room_id).await?;
            room.set_assignments(Assignment::distribute(
                &participants,
                &request.displayed_emojis,
            ));
        }

        let transitioned = room.game_data().is_some();
        if transitioned {
            room.change_status(RoomStatus::Discussing)?;
        }
        save_room(state, &room).await?;
        transitioned
    };

    info!(room_id = %room_id, discussing = transitioned, "topic set");
    if transitioned {
        state
            .publisher()
            .publish(DomainEvent::new(EventKind::DiscussionStarted, room_id));
    }
    Ok(())
}

/// Host ends the discussion early: `discussing -> answering`.
pub async fn skip_discussion(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    {
        let _gate = state.gates().lock(room_id).await;
        let mut room = load_room(state, room_id).await?;
        ensure_host(&room, user_id, "skip the discussion")?;
        if room.game_data().is_none() {
            return Err(ServiceError::InvalidState(
                "round material has not been submitted yet".into(),
            ));
        }
        room.change_status(RoomStatus::Answering)?;
        save_room(state, &room).await?;
    }

    info!(room_id = %room_id, "discussion skipped");
    state
        .publisher()
        .publish(DomainEvent::new(EventKind::DiscussionSkipped, room_id));
    Ok(())
}

/// Leader submits the final answer: `answering -> checking`.
pub async fn submit_answer(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
    answer: &str,
) -> Result<(), ServiceError> {
    {
        let _gate = state.gates().lock(room_id).await;
        let mut room = load_room(state, room_id).await?;
        ensure_leader(state, room_id, user_id).await?;
        room.set_answer(answer)?;
        room.change_status(RoomStatus::Checking)?;
        save_room(state, &room).await?;
    }

    info!(room_id = %room_id, "answer submitted");
    state
        .publisher()
        .publish(DomainEvent::new(EventKind::AnswerSubmitted, room_id));
    Ok(())
}

/// Host closes the room: `checking -> finished`.
pub async fn finish_game(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    {
        let _gate = state.gates().lock(room_id).await;
        let mut room = load_room(state, room_id).await?;
        ensure_host(&room, user_id, "finish the game")?;
        room.change_status(RoomStatus::Finished)?;
        save_room(state, &room).await?;
    }

    info!(room_id = %room_id, "game finished");
    state
        .publisher()
        .publish(DomainEvent::new(EventKind::GameFinished, room_id));
    Ok(())
}

/// Live `SUBMIT_TOPIC`: store the round material and assignments, and move to `discussing`
/// when the topic is already known.
pub async fn start_discussion(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
    round: &RoundPayload,
) -> Result<DiscussionOutcome, ServiceError> {
    let _gate = state.gates().lock(room_id).await;
    let mut room = load_room(state, room_id).await?;
    ensure_host(&room, user_id, "submit the round")?;

    if !matches!(
        room.status(),
        RoomStatus::SettingTopic | RoomStatus::Discussing
    ) {
        return Err(ServiceError::InvalidState(format!(
            "cannot start a discussion while {}",
            room.status()
        )));
    }

    room.set_game_data(
        round.original_emojis.clone(),
        round.displayed_emojis.clone(),
        round.dummy_index,
        &round.dummy_emoji,
    )?;
    let participants = load_participants(state, room_id).await?;
    room.set_assignments(Assignment::distribute(
        &participants,
        &round.displayed_emojis,
    ));

    let transitioned = room.status() == RoomStatus::SettingTopic && room.topic().is_some();
    if transitioned {
        room.change_status(RoomStatus::Discussing)?;
    }
    save_room(state, &room).await?;

    info!(
        room_id = %room_id,
        assignments = room.assignments().len(),
        status = %room.status(),
        "round material submitted"
    );
    Ok(DiscussionOutcome { room, transitioned })
}

/// Live `ANSWERING`: record the leader's answer and round material and move to `checking`.
///
/// A room still discussing passes through `answering` on the way.
pub async fn submit_final_answer(
    state: &SharedState,
    room_id: Uuid,
    user_id: Uuid,
    payload: &AnsweringPayload,
) -> Result<Room, ServiceError> {
    let _gate = state.gates().lock(room_id).await;
    let mut room = load_room(state, room_id).await?;
    ensure_leader(state, room_id, user_id).await?;

    room.set_answer(&payload.answer)?;
    room.set_game_data(
        payload.round.original_emojis.clone(),
        payload.round.displayed_emojis.clone(),
        payload.round.dummy_index,
        &payload.round.dummy_emoji,
    )?;
    if room.status() == RoomStatus::Discussing {
        room.change_status(RoomStatus::Answering)?;
    }
    room.change_status(RoomStatus::Checking)?;
    save_room(state, &room).await?;

    info!(room_id = %room_id, "final answer submitted");
    Ok(room)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::future::BoxFuture;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            memory::MemoryStore,
            models::ThemeEntity,
            storage::{StorageError, StorageResult},
            store::RoomStore,
        },
        services::{live_events, user_service},
        dto::room::JoinRoomRequest,
        state::{AppState, Stores},
    };

    pub(crate) async fn test_state() -> SharedState {
        test_state_with(AppConfig::default()).await
    }

    pub(crate) async fn test_state_with(config: AppConfig) -> SharedState {
        let store = MemoryStore::with_themes([ThemeEntity {
            id: Uuid::new_v4(),
            title: "Mona Lisa".into(),
            hint: "A smile in the Louvre".into(),
        }])
        .await;
        let state = AppState::new(config, Stores::memory(store));
        live_events::subscribe(&state);
        state
    }

    /// Room with a host and `players` joined players.
    pub(crate) async fn room_with_players(
        state: &SharedState,
        players: usize,
    ) -> (Uuid, Uuid, Vec<Uuid>) {
        let created = create_room(state).await.unwrap();
        let mut player_ids = Vec::new();
        for index in 0..players {
            let joined = user_service::join_room(
                state,
                JoinRoomRequest {
                    room_code: created.room_code.clone(),
                    user_name: format!("player-{index}"),
                },
            )
            .await
            .unwrap();
            player_ids.push(joined.user_id);
        }
        (created.room_id, created.user_id, player_ids)
    }

    /// Force a stored room into `status`, bypassing the transition table.
    pub(crate) async fn force_status(state: &SharedState, room_id: Uuid, status: RoomStatus) {
        let mut entity = state.rooms().find_by_id(room_id).await.unwrap();
        entity.status = status;
        state.rooms().save(entity).await.unwrap();
    }

    pub(crate) fn round() -> RoundPayload {
        RoundPayload {
            displayed_emojis: vec!["🎨".into(), "🍕".into(), "🖼️".into(), "😊".into()],
            original_emojis: vec!["🎨".into(), "🖼️".into(), "😊".into()],
            dummy_index: 3,
            dummy_emoji: "🍕".into(),
        }
    }

    pub(crate) fn topic_request(user_id: Uuid, with_round: bool) -> SetTopicRequest {
        let round = round();
        SetTopicRequest {
            user_id,
            topic: "Famous paintings".into(),
            displayed_emojis: if with_round { round.displayed_emojis } else { Vec::new() },
            original_emojis: if with_round { round.original_emojis } else { Vec::new() },
            dummy_index: round.dummy_index,
            dummy_emoji: round.dummy_emoji,
        }
    }

    /// Skip frames until a `STATE_UPDATE` announcing `next_state` arrives.
    pub(crate) async fn state_update(
        rx: &mut mpsc::Receiver<axum::extract::ws::Utf8Bytes>,
        next_state: &str,
    ) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("expected a broadcast")
                .expect("connection closed");
            let value: Value = serde_json::from_str(frame.as_str()).unwrap();
            if value["type"] == "STATE_UPDATE" && value["payload"]["nextState"] == next_state {
                return value["payload"].clone();
            }
        }
    }

    #[tokio::test]
    async fn create_room_seeds_host_and_code() {
        let state = test_state().await;
        let created = create_room(&state).await.unwrap();
        assert_eq!(created.theme, "Mona Lisa");
        assert!(RoomCode::parse(&created.room_code).is_ok());

        let room = load_room(&state, created.room_id).await.unwrap();
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert!(room.is_host(created.user_id));

        let participants = fetch_participants(&state, created.room_id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].role, Role::Host);
        assert_eq!(participants[0].user_name, "Host");
        assert!(!participants[0].is_leader);
    }

    #[tokio::test]
    async fn only_the_host_starts_the_game() {
        let state = test_state().await;
        let (room_id, host, players) = room_with_players(&state, 1).await;

        let err = start_game(&state, room_id, players[0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        start_game(&state, room_id, host).await.unwrap();
        let room = load_room(&state, room_id).await.unwrap();
        assert_eq!(room.status(), RoomStatus::SettingTopic);
        assert!(room.started_at().is_some());

        let err = start_game(&state, room_id, host).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn set_topic_only_while_setting_topic() {
        let state = test_state().await;
        let (room_id, host, _) = room_with_players(&state, 1).await;

        let err = set_topic(&state, room_id, topic_request(host, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(load_room(&state, room_id).await.unwrap().topic().is_none());

        start_game(&state, room_id, host).await.unwrap();
        set_topic(&state, room_id, topic_request(host, false))
            .await
            .unwrap();
        let room = load_room(&state, room_id).await.unwrap();
        assert_eq!(room.topic().unwrap().as_str(), "Famous paintings");
        assert_eq!(room.status(), RoomStatus::SettingTopic);
    }

    #[tokio::test]
    async fn set_topic_with_round_starts_the_discussion() {
        let state = test_state().await;
        let (room_id, host, players) = room_with_players(&state, 2).await;
        start_game(&state, room_id, host).await.unwrap();

        set_topic(&state, room_id, topic_request(host, true))
            .await
            .unwrap();
        let room = load_room(&state, room_id).await.unwrap();
        assert_eq!(room.status(), RoomStatus::Discussing);
        let assigned: Vec<_> = room.assignments().iter().map(|a| a.user_id).collect();
        assert_eq!(assigned, players);
    }

    #[tokio::test]
    async fn skip_discussion_is_host_only() {
        let state = test_state().await;
        let (room_id, host, players) = room_with_players(&state, 1).await;
        start_game(&state, room_id, host).await.unwrap();
        set_topic(&state, room_id, topic_request(host, true))
            .await
            .unwrap();
        assert_eq!(
            load_room(&state, room_id).await.unwrap().game_data().unwrap().dummy_index,
            3
        );

        let err = skip_discussion(&state, room_id, players[0])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(
            load_room(&state, room_id).await.unwrap().status(),
            RoomStatus::Discussing
        );

        skip_discussion(&state, room_id, host).await.unwrap();
        assert_eq!(
            load_room(&state, room_id).await.unwrap().status(),
            RoomStatus::Answering
        );
    }

    #[tokio::test]
    async fn skip_discussion_needs_round_material() {
        let state = test_state().await;
        let (room_id, host, _) = room_with_players(&state, 1).await;
        force_status(&state, room_id, RoomStatus::Discussing).await;

        let err = skip_discussion(&state, room_id, host).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn leader_answer_broadcasts_checking_with_theme() {
        let state = test_state().await;
        let (room_id, host, players) = room_with_players(&state, 2).await;
        start_game(&state, room_id, host).await.unwrap();
        set_topic(&state, room_id, topic_request(host, true))
            .await
            .unwrap();
        skip_discussion(&state, room_id, host).await.unwrap();

        let (_, mut rx) = state.hub().register(room_id).await;

        let err = submit_answer(&state, room_id, players[1], "Mona Lisa")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        submit_answer(&state, room_id, players[0], "Mona Lisa")
            .await
            .unwrap();
        assert_eq!(
            load_room(&state, room_id).await.unwrap().status(),
            RoomStatus::Checking
        );

        let update = state_update(&mut rx, "checking").await;
        assert_eq!(update["data"]["answer"], "Mona Lisa");
        assert_eq!(update["data"]["theme"], "Mona Lisa");
        assert_eq!(update["data"]["topic"], "Famous paintings");
        assert_eq!(update["data"]["dummyIndex"], 3);
    }

    #[tokio::test]
    async fn finish_requires_checking() {
        let state = test_state().await;
        let (room_id, host, _) = room_with_players(&state, 1).await;
        let err = finish_game(&state, room_id, host).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        force_status(&state, room_id, RoomStatus::Checking).await;
        finish_game(&state, room_id, host).await.unwrap();
        assert_eq!(
            load_room(&state, room_id).await.unwrap().status(),
            RoomStatus::Finished
        );
    }

    #[tokio::test]
    async fn live_round_waits_for_the_topic() {
        let state = test_state().await;
        let (room_id, host, players) = room_with_players(&state, 1).await;
        start_game(&state, room_id, host).await.unwrap();

        let err = start_discussion(&state, room_id, players[0], &round())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let outcome = start_discussion(&state, room_id, host, &round()).await.unwrap();
        assert!(!outcome.transitioned);
        assert_eq!(outcome.room.status(), RoomStatus::SettingTopic);

        set_topic(&state, room_id, topic_request(host, false))
            .await
            .unwrap();
        let room = load_room(&state, room_id).await.unwrap();
        assert_eq!(room.status(), RoomStatus::Discussing);
        assert_eq!(room.assignments().len(), 1);
    }

    #[tokio::test]
    async fn final_answer_from_discussion_reaches_checking() {
        let state = test_state().await;
        let (room_id, host, players) = room_with_players(&state, 1).await;
        start_game(&state, room_id, host).await.unwrap();
        set_topic(&state, room_id, topic_request(host, true))
            .await
            .unwrap();

        let payload = AnsweringPayload {
            answer: "Mona Lisa".into(),
            round: round(),
        };
        let err = submit_final_answer(&state, room_id, host, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let room = submit_final_answer(&state, room_id, players[0], &payload)
            .await
            .unwrap();
        assert_eq!(room.status(), RoomStatus::Checking);
        assert_eq!(room.answer().unwrap().as_str(), "Mona Lisa");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_topic_and_discussion_start_keep_both_writes() {
        for _ in 0..25 {
            let state = test_state().await;
            let (room_id, host, _) = room_with_players(&state, 2).await;
            start_game(&state, room_id, host).await.unwrap();

            let http = {
                let state = state.clone();
                tokio::spawn(async move {
                    set_topic(&state, room_id, topic_request(host, false)).await
                })
            };
            let live = {
                let state = state.clone();
                tokio::spawn(async move { start_discussion(&state, room_id, host, &round()).await })
            };
            http.await.unwrap().unwrap();
            live.await.unwrap().unwrap();

            let room = load_room(&state, room_id).await.unwrap();
            assert_eq!(room.topic().unwrap().as_str(), "Famous paintings");
            assert_eq!(room.game_data().unwrap().dummy_index, 3);
            assert_eq!(room.assignments().len(), 2);
            assert_eq!(room.status(), RoomStatus::Discussing);
        }
    }

    struct UnavailableRooms;

    impl RoomStore for UnavailableRooms {
        fn find_by_id(&self, _id: Uuid) -> BoxFuture<'static, StorageResult<RoomEntity>> {
            Box::pin(async { Err(outage()) })
        }

        fn find_by_code(&self, _code: String) -> BoxFuture<'static, StorageResult<RoomEntity>> {
            Box::pin(async { Err(outage()) })
        }

        fn save(&self, _room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(outage()) })
        }

        fn delete(&self, _id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(outage()) })
        }
    }

    fn outage() -> StorageError {
        StorageError::unavailable(
            "database offline".into(),
            std::io::Error::other("connection refused"),
        )
    }

    #[tokio::test]
    async fn storage_outage_is_reported_as_unavailable() {
        let mut stores = Stores::memory(MemoryStore::new());
        stores.rooms = Arc::new(UnavailableRooms);
        let state = AppState::new(AppConfig::default(), stores);

        let err = start_game(&state, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));

        let err = fetch_room(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_room_is_not_found() {
        let state = test_state().await;
        let err = fetch_room(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
