use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{ParticipantEntity, UserEntity},
    dto::room::{JoinRoomRequest, JoinRoomResponse},
    error::ServiceError,
    services::room_service::load_participants,
    state::{
        SharedState,
        participant::{Participant, Role},
    },
};

/// Join a room by code, creating the user and its participant record.
///
/// The first non-host participant becomes the leader. The decision is taken under the room
/// gate so two simultaneous joiners cannot both observe an empty room.
pub async fn join_room(
    state: &SharedState,
    request: JoinRoomRequest,
) -> Result<JoinRoomResponse, ServiceError> {
    let room = state.rooms().find_by_code(request.room_code.clone()).await?;

    let user = UserEntity {
        id: Uuid::new_v4(),
        name: request.user_name,
        created_at: SystemTime::now(),
    };
    state.users().save(user.clone()).await?;

    let participant = {
        let _gate = state.gates().lock(room.id).await;
        let is_leader = !load_participants(state, room.id)
            .await?
            .iter()
            .any(|participant| !participant.is_host());
        let participant = Participant::new(room.id, user.id, Role::Player, is_leader);
        state
            .participants()
            .save(ParticipantEntity::from(&participant))
            .await?;
        participant
    };

    info!(
        room_id = %room.id,
        user_id = %user.id,
        is_leader = participant.is_leader,
        "user joined room"
    );
    Ok(JoinRoomResponse {
        room_id: room.id,
        user_id: user.id,
        is_leader: participant.is_leader,
    })
}
