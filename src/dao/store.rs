use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{ParticipantEntity, RoomEntity, ThemeEntity, UserEntity};
use crate::dao::storage::StorageResult;

/// Persistence contract for rooms. Lookups of absent rooms fail with
/// [`StorageError::NotFound`](crate::dao::storage::StorageError::NotFound).
pub trait RoomStore: Send + Sync {
    /// Load a room by identifier.
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<RoomEntity>>;
    /// Load a room by its six digit code.
    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<RoomEntity>>;
    /// Upsert, last write wins.
    fn save(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a room and its participants.
    fn delete(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
}

/// Persistence contract for room memberships.
pub trait ParticipantStore: Send + Sync {
    /// Participants of a room in join order.
    fn find_by_room(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Membership of `user_id` in `room_id`.
    fn find_by_room_and_user(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<ParticipantEntity>>;
    /// Upsert a participant.
    fn save(&self, participant: ParticipantEntity) -> BoxFuture<'static, StorageResult<()>>;
}

/// Read access to the theme catalog.
pub trait ThemeStore: Send + Sync {
    /// Load a theme by identifier.
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<ThemeEntity>>;
    /// Every theme of the catalog.
    fn find_all(&self) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>>;
    /// Upsert a theme.
    fn save(&self, theme: ThemeEntity) -> BoxFuture<'static, StorageResult<()>>;
}

/// Persistence contract for user profiles.
pub trait UserStore: Send + Sync {
    /// Load a user by identifier.
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<UserEntity>>;
    /// Upsert a user.
    fn save(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
}
