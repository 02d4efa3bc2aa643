//! Process-local storage backend used by the binary and by the service tests.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{ParticipantEntity, RoomEntity, ThemeEntity, UserEntity},
    storage::{StorageError, StorageResult},
    store::{ParticipantStore, RoomStore, ThemeStore, UserStore},
};

#[derive(Default)]
struct Tables {
    rooms: HashMap<Uuid, RoomEntity>,
    /// Keyed by participant id; insertion order is join order.
    participants: IndexMap<Uuid, ParticipantEntity>,
    themes: IndexMap<Uuid, ThemeEntity>,
    users: HashMap<Uuid, UserEntity>,
}

/// In-memory implementation of every store trait, cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose theme catalog is pre-populated.
    pub async fn with_themes(themes: impl IntoIterator<Item = ThemeEntity>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().await;
            for theme in themes {
                tables.themes.insert(theme.id, theme);
            }
        }
        store
    }
}

impl RoomStore for MemoryStore {
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables
                .read()
                .await
                .rooms
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("room", id))
        })
    }

    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables
                .read()
                .await
                .rooms
                .values()
                .find(|room| room.code == code)
                .cloned()
                .ok_or_else(|| StorageError::not_found("room code", code))
        })
    }

    fn save(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.rooms.insert(room.id, room);
            Ok(())
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            let mut guard = tables.write().await;
            if guard.rooms.remove(&id).is_none() {
                return Err(StorageError::not_found("room", id));
            }
            guard.participants.retain(|_, participant| participant.room_id != id);
            Ok(())
        })
    }
}

impl ParticipantStore for MemoryStore {
    fn find_by_room(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            Ok(tables
                .read()
                .await
                .participants
                .values()
                .filter(|participant| participant.room_id == room_id)
                .cloned()
                .collect())
        })
    }

    fn find_by_room_and_user(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<ParticipantEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables
                .read()
                .await
                .participants
                .values()
                .find(|participant| participant.room_id == room_id && participant.user_id == user_id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("participant", format!("{room_id}/{user_id}")))
        })
    }

    fn save(&self, participant: ParticipantEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables
                .write()
                .await
                .participants
                .insert(participant.id, participant);
            Ok(())
        })
    }
}

impl ThemeStore for MemoryStore {
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<ThemeEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables
                .read()
                .await
                .themes
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("theme", id))
        })
    }

    fn find_all(&self) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let tables = self.tables.clone();
        Box::pin(async move { Ok(tables.read().await.themes.values().cloned().collect()) })
    }

    fn save(&self, theme: ThemeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.themes.insert(theme.id, theme);
            Ok(())
        })
    }
}

impl UserStore for MemoryStore {
    fn find_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables
                .read()
                .await
                .users
                .get(&id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("user", id))
        })
    }

    fn save(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let tables = self.tables.clone();
        Box::pin(async move {
            tables.write().await.users.insert(user.id, user);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::state_machine::RoomStatus;

    fn room(code: &str) -> RoomEntity {
        RoomEntity {
            id: Uuid::new_v4(),
            code: code.into(),
            theme_id: Uuid::new_v4(),
            host_user_id: Uuid::new_v4(),
            topic: None,
            answer: None,
            status: RoomStatus::Waiting,
            game_data: None,
            assignments: Vec::new(),
            created_at: SystemTime::now(),
            started_at: None,
        }
    }

    fn participant(room_id: Uuid) -> ParticipantEntity {
        ParticipantEntity {
            id: Uuid::new_v4(),
            room_id,
            user_id: Uuid::new_v4(),
            role: "player".into(),
            is_leader: false,
            joined_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn missing_room_is_not_found() {
        let store = MemoryStore::new();
        let err = RoomStore::find_by_id(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = store.find_by_code("123456".into()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn room_lookup_by_code_after_save() {
        let store = MemoryStore::new();
        let saved = room("654321");
        RoomStore::save(&store, saved.clone()).await.unwrap();
        assert_eq!(store.find_by_code("654321".into()).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn participants_keep_join_order_per_room() {
        let store = MemoryStore::new();
        let room_id = Uuid::new_v4();
        let first = participant(room_id);
        let other_room = participant(Uuid::new_v4());
        let second = participant(room_id);
        for entity in [first.clone(), other_room, second.clone()] {
            ParticipantStore::save(&store, entity).await.unwrap();
        }

        let listed = store.find_by_room(room_id).await.unwrap();
        assert_eq!(listed, vec![first, second.clone()]);
        assert_eq!(
            store
                .find_by_room_and_user(room_id, second.user_id)
                .await
                .unwrap(),
            second
        );
    }

    #[tokio::test]
    async fn deleting_a_room_drops_its_participants() {
        let store = MemoryStore::new();
        let saved = room("111111");
        RoomStore::save(&store, saved.clone()).await.unwrap();
        ParticipantStore::save(&store, participant(saved.id))
            .await
            .unwrap();

        RoomStore::delete(&store, saved.id).await.unwrap();
        assert!(store.find_by_room(saved.id).await.unwrap().is_empty());
        assert!(RoomStore::delete(&store, saved.id).await.unwrap_err().is_not_found());
    }
}
