//! Registry of live connections grouped by room, with fan-out broadcast.

use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Hub-side handle of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveConnection {
    /// Connection identifier.
    pub id: Uuid,
    /// Room the connection is attached to.
    pub room_id: Uuid,
}

type RoomConnections = HashMap<Uuid, mpsc::Sender<Utf8Bytes>>;

/// Connection registry. The hub owns the only sender of every outbound buffer, so removing a
/// connection from the registry is what closes its buffer.
pub struct ConnectionHub {
    rooms: Mutex<HashMap<Uuid, RoomConnections>>,
    buffer: usize,
}

impl ConnectionHub {
    /// `buffer` is the number of frames a connection may lag behind before it is evicted.
    pub fn new(buffer: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Attach a new connection to `room_id` and hand back its outbound buffer.
    pub async fn register(&self, room_id: Uuid) -> (LiveConnection, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let connection = LiveConnection {
            id: Uuid::new_v4(),
            room_id,
        };
        self.rooms
            .lock()
            .await
            .entry(room_id)
            .or_default()
            .insert(connection.id, tx);
        debug!(room_id = %room_id, connection_id = %connection.id, "live connection registered");
        (connection, rx)
    }

    /// Detach a connection. Detaching an unknown connection does nothing.
    pub async fn unregister(&self, connection: &LiveConnection) {
        let mut rooms = self.rooms.lock().await;
        if remove_connection(&mut rooms, connection) {
            debug!(
                room_id = %connection.room_id,
                connection_id = %connection.id,
                "live connection unregistered"
            );
        }
    }

    /// Serialize `message` once and offer it to every connection of the room. Returns how many
    /// connections accepted it.
    pub async fn broadcast<T>(&self, room_id: Uuid, message: &T) -> usize
    where
        T: ?Sized + Serialize,
    {
        let Some(frame) = encode(message) else {
            return 0;
        };

        let mut rooms = self.rooms.lock().await;
        let Some(connections) = rooms.get_mut(&room_id) else {
            return 0;
        };

        let before = connections.len();
        connections.retain(|connection_id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    room_id = %room_id,
                    connection_id = %connection_id,
                    error = %err,
                    "evicting live connection"
                );
                false
            }
        });
        let delivered = connections.len();
        if delivered == 0 {
            rooms.remove(&room_id);
        }
        if delivered < before {
            debug!(room_id = %room_id, evicted = before - delivered, "slow consumers evicted");
        }
        delivered
    }

    /// Offer `message` to a single connection, evicting it on failure.
    pub async fn send_to<T>(&self, connection: &LiveConnection, message: &T) -> bool
    where
        T: ?Sized + Serialize,
    {
        let Some(frame) = encode(message) else {
            return false;
        };

        let mut rooms = self.rooms.lock().await;
        let Some(tx) = rooms
            .get(&connection.room_id)
            .and_then(|connections| connections.get(&connection.id))
        else {
            return false;
        };

        match tx.try_send(frame) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    room_id = %connection.room_id,
                    connection_id = %connection.id,
                    error = %err,
                    "evicting live connection"
                );
                remove_connection(&mut rooms, connection);
                false
            }
        }
    }

    /// Number of connections attached to `room_id`.
    pub async fn connection_count(&self, room_id: Uuid) -> usize {
        self.rooms
            .lock()
            .await
            .get(&room_id)
            .map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one connection.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

fn encode<T>(message: &T) -> Option<Utf8Bytes>
where
    T: ?Sized + Serialize,
{
    match serde_json::to_string(message) {
        Ok(text) => Some(Utf8Bytes::from(text)),
        Err(err) => {
            warn!(error = %err, "failed to serialize live message");
            None
        }
    }
}

/// Drop the connection and its room entry if it was the last one.
fn remove_connection(rooms: &mut HashMap<Uuid, RoomConnections>, connection: &LiveConnection) -> bool {
    let Some(connections) = rooms.get_mut(&connection.room_id) else {
        return false;
    };
    let removed = connections.remove(&connection.id).is_some();
    if connections.is_empty() {
        rooms.remove(&connection.room_id);
    }
    removed
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;

    fn text(frame: Utf8Bytes) -> Value {
        serde_json::from_str(frame.as_str()).unwrap()
    }

    #[tokio::test]
    async fn broadcast_stays_inside_the_room() {
        let hub = ConnectionHub::new(8);
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let (_, mut first) = hub.register(room_a).await;
        let (_, mut second) = hub.register(room_a).await;
        let (_, mut outsider) = hub.register(room_b).await;

        assert_eq!(hub.broadcast(room_a, &json!({"hello": "a"})).await, 2);

        assert_eq!(text(first.recv().await.unwrap()), json!({"hello": "a"}));
        assert_eq!(text(second.recv().await.unwrap()), json!({"hello": "a"}));
        assert_eq!(outsider.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn last_unregister_removes_the_room() {
        let hub = ConnectionHub::new(8);
        let room_id = Uuid::new_v4();
        let (first, _rx1) = hub.register(room_id).await;
        let (second, _rx2) = hub.register(room_id).await;
        assert_eq!(hub.room_count().await, 1);

        hub.unregister(&first).await;
        assert_eq!(hub.connection_count(room_id).await, 1);
        hub.unregister(&second).await;
        assert_eq!(hub.room_count().await, 0);

        hub.unregister(&second).await;
        assert_eq!(hub.room_count().await, 0);
        assert_eq!(hub.broadcast(room_id, &json!({})).await, 0);
    }

    #[tokio::test]
    async fn full_buffer_evicts_and_closes_once() {
        let hub = ConnectionHub::new(1);
        let room_id = Uuid::new_v4();
        let (slow, mut slow_rx) = hub.register(room_id).await;
        let (_, mut fast_rx) = hub.register(room_id).await;

        assert_eq!(hub.broadcast(room_id, &json!({"n": 1})).await, 2);
        assert_eq!(text(fast_rx.recv().await.unwrap()), json!({"n": 1}));

        assert_eq!(hub.broadcast(room_id, &json!({"n": 2})).await, 1);
        assert_eq!(hub.connection_count(room_id).await, 1);

        assert_eq!(text(slow_rx.recv().await.unwrap()), json!({"n": 1}));
        assert!(slow_rx.recv().await.is_none());
        assert_eq!(text(fast_rx.recv().await.unwrap()), json!({"n": 2}));

        hub.unregister(&slow).await;
        assert_eq!(hub.connection_count(room_id).await, 1);
    }

    #[tokio::test]
    async fn send_to_targets_one_connection() {
        let hub = ConnectionHub::new(4);
        let room_id = Uuid::new_v4();
        let (target, mut target_rx) = hub.register(room_id).await;
        let (_, mut other_rx) = hub.register(room_id).await;

        assert!(hub.send_to(&target, &json!({"only": "you"})).await);
        assert_eq!(text(target_rx.recv().await.unwrap()), json!({"only": "you"}));
        assert_eq!(other_rx.try_recv().unwrap_err(), TryRecvError::Empty);

        drop(target_rx);
        assert!(!hub.send_to(&target, &json!({})).await);
        assert_eq!(hub.connection_count(room_id).await, 1);
    }
}
