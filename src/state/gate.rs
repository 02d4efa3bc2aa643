use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed mutexes serializing read-modify-write cycles on a single room.
///
/// Entries only live while someone holds or waits for them, so deleted rooms leave nothing behind.
#[derive(Default)]
pub struct RoomGates {
    gates: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RoomGates {
    /// Empty gate table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `room_id`. Access lasts as long as the guard.
    pub async fn lock(&self, room_id: Uuid) -> RoomGuard<'_> {
        // Cloned under the shard lock, so pruning never races a new waiter.
        let gate = self.gates.entry(room_id).or_default().clone();
        let guard = gate.lock_owned().await;
        RoomGuard {
            guard: Some(guard),
            gates: &self.gates,
            room_id,
        }
    }

    /// Number of rooms currently locked or awaited.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Whether no room is locked or awaited.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Exclusive access to one room, released on drop.
pub struct RoomGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    gates: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    room_id: Uuid,
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.gates
            .remove_if(&self.room_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn same_room_waits_other_rooms_do_not() {
        let gates = RoomGates::new();
        let room_id = Uuid::new_v4();
        let held = gates.lock(room_id).await;

        assert!(
            timeout(Duration::from_millis(50), gates.lock(room_id))
                .await
                .is_err()
        );
        assert!(
            timeout(Duration::from_millis(50), gates.lock(Uuid::new_v4()))
                .await
                .is_ok()
        );

        drop(held);
        assert!(
            timeout(Duration::from_millis(50), gates.lock(room_id))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn released_gates_are_pruned() {
        let gates = RoomGates::new();
        let held = gates.lock(Uuid::new_v4()).await;
        assert_eq!(gates.len(), 1);

        drop(held);
        assert!(gates.is_empty());
    }

    #[tokio::test]
    async fn gate_survives_while_a_waiter_queues() {
        let gates = Arc::new(RoomGates::new());
        let room_id = Uuid::new_v4();
        let held = gates.lock(room_id).await;

        let waiter = tokio::spawn({
            let gates = gates.clone();
            async move {
                let _gate = gates.lock(room_id).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(gates.len(), 1);

        waiter.await.unwrap();
        assert!(gates.is_empty());
    }

    #[tokio::test]
    async fn concurrent_lockers_leave_no_entries() {
        let gates = Arc::new(RoomGates::new());
        let rooms = [Uuid::new_v4(), Uuid::new_v4()];

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let gates = gates.clone();
                let room_id = rooms[i % 2];
                tokio::spawn(async move {
                    let _gate = gates.lock(room_id).await;
                    tokio::task::yield_now().await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(gates.is_empty());
    }

    #[tokio::test]
    async fn abandoned_waiter_is_pruned_once_the_holder_leaves() {
        let gates = RoomGates::new();
        let room_id = Uuid::new_v4();
        let held = gates.lock(room_id).await;

        assert!(
            timeout(Duration::from_millis(20), gates.lock(room_id))
                .await
                .is_err()
        );

        drop(held);
        assert!(gates.is_empty());
    }
}
