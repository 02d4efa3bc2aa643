//! In-process publish/subscribe bridge between room use cases and the live layer.

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::{FutureExt, future::BoxFuture};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{error::ServiceError, state::state_machine::RoomStatus};

/// Kinds of room events handlers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Host started the game.
    GameStarted,
    /// Room entered `discussing`.
    DiscussionStarted,
    /// Host ended the discussion early.
    DiscussionSkipped,
    /// Leader submitted the final answer.
    AnswerSubmitted,
    /// Host closed the room.
    GameFinished,
}

impl EventKind {
    /// Every kind, used to subscribe a handler to all of them.
    pub const ALL: [EventKind; 5] = [
        EventKind::GameStarted,
        EventKind::DiscussionStarted,
        EventKind::DiscussionSkipped,
        EventKind::AnswerSubmitted,
        EventKind::GameFinished,
    ];

    /// Status the room is in once the event has happened.
    pub fn status(&self) -> RoomStatus {
        match self {
            EventKind::GameStarted => RoomStatus::SettingTopic,
            EventKind::DiscussionStarted => RoomStatus::Discussing,
            EventKind::DiscussionSkipped => RoomStatus::Answering,
            EventKind::AnswerSubmitted => RoomStatus::Checking,
            EventKind::GameFinished => RoomStatus::Finished,
        }
    }
}

/// Fire-and-forget notification that a room changed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    /// What happened.
    pub kind: EventKind,
    /// Room it happened to.
    pub room_id: Uuid,
    /// Publication time.
    pub occurred_at: SystemTime,
}

impl DomainEvent {
    /// Event stamped with the current time.
    pub fn new(kind: EventKind, room_id: Uuid) -> Self {
        Self {
            kind,
            room_id,
            occurred_at: SystemTime::now(),
        }
    }

    /// Fixed status label carried by the event.
    pub fn status(&self) -> RoomStatus {
        self.kind.status()
    }
}

/// Type-erased subscriber.
pub type EventHandler =
    Arc<dyn Fn(DomainEvent) -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync>;

/// Registry of handlers keyed by event kind.
#[derive(Default)]
pub struct EventPublisher {
    handlers: DashMap<EventKind, Vec<EventHandler>>,
}

impl EventPublisher {
    /// Publisher without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`. Subscriptions live as long as the publisher.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let handler: EventHandler = Arc::new(move |event| handler(event).boxed());
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Spawn one task per handler registered for the event kind and return how many were
    /// dispatched. Must be called from within a Tokio runtime.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let handlers = match self.handlers.get(&event.kind) {
            Some(entry) => entry.value().clone(),
            None => {
                debug!(kind = ?event.kind, room_id = %event.room_id, "no handler for event");
                return 0;
            }
        };

        for handler in handlers.iter().cloned() {
            let event = event.clone();
            tokio::spawn(async move {
                let outcome = AssertUnwindSafe(async { handler(event.clone()).await })
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(
                            kind = ?event.kind,
                            room_id = %event.room_id,
                            error = %err,
                            "event handler failed"
                        );
                    }
                    Err(panic) => {
                        error!(
                            kind = ?event.kind,
                            room_id = %event.room_id,
                            panic = panic_message(panic.as_ref()),
                            "event handler panicked"
                        );
                    }
                }
            });
        }

        handlers.len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
