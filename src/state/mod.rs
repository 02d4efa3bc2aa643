/// Domain events and their publisher.
pub mod events;
/// Per-room mutation gates.
pub mod gate;
/// Live connection registry.
pub mod hub;
/// Room membership.
pub mod participant;
/// Room aggregate.
pub mod room;
/// Room phases and transitions.
pub mod state_machine;
/// Discussion countdowns.
pub mod timer;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::{
        memory::MemoryStore,
        store::{ParticipantStore, RoomStore, ThemeStore, UserStore},
    },
};

use self::{events::EventPublisher, gate::RoomGates, hub::ConnectionHub, timer::RoomTimers};

/// Handle shared by routes, services and background tasks.
pub type SharedState = Arc<AppState>;

/// Storage collaborators the use cases depend on.
#[derive(Clone)]
pub struct Stores {
    /// Room persistence.
    pub rooms: Arc<dyn RoomStore>,
    /// Membership persistence.
    pub participants: Arc<dyn ParticipantStore>,
    /// Theme catalog.
    pub themes: Arc<dyn ThemeStore>,
    /// User profiles.
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Back every store with the same in-memory tables.
    pub fn memory(store: MemoryStore) -> Self {
        Self {
            rooms: Arc::new(store.clone()),
            participants: Arc::new(store.clone()),
            themes: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }
}

/// Central application state: storage handles plus the live room machinery.
pub struct AppState {
    config: AppConfig,
    stores: Stores,
    hub: Arc<ConnectionHub>,
    publisher: EventPublisher,
    timers: RoomTimers,
    gates: RoomGates,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// No event handler is installed; see [`crate::services::live_events::subscribe`].
    pub fn new(config: AppConfig, stores: Stores) -> SharedState {
        let hub = Arc::new(ConnectionHub::new(config.connection_buffer()));
        let timers = RoomTimers::new(hub.clone(), config.timer());
        Arc::new(Self {
            config,
            stores,
            hub,
            publisher: EventPublisher::new(),
            timers,
            gates: RoomGates::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Room persistence.
    pub fn rooms(&self) -> &Arc<dyn RoomStore> {
        &self.stores.rooms
    }

    /// Membership persistence.
    pub fn participants(&self) -> &Arc<dyn ParticipantStore> {
        &self.stores.participants
    }

    /// Theme catalog.
    pub fn themes(&self) -> &Arc<dyn ThemeStore> {
        &self.stores.themes
    }

    /// User profiles.
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.stores.users
    }

    /// Live connections grouped by room.
    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    /// Domain event bus.
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Discussion countdowns.
    pub fn timers(&self) -> &RoomTimers {
        &self.timers
    }

    /// Per-room mutation gates; every read-modify-write of a room holds one.
    pub fn gates(&self) -> &RoomGates {
        &self.gates
    }
}
