//! Per-room discussion countdown broadcasting `TIMER_TICK` frames.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::{
    sync::{Mutex, watch},
    time::{Instant, interval_at, sleep},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{dto::ws::ServerMessage, state::hub::ConnectionHub};

/// Durations driving a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    /// Length of the discussion.
    pub duration: Duration,
    /// Grace period before the first tick.
    pub start_delay: Duration,
    /// Tick cadence, also the amount removed from the remaining time on each tick.
    pub tick: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(300),
            start_delay: Duration::from_secs(5),
            tick: Duration::from_secs(1),
        }
    }
}

struct TimerEntry {
    generation: u64,
    /// Shared with the countdown task; a tick is only sent while holding this lock.
    stopped: Arc<Mutex<bool>>,
    stop_tx: watch::Sender<bool>,
}

impl TimerEntry {
    async fn stop(self) {
        *self.stopped.lock().await = true;
        let _ = self.stop_tx.send(true);
    }
}

/// At most one countdown per room.
pub struct RoomTimers {
    hub: Arc<ConnectionHub>,
    settings: TimerSettings,
    timers: Arc<DashMap<Uuid, TimerEntry>>,
    generations: AtomicU64,
}

impl RoomTimers {
    /// Timers broadcasting through `hub`.
    pub fn new(hub: Arc<ConnectionHub>, settings: TimerSettings) -> Self {
        Self {
            hub,
            settings,
            timers: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Replace any countdown of the room with a fresh one. Returns without waiting for the
    /// grace period.
    pub async fn start(&self, room_id: Uuid) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let stopped = Arc::new(Mutex::new(false));
        let (stop_tx, stop_rx) = watch::channel(false);

        let previous = self.timers.insert(
            room_id,
            TimerEntry {
                generation,
                stopped: stopped.clone(),
                stop_tx,
            },
        );
        if let Some(previous) = previous {
            debug!(room_id = %room_id, "replacing running countdown");
            previous.stop().await;
        }

        info!(room_id = %room_id, duration = ?self.settings.duration, "countdown scheduled");
        tokio::spawn(run_countdown(
            self.hub.clone(),
            self.timers.clone(),
            self.settings,
            room_id,
            generation,
            stopped,
            stop_rx,
        ));
    }

    /// Cancel the room countdown, pending or running. No tick is sent after this returns.
    pub async fn stop(&self, room_id: Uuid) {
        if let Some((_, entry)) = self.timers.remove(&room_id) {
            entry.stop().await;
            info!(room_id = %room_id, "countdown stopped");
        }
    }

    /// Whether a countdown is scheduled or running for the room.
    pub fn is_active(&self, room_id: Uuid) -> bool {
        self.timers.contains_key(&room_id)
    }

    /// Number of rooms with a countdown.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

async fn run_countdown(
    hub: Arc<ConnectionHub>,
    timers: Arc<DashMap<Uuid, TimerEntry>>,
    settings: TimerSettings,
    room_id: Uuid,
    generation: u64,
    stopped: Arc<Mutex<bool>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = sleep(settings.start_delay) => {}
        _ = stop_rx.changed() => return,
    }

    let mut remaining = settings.duration;
    let mut ticker = interval_at(Instant::now() + settings.tick, settings.tick);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop_rx.changed() => return,
        }

        remaining = remaining.saturating_sub(settings.tick);
        {
            let stopped = stopped.lock().await;
            if *stopped {
                return;
            }
            hub.broadcast(room_id, &ServerMessage::timer_tick(format_remaining(remaining)))
                .await;
        }

        if remaining.is_zero() {
            break;
        }
    }

    timers.remove_if(&room_id, |_, entry| entry.generation == generation);
    info!(room_id = %room_id, "countdown finished");
}

/// Render a duration as `MM:SS`, minutes uncapped.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
