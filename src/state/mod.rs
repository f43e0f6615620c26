//! Library progress events.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late-joining clients can catch up.

use anilib_common::{AnimeId, EpisodeId, LibraryStatus};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Pipeline step an item failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Anime,
    Episode,
    Sweep,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    StatusChanged {
        status: LibraryStatus,
    },
    ScanStarted {
        directories: usize,
    },
    AnimeCreated {
        anime_id: AnimeId,
        title: String,
        folder_path: PathBuf,
    },
    EpisodeCreated {
        episode_id: EpisodeId,
        anime_id: AnimeId,
        title: String,
        transcoded: bool,
    },
    ItemFailed {
        path: PathBuf,
        stage: ScanStage,
        message: String,
    },
    SweepCompleted {
        animes_removed: usize,
        episodes_removed: usize,
        originals_deleted: usize,
    },
    ScanCompleted {
        animes_created: usize,
        episodes_created: usize,
        failures: usize,
        cancelled: bool,
    },
    ScanFailed {
        message: String,
    },
}

impl EventPayload {
    /// One-line human-readable rendering for progress displays.
    pub fn status_message(&self) -> String {
        match self {
            EventPayload::StatusChanged { status } => format!("Library is {status}"),
            EventPayload::ScanStarted { directories } => {
                format!("Updating library ({directories} watch directories)")
            }
            EventPayload::AnimeCreated { title, .. } => format!("Added anime {title}"),
            EventPayload::EpisodeCreated {
                title, transcoded, ..
            } => {
                if *transcoded {
                    format!("Added episode {title} (transcoded)")
                } else {
                    format!("Added episode {title}")
                }
            }
            EventPayload::ItemFailed { path, message, .. } => {
                format!("Failed {}: {message}", path.display())
            }
            EventPayload::SweepCompleted {
                animes_removed,
                episodes_removed,
                originals_deleted,
            } => format!(
                "Removed {animes_removed} missing anime and {episodes_removed} missing episodes, \
                 deleted {originals_deleted} converted originals"
            ),
            EventPayload::ScanCompleted {
                animes_created,
                episodes_created,
                failures,
                cancelled,
            } => {
                let verb = if *cancelled { "cancelled" } else { "updated" };
                format!(
                    "Library {verb}: {animes_created} anime, {episodes_created} episodes added, \
                     {failures} failures"
                )
            }
            EventPayload::ScanFailed { message } => format!("Library update failed: {message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn broadcast(&self, payload: EventPayload) {
        let event = Event::new(payload);
        tracing::debug!(message = %event.payload.status_message(), "Library event");

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // Ignore send errors (no subscribers).
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
