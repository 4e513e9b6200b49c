use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use crate::ws::events::ServerEvent;

/// Outbound events buffered per connection. A peer that falls further
/// behind than this loses events instead of stalling the session actor.
const OUTBOUND_QUEUE: usize = 64;

pub fn outbound_channel() -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
    mpsc::channel(OUTBOUND_QUEUE)
}

/// The host's outbound channel plus the handle that keeps its socket loop
/// alive. Dropping the entry closes the channel and resolves the loop's
/// shutdown receiver, so a replaced host connection actually terminates.
struct HostConnection {
    tx: mpsc::Sender<ServerEvent>,
    _shutdown: oneshot::Sender<()>,
}

#[derive(Default)]
struct SessionBucket {
    host: Option<HostConnection>,
    participants: HashMap<Uuid, mpsc::Sender<ServerEvent>>,
}

/// Live connections per session code. Buckets exist exactly as long as the
/// session does: opened when the session is created, dropped when its actor
/// drains. Delivery is best-effort: a send to a closed, missing or
/// backed-up connection inside a live bucket is dropped and counted, never
/// an error; sends to a removed session are silent no-ops. Bucket mutations
/// are serialized per code by the map's entry locking.
pub struct ConnectionRegistry {
    buckets: DashMap<String, SessionBucket>,
    dropped_sends: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            dropped_sends: AtomicU64::new(0),
        }
    }

    /// Creates the bucket for a freshly minted session code.
    pub fn open_session(&self, code: &str) {
        self.buckets.insert(code.to_string(), SessionBucket::default());
    }

    /// Attaches the host connection. An already connected host is replaced:
    /// its channel closes and its shutdown signal fires, ending the old
    /// socket loop. Returns false when the session is already gone.
    pub fn register_host(
        &self,
        code: &str,
        tx: mpsc::Sender<ServerEvent>,
        shutdown: oneshot::Sender<()>,
    ) -> bool {
        let Some(mut bucket) = self.buckets.get_mut(code) else {
            debug!("Host registration for removed session {}", code);
            return false;
        };

        if bucket.host.is_some() {
            debug!("Replacing host connection for session {}", code);
        }
        bucket.host = Some(HostConnection {
            tx,
            _shutdown: shutdown,
        });
        true
    }

    /// Attaches or replaces a participant connection and tells the host,
    /// best-effort. Returns false when the session is already gone.
    pub fn register_participant(
        &self,
        code: &str,
        participant_id: Uuid,
        display_name: &str,
        tx: mpsc::Sender<ServerEvent>,
    ) -> bool {
        let Some(mut bucket) = self.buckets.get_mut(code) else {
            debug!("Participant registration for removed session {}", code);
            return false;
        };
        bucket.participants.insert(participant_id, tx);

        if let Some(host) = &bucket.host {
            self.try_deliver(
                &host.tx,
                ServerEvent::ParticipantJoined {
                    participant_id,
                    display_name: display_name.to_string(),
                },
            );
        }
        true
    }

    /// Detaches the host connection, but only if `tx` is still the
    /// registered one. A stale connection tearing down after it was
    /// replaced must not evict its replacement. Returns whether the
    /// caller was the registered host.
    pub fn unregister_host(&self, code: &str, tx: &mpsc::Sender<ServerEvent>) -> bool {
        let Some(mut bucket) = self.buckets.get_mut(code) else {
            return false;
        };

        match &bucket.host {
            Some(host) if host.tx.same_channel(tx) => {
                bucket.host = None;
                true
            }
            _ => false,
        }
    }

    /// Detaches a participant connection under the same staleness rule as
    /// [`unregister_host`]: a rejoin replaces the sender, and the old
    /// connection's teardown must not remove the new one.
    pub fn unregister_participant(
        &self,
        code: &str,
        participant_id: Uuid,
        tx: &mpsc::Sender<ServerEvent>,
    ) -> bool {
        let Some(mut bucket) = self.buckets.get_mut(code) else {
            return false;
        };

        match bucket.participants.get(&participant_id) {
            Some(current) if current.same_channel(tx) => {
                bucket.participants.remove(&participant_id);
                true
            }
            _ => false,
        }
    }

    /// Drops the whole bucket. New sends and registrations for the code
    /// become no-ops.
    pub fn remove_session(&self, code: &str) {
        self.buckets.remove(code);
    }

    pub fn send_to_host(&self, code: &str, event: ServerEvent) {
        let Some(bucket) = self.buckets.get(code) else {
            return;
        };

        match &bucket.host {
            Some(host) => self.try_deliver(&host.tx, event),
            None => self.count_drop(code),
        }
    }

    pub fn send_to_participant(&self, code: &str, participant_id: Uuid, event: ServerEvent) {
        let Some(bucket) = self.buckets.get(code) else {
            return;
        };

        match bucket.participants.get(&participant_id) {
            Some(tx) => self.try_deliver(tx, event),
            None => self.count_drop(code),
        }
    }

    /// Delivers to the host and every participant connection.
    pub fn broadcast(&self, code: &str, event: ServerEvent) {
        let Some(bucket) = self.buckets.get(code) else {
            return;
        };

        if let Some(host) = &bucket.host {
            self.try_deliver(&host.tx, event.clone());
        }
        for tx in bucket.participants.values() {
            self.try_deliver(tx, event.clone());
        }
    }

    /// Total sends dropped since process start, across all sessions.
    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends.load(Ordering::Relaxed)
    }

    pub fn host_connected(&self, code: &str) -> bool {
        self.buckets
            .get(code)
            .map(|b| b.host.is_some())
            .unwrap_or(false)
    }

    fn try_deliver(&self, tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
        if tx.try_send(event).is_err() {
            self.dropped_sends.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn count_drop(&self, code: &str) {
        debug!("Dropped send to absent connection in session {}", code);
        self.dropped_sends.fetch_add(1, Ordering::Relaxed);
    }
}
