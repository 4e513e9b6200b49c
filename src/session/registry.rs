use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::{
    session::{
        actor::{SessionActor, SessionCommand, SessionHandle},
        error::SessionError,
        models::SessionState,
    },
    store::Store,
    ws::registry::ConnectionRegistry,
};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 5;

/// Process-wide map of active sessions. A bucket is inserted when a host
/// creates a session and removed by the actor once the session has ended.
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, SessionHandle>>,
    store: Arc<dyn Store>,
    connections: Arc<ConnectionRegistry>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn Store>, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            store,
            connections,
        }
    }

    /// Loads the quiz's question order and spawns the session actor under a
    /// fresh join code.
    pub async fn create_session(&self, quiz_id: Uuid) -> Result<SessionHandle, SessionError> {
        let question_order = self.store.fetch_question_order(quiz_id).await?;
        let (handle, rx) = self.reserve_code();

        self.connections.open_session(handle.code());
        let state = SessionState::new(handle.code().to_string(), quiz_id, question_order);
        SessionActor::spawn(
            state,
            rx,
            self.store.clone(),
            self.connections.clone(),
            self.sessions.clone(),
        );

        info!("Created session {} for quiz {}", handle.code(), quiz_id);
        Ok(handle)
    }

    pub fn get(&self, code: &str) -> Option<SessionHandle> {
        self.sessions.get(code).map(|entry| entry.clone())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Mints a 5-character, human-typeable code and claims its map slot in
    /// one step, so two concurrent creates can never share a code. Retries
    /// until an unclaimed code comes up.
    fn reserve_code(&self) -> (SessionHandle, mpsc::Receiver<SessionCommand>) {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
                .collect();

            match self.sessions.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let (handle, rx) = SessionHandle::channel(code);
                    slot.insert(handle.clone());
                    return (handle, rx);
                }
            }
        }
    }
}
