use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    server::error::ServerError,
    session::registry::SessionRegistry,
    store::{Store, pg::PgStore},
    ws::registry::ConnectionRegistry,
};

pub struct AppState {
    pool: Pool<Postgres>,
    store: Arc<dyn Store>,
    connections: Arc<ConnectionRegistry>,
    sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub async fn from_connection_string(connection_string: &str) -> Result<Arc<Self>, ServerError> {
        let pool = Pool::<Postgres>::connect(connection_string).await?;
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
        let connections = Arc::new(ConnectionRegistry::new());
        let sessions = Arc::new(SessionRegistry::new(store.clone(), connections.clone()));

        let state = Arc::new(Self {
            pool,
            store,
            connections,
            sessions,
        });

        Ok(state)
    }

    pub fn get_pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn get_store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn get_connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn get_sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}
