use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::InterviewSession;

const KEY_PREFIX: &str = "interview:session:";

/// Server-side home of interview sessions. Writes are whole-document and last-writer-wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<InterviewSession>, AppError>;
    async fn save(&self, session: &InterviewSession) -> Result<(), AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Sessions stored as JSON strings with a sliding TTL refreshed on every save.
/// One multiplexed connection is opened up front and shared by every request.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub async fn connect(client: &redis::Client, ttl_secs: u64) -> Result<Self, AppError> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_error)?;
        Ok(Self { conn, ttl_secs })
    }

    fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn key(id: Uuid) -> String {
    format!("{KEY_PREFIX}{id}")
}

fn redis_error(e: redis::RedisError) -> AppError {
    AppError::SessionStore(e.to_string())
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<InterviewSession>, AppError> {
        let mut conn = self.connection();
        let raw: Option<String> = conn.get(key(id)).await.map_err(redis_error)?;
        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AppError::SessionStore(format!("Corrupt session {id}: {e}")))
        })
        .transpose()
    }

    async fn save(&self, session: &InterviewSession) -> Result<(), AppError> {
        let json = serde_json::to_string(session)
            .map_err(|e| AppError::SessionStore(format!("Failed to encode session: {e}")))?;
        let mut conn = self.connection();
        conn.set_ex::<_, _, ()>(key(session.id), json, self.ttl_secs)
            .await
            .map_err(redis_error)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut conn = self.connection();
        conn.del::<_, ()>(key(id)).await.map_err(redis_error)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct MemorySessionStore {
        sessions: RwLock<HashMap<Uuid, InterviewSession>>,
    }

    impl MemorySessionStore {
        pub async fn len(&self) -> usize {
            self.sessions.read().await.len()
        }
    }

    #[async_trait]
    impl SessionStore for MemorySessionStore {
        async fn load(&self, id: Uuid) -> Result<Option<InterviewSession>, AppError> {
            Ok(self.sessions.read().await.get(&id).cloned())
        }

        async fn save(&self, session: &InterviewSession) -> Result<(), AppError> {
            self.sessions
                .write()
                .await
                .insert(session.id, session.clone());
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> Result<(), AppError> {
            self.sessions.write().await.remove(&id);
            Ok(())
        }
    }
}
