//! Session persistence behind a narrow get/put/clear interface keyed by
//! session id. The dialogue engine never assumes a storage technology;
//! expiry is the deployment's concern, not modeled here.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bookline_core::SessionState;
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};

pub trait SessionRepository: Send + Sync {
    async fn load_session(&self, session_id: &str) -> Result<Option<SessionState>>;
    async fn save_session(&self, session_id: &str, state: &SessionState) -> Result<()>;
    async fn clear_session(&self, session_id: &str) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemoryStore {
    async fn load_session(&self, session_id: &str) -> Result<Option<SessionState>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn save_session(&self, session_id: &str, state: &SessionState) -> Result<()> {
        self.sessions
            .write()
            .insert(session_id.to_string(), state.clone());
        Ok(())
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.sessions.write().remove(session_id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
              session_id TEXT PRIMARY KEY,
              state_json TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl SessionRepository for SqliteStore {
    async fn load_session(&self, session_id: &str) -> Result<Option<SessionState>> {
        let row = sqlx::query("SELECT state_json FROM sessions WHERE session_id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.get("state_json");
        let state = serde_json::from_str(&state_json)
            .with_context(|| format!("corrupt session state for {}", session_id))?;

        Ok(Some(state))
    }

    async fn save_session(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let state_json = serde_json::to_string(state)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, state_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
              state_json=excluded.state_json,
              updated_at=excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(state_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }
}

impl SessionRepository for Store {
    async fn load_session(&self, session_id: &str) -> Result<Option<SessionState>> {
        match self {
            Store::Memory(store) => store.load_session(session_id).await,
            Store::Sqlite(store) => store.load_session(session_id).await,
        }
    }

    async fn save_session(&self, session_id: &str, state: &SessionState) -> Result<()> {
        match self {
            Store::Memory(store) => store.save_session(session_id, state).await,
            Store::Sqlite(store) => store.save_session(session_id, state).await,
        }
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        match self {
            Store::Memory(store) => store.clear_session(session_id).await,
            Store::Sqlite(store) => store.clear_session(session_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::{BookingField, ChatTurn};

    #[tokio::test]
    async fn memory_store_round_trips_and_clears() {
        let store = MemoryStore::new();

        let mut state = SessionState::default();
        state.booking_in_progress = true;
        state.slots.set(BookingField::Name, "Alice");
        state.conversation_history.push(ChatTurn::user("hi"));

        store.save_session("s1", &state).await.unwrap();
        let loaded = store.load_session("s1").await.unwrap().unwrap();
        assert!(loaded.booking_in_progress);
        assert_eq!(loaded.slots.name.as_deref(), Some("Alice"));
        assert_eq!(loaded.conversation_history.len(), 1);

        store.clear_session("s1").await.unwrap();
        assert!(store.load_session("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sqlite_store_round_trips_and_clears() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();

        let mut state = SessionState::default();
        state.slots.set(BookingField::Email, "alice@mail.com");

        store.save_session("s1", &state).await.unwrap();
        store.save_session("s1", &state).await.unwrap();

        let loaded = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded.slots.email.as_deref(), Some("alice@mail.com"));

        store.clear_session("s1").await.unwrap();
        assert!(store.load_session("s1").await.unwrap().is_none());
    }
}
