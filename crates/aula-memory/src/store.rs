use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::task;

/// Persisted dialog state for one conversation. `stack_json` is the
/// serialized dialog stack; this crate does not interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_key: String,
    pub stack_json: String,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed conversation state store. Read-modify-write consistent per
/// conversation key: saves are single upserts, so a crash between turns
/// leaves the previous turn's stack authoritative.
#[derive(Clone)]
pub struct ConversationStore {
    db: Arc<Mutex<Connection>>,
}

impl ConversationStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn load(&self, conversation_key: &str) -> Result<Option<ConversationRecord>> {
        let db = Arc::clone(&self.db);
        let key = conversation_key.to_owned();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let record = conn
                .query_row(
                    "SELECT conversation_key, stack_json, updated_at
                     FROM conversations WHERE conversation_key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;
            record
                .map(|(conversation_key, stack_json, updated_at)| {
                    Ok::<_, anyhow::Error>(ConversationRecord {
                        conversation_key,
                        stack_json,
                        updated_at: updated_at.parse::<DateTime<Utc>>()?,
                    })
                })
                .transpose()
        })
        .await?
    }

    pub async fn save(&self, conversation_key: &str, stack_json: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key = conversation_key.to_owned();
        let json = stack_json.to_owned();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                "INSERT INTO conversations (conversation_key, stack_json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(conversation_key) DO UPDATE SET
                   stack_json = excluded.stack_json,
                   updated_at = excluded.updated_at",
                params![key, json, Utc::now().to_rfc3339()],
            )?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;
        Ok(())
    }

    pub async fn delete(&self, conversation_key: &str) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let key = conversation_key.to_owned();
        let deleted = task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let n = conn.execute(
                "DELETE FROM conversations WHERE conversation_key = ?1",
                params![key],
            )?;
            Ok::<usize, anyhow::Error>(n)
        })
        .await??;
        Ok(deleted > 0)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            conversation_key TEXT PRIMARY KEY,
            stack_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}
