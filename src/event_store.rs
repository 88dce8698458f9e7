use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::events::{EventPayload, EventType, StoredEvent};

/// Last seen runs per `(innings, player_id)` for one match.
pub type PlayerWatermarks = HashMap<(u32, u64), u32>;

/// Durable, de-duplicated event log shared by every match monitor.
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("event store lock poisoned"))
    }

    pub fn exists(&self, match_id: &str, event_type: EventType, dedup_key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM events WHERE match_id = ?1 AND event_type = ?2 AND dedup_key = ?3",
                params![match_id, event_type.as_str(), dedup_key],
                |_| Ok(()),
            )
            .optional()
            .context("query event existence")?;
        Ok(found.is_some())
    }

    /// Inserts unless an event with the same match, type and dedup key is already
    /// stored. Returns whether a row was written.
    pub fn insert_if_absent(&self, match_id: &str, event: &EventPayload) -> Result<bool> {
        let (event_type, payload) = event.to_parts()?;
        let dedup_key = event.dedup_key();
        let created_at = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO events(match_id, event_type, dedup_key, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![match_id, event_type.as_str(), dedup_key, payload, created_at],
            )
            .with_context(|| format!("insert {event_type} event for {match_id}"))?;
        Ok(changed > 0)
    }

    pub fn events_for_match(&self, match_id: &str) -> Result<Vec<StoredEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, match_id, event_type, payload, created_at
                 FROM events WHERE match_id = ?1 ORDER BY id ASC",
            )
            .context("prepare events query")?;
        let rows = stmt
            .query_map(params![match_id], raw_event)
            .context("query events")?;
        collect_events(rows)
    }

    /// Most recent events first.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, match_id, event_type, payload, created_at
                 FROM events ORDER BY id DESC LIMIT ?1",
            )
            .context("prepare recent events query")?;
        let rows = stmt
            .query_map(params![limit as i64], raw_event)
            .context("query recent events")?;
        collect_events(rows)
    }

    pub fn count(&self, match_id: &str, event_type: EventType) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM events WHERE match_id = ?1 AND event_type = ?2",
                params![match_id, event_type.as_str()],
                |row| row.get(0),
            )
            .context("count events")?;
        Ok(n as usize)
    }

    pub fn load_watermarks(&self, match_id: &str) -> Result<PlayerWatermarks> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT innings, player_id, runs FROM player_watermarks WHERE match_id = ?1",
            )
            .context("prepare watermark query")?;
        let rows = stmt
            .query_map(params![match_id], |row| {
                let innings: i64 = row.get(0)?;
                let player_id: i64 = row.get(1)?;
                let runs: i64 = row.get(2)?;
                Ok(((innings as u32, player_id as u64), runs as u32))
            })
            .context("query watermarks")?;
        let mut out = HashMap::new();
        for row in rows {
            let (key, runs) = row.context("read watermark row")?;
            out.insert(key, runs);
        }
        Ok(out)
    }

    pub fn save_watermarks(&self, match_id: &str, marks: &PlayerWatermarks) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin watermark transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO player_watermarks(match_id, innings, player_id, runs)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(match_id, innings, player_id) DO UPDATE SET runs = excluded.runs",
                )
                .context("prepare watermark upsert")?;
            for ((innings, player_id), runs) in marks {
                stmt.execute(params![
                    match_id,
                    *innings as i64,
                    *player_id as i64,
                    *runs as i64
                ])
                .context("upsert watermark")?;
            }
        }
        tx.commit().context("commit watermarks")?;
        Ok(())
    }

    pub fn clear_watermarks(&self, match_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM player_watermarks WHERE match_id = ?1",
            params![match_id],
        )
        .context("clear watermarks")?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            dedup_key TEXT NOT NULL DEFAULT '',
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_events_dedup
            ON events(match_id, event_type, dedup_key);
        CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at);

        CREATE TABLE IF NOT EXISTS player_watermarks (
            match_id TEXT NOT NULL,
            innings INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            runs INTEGER NOT NULL,
            PRIMARY KEY (match_id, innings, player_id)
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

type RawEvent = (i64, String, String, String, String);

fn raw_event(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn collect_events(
    rows: impl Iterator<Item = rusqlite::Result<RawEvent>>,
) -> Result<Vec<StoredEvent>> {
    let mut out = Vec::new();
    for row in rows {
        let (id, match_id, event_type, payload, created_at) = row.context("read event row")?;
        let event_type = event_type.parse::<EventType>()?;
        let event = EventPayload::from_parts(event_type, &payload)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .with_context(|| format!("parse created_at of event {id}"))?
            .with_timezone(&Utc);
        out.push(StoredEvent {
            id,
            match_id,
            event,
            created_at,
        });
    }
    Ok(out)
}
