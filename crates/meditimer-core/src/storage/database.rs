//! SQLite-based session log storage and statistics.
//!
//! Provides persistent storage for:
//! - Finished meditation sessions (completed or stopped early)
//! - Session statistics (daily and all-time)
//! - Key-value store for application state (saved track library)

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::audio::{TrackKind, TrackLibrary};
use crate::error::{DatabaseError, Result, ValidationError};
use crate::session::{AudioDetails, SessionLog, SessionLogSink};

const TRACKS_KEY: &str = "audio_tracks";

/// A stored session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    #[serde(flatten)]
    pub log: SessionLog,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub stopped_sessions: u64,
    pub total_min: u64,
    pub today_sessions: u64,
    pub today_min: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/meditimer/meditimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("meditimer.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time           TEXT NOT NULL,
                end_time             TEXT NOT NULL,
                planned_duration_min INTEGER NOT NULL,
                actual_duration_min  INTEGER NOT NULL,
                completed            INTEGER NOT NULL,
                start_note           TEXT NOT NULL DEFAULT '',
                end_note             TEXT,
                emotions             TEXT NOT NULL DEFAULT '[]',
                causes               TEXT NOT NULL DEFAULT '[]',
                audio_id             TEXT,
                audio_name           TEXT,
                audio_kind           TEXT
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_end_time ON sessions(end_time);",
        )
    }

    /// Store a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, log: &SessionLog) -> Result<i64> {
        let (audio_id, audio_name, audio_kind) = match &log.audio {
            Some(a) => (
                Some(a.id.as_str()),
                Some(a.name.as_str()),
                Some(a.kind.as_str()),
            ),
            None => (None, None, None),
        };
        self.conn.execute(
            "INSERT INTO sessions (start_time, end_time, planned_duration_min, actual_duration_min,
                                   completed, start_note, end_note, emotions, causes,
                                   audio_id, audio_name, audio_kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                log.start_time.to_rfc3339(),
                log.end_time.to_rfc3339(),
                log.planned_duration_min,
                log.actual_duration_min,
                log.completed,
                log.start_note,
                log.end_note,
                serde_json::to_string(&log.emotions)?,
                serde_json::to_string(&log.causes)?,
                audio_id,
                audio_name,
                audio_kind,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, planned_duration_min, actual_duration_min, completed,
                    start_note, end_note, emotions, causes, audio_id, audio_name, audio_kind
             FROM sessions
             ORDER BY end_time DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], read_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    /// Attach the post-session journal entry.
    pub fn set_end_note(
        &self,
        id: i64,
        note: &str,
        emotions: &[String],
        causes: &[String],
    ) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE sessions SET end_note = ?1, emotions = ?2, causes = ?3 WHERE id = ?4",
            params![
                note,
                serde_json::to_string(emotions)?,
                serde_json::to_string(causes)?,
                id
            ],
        )?;
        if changed == 0 {
            return Err(ValidationError::NotFound {
                collection: "sessions".into(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Totals, with "today" meaning since local midnight.
    pub fn stats(&self) -> Result<Stats> {
        self.stats_since(local_day_start(Local::now().date_naive()))
    }

    /// Totals, counting sessions that ended at or after `day_start` as today.
    pub fn stats_since(&self, day_start: DateTime<Utc>) -> Result<Stats> {
        let mut stmt = self.conn.prepare(
            "SELECT completed, COUNT(*), COALESCE(SUM(actual_duration_min), 0),
                    COALESCE(SUM(CASE WHEN end_time >= ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN end_time >= ?1 THEN actual_duration_min ELSE 0 END), 0)
             FROM sessions
             GROUP BY completed",
        )?;
        let rows = stmt.query_map(params![day_start.to_rfc3339()], |row| {
            Ok((
                row.get::<_, bool>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (completed, count, minutes, today_count, today_minutes) = row?;
            stats.total_sessions += count;
            stats.total_min += minutes;
            stats.today_sessions += today_count;
            stats.today_min += today_minutes;
            if completed {
                stats.completed_sessions += count;
            } else {
                stats.stopped_sessions += count;
            }
        }
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Saved track library, or the default (silence only) when none is stored.
    pub fn load_tracks(&self) -> Result<TrackLibrary> {
        match self.kv_get(TRACKS_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                DatabaseError::CorruptRow {
                    table: "kv".into(),
                    message: format!("{TRACKS_KEY}: {e}"),
                }
                .into()
            }),
            None => Ok(TrackLibrary::default()),
        }
    }

    pub fn save_tracks(&self, library: &TrackLibrary) -> Result<()> {
        self.kv_set(TRACKS_KEY, &serde_json::to_string(library)?)
    }
}

impl SessionLogSink for Database {
    fn record(&mut self, log: &SessionLog) -> Result<i64> {
        self.record_session(log)
    }
}

/// Start of `day` in the local timezone, as UTC. A midnight skipped by a
/// DST change falls back to midnight UTC.
fn local_day_start(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&midnight),
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::CorruptRow {
                table: "sessions".into(),
                message: format!("bad timestamp '{raw}': {e}"),
            }
            .into()
        })
}

/// Outer error is SQLite's, inner is decoding.
fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<SessionRecord>> {
    let id: i64 = row.get(0)?;
    let start_time: String = row.get(1)?;
    let end_time: String = row.get(2)?;
    let planned_duration_min: u32 = row.get(3)?;
    let actual_duration_min: u32 = row.get(4)?;
    let completed: bool = row.get(5)?;
    let start_note: String = row.get(6)?;
    let end_note: Option<String> = row.get(7)?;
    let emotions: String = row.get(8)?;
    let causes: String = row.get(9)?;
    let audio_id: Option<String> = row.get(10)?;
    let audio_name: Option<String> = row.get(11)?;
    let audio_kind: Option<String> = row.get(12)?;

    Ok((|| -> Result<SessionRecord> {
        let kind = audio_kind.as_deref().and_then(TrackKind::parse);
        let audio = match (audio_id, audio_name, kind) {
            (Some(id), Some(name), Some(kind)) => Some(AudioDetails { id, name, kind }),
            _ => None,
        };
        Ok(SessionRecord {
            id,
            log: SessionLog {
                start_time: parse_time(&start_time)?,
                end_time: parse_time(&end_time)?,
                planned_duration_min,
                actual_duration_min,
                completed,
                start_note,
                end_note,
                emotions: serde_json::from_str(&emotions)?,
                causes: serde_json::from_str(&causes)?,
                audio,
            },
        })
    })())
}
