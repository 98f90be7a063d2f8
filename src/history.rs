use crate::scoring::{avg_answer_time_seconds, percentage, score};
use crate::session::TestResult;
use crate::word::Word;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Maximum number of sessions kept; older ones are pruned on append.
pub const HISTORY_CAP: usize = 50;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error")]
    Database(#[from] rusqlite::Error),

    #[error("could not encode or decode stored words")]
    Encoding(#[from] serde_json::Error),

    #[error("stored timestamp {0:?} is not RFC 3339")]
    Timestamp(String),

    #[error("could not write CSV export")]
    Csv(#[from] csv::Error),

    #[error("could not prepare the history location")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// A completed session tagged with the word set it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub set_name: String,
    pub result: TestResult,
}

/// Sink for completed sessions.
pub trait HistoryStore {
    fn append(&mut self, set_name: &str, result: &TestResult) -> Result<i64>;
    /// Newest first.
    fn list(&self) -> Result<Vec<HistoryEntry>>;
    fn get(&self, id: i64) -> Result<Option<HistoryEntry>>;
    fn delete(&mut self, id: i64) -> Result<bool>;
    fn clear(&mut self) -> Result<()>;
}

type HistoryRow = (i64, String, String, u64, String, bool, String);

/// History kept in a SQLite database
#[derive(Debug)]
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                set_name TEXT NOT NULL,
                started_at TEXT NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                elapsed TEXT NOT NULL,
                completed BOOLEAN NOT NULL,
                words TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_set_name ON history(set_name)",
            [],
        )?;

        Ok(Self { conn })
    }

    fn prune(&self) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM history WHERE id NOT IN (SELECT id FROM history ORDER BY id DESC LIMIT ?1)",
            params![HISTORY_CAP as i64],
        )?;
        Ok(removed)
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn decode(
        (id, set_name, started_at, elapsed_ms, elapsed, completed, words): HistoryRow,
    ) -> Result<HistoryEntry> {
        let started_at = DateTime::parse_from_rfc3339(&started_at)
            .map_err(|_| HistoryError::Timestamp(started_at.clone()))?
            .with_timezone(&Local);
        let words: Vec<Word> = serde_json::from_str(&words)?;

        Ok(HistoryEntry {
            id,
            set_name,
            result: TestResult {
                started_at,
                elapsed_ms,
                elapsed,
                words,
                completed,
            },
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, set_name, started_at, elapsed_ms, elapsed, completed, words FROM history";

impl HistoryStore for SqliteHistory {
    fn append(&mut self, set_name: &str, result: &TestResult) -> Result<i64> {
        let words = serde_json::to_string(&result.words)?;
        self.conn.execute(
            r#"
            INSERT INTO history (set_name, started_at, elapsed_ms, elapsed, completed, words)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                set_name,
                result.started_at.to_rfc3339(),
                result.elapsed_ms,
                result.elapsed,
                result.completed,
                words,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let pruned = self.prune()?;
        if pruned > 0 {
            log::debug!("pruned {pruned} history entries beyond the cap of {HISTORY_CAP}");
        }
        Ok(id)
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC"))?;
        let rows = stmt.query_map([], Self::row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(Self::decode(row?)?);
        }
        Ok(entries)
    }

    fn get(&self, id: i64) -> Result<Option<HistoryEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id],
                Self::row_to_entry,
            )
            .optional()?;
        row.map(Self::decode).transpose()
    }

    fn delete(&mut self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM history WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM history", [])?;
        Ok(())
    }
}

/// Write one CSV row per word per entry.
pub fn export_csv<W: Write>(entries: &[HistoryEntry], writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "entry_id",
        "set_name",
        "started_at",
        "elapsed",
        "language1",
        "language2",
        "correct",
        "failed",
        "skipped",
        "checked",
        "score",
        "percentage",
        "avg_time_secs",
    ])?;

    for entry in entries {
        for word in &entry.result.words {
            out.write_record([
                entry.id.to_string(),
                entry.set_name.clone(),
                entry.result.started_at.format("%Y-%m-%d %H:%M").to_string(),
                entry.result.elapsed.clone(),
                word.language1.clone(),
                word.language2.clone(),
                word.times_correct.to_string(),
                word.times_failed.to_string(),
                word.times_skipped.to_string(),
                word.times_checked_answer.to_string(),
                score(word).to_string(),
                percentage(word).to_string(),
                format!("{:.1}", avg_answer_time_seconds(word)),
            ])?;
        }
    }

    out.flush()?;
    Ok(())
}
