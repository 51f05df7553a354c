//! SQLite record store for the local pipeline
//!
//! A snapshot holds a single `subtitles` table. Searches read it whole, once
//! per call; no predicate is ever pushed down to SQLite.

use crate::error::SearchResult;
use crate::models::SubtitleRecord;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::Arc;

const CREATE_SUBTITLES: &str = r#"
    CREATE TABLE IF NOT EXISTS subtitles (
        episode_title TEXT,
        timestamp TEXT,
        similarity REAL,
        text TEXT
    )
"#;

/// Source of every subtitle row for a search.
pub trait RecordSource: Send + Sync {
    /// One unfiltered read of all rows, in storage order.
    fn fetch_all(&self) -> SearchResult<Vec<SubtitleRecord>>;
}

impl RecordSource for Vec<SubtitleRecord> {
    fn fetch_all(&self) -> SearchResult<Vec<SubtitleRecord>> {
        Ok(self.clone())
    }
}

/// Thread-safe handle to a subtitle snapshot.
pub struct SubtitleDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SubtitleDatabase {
    /// Open an existing snapshot without write access.
    pub fn open_snapshot<P: AsRef<Path>>(path: P) -> SearchResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open or create a writable snapshot.
    pub fn create<P: AsRef<Path>>(path: P) -> SearchResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_SUBTITLES)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory snapshot (for tests)
    pub fn open_in_memory() -> SearchResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_SUBTITLES)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert rows in one transaction.
    pub fn insert_records(&self, records: &[SubtitleRecord]) -> SearchResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO subtitles (episode_title, timestamp, similarity, text) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.episode_title,
                    record.timestamp,
                    record.similarity,
                    record.text,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn count(&self) -> SearchResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM subtitles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<SubtitleRecord> {
        Ok(SubtitleRecord {
            episode_title: text_column(row, 0)?,
            timestamp: text_column(row, 1)?,
            similarity: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
            text: text_column(row, 3)?,
        })
    }
}

impl RecordSource for SubtitleDatabase {
    fn fetch_all(&self) -> SearchResult<Vec<SubtitleRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT episode_title, timestamp, similarity, text FROM subtitles")?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Snapshots are loosely typed; numbers and NULLs in text columns are read as strings.
fn text_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}
