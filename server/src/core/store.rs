//! Transcript Store
//!
//! SQLite persistence of videos (keyed by path) and their transcript
//! segments, with substring search across all transcripts.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::analysis::{Segment, TranscriptData};
use crate::core::{CoreError, CoreResult};

/// SQLite database of stored transcripts
pub struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    /// Opens (creating if needed) the database at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            CoreError::DatabaseError(format!(
                "Failed to open transcript database {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates an in-memory database (for testing)
    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CoreError::DatabaseError(format!("Failed to create in-memory database: {}", e))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CoreResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                name TEXT
            );

            CREATE TABLE IF NOT EXISTS transcripts (
                id INTEGER PRIMARY KEY,
                video_id INTEGER NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                start_time REAL NOT NULL,
                end_time REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transcripts_video ON transcripts(video_id, start_time);
            "#,
        )?;
        Ok(())
    }

    /// Replaces the stored transcript of `video_path`, creating the video row
    /// on first use. Runs in one transaction.
    pub fn store_transcript(&mut self, video_path: &str, segments: &[Segment]) -> CoreResult<()> {
        if video_path.trim().is_empty() {
            return Err(CoreError::ValidationError("video_path is required".into()));
        }

        let name = Path::new(video_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| video_path.to_string());

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO videos (path, name) VALUES (?1, ?2) ON CONFLICT(path) DO NOTHING",
            params![video_path, name],
        )?;
        let video_id: i64 = tx.query_row(
            "SELECT id FROM videos WHERE path = ?1",
            [video_path],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM transcripts WHERE video_id = ?1", [video_id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO transcripts (video_id, text, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for segment in segments {
                insert.execute(params![video_id, segment.text, segment.start, segment.end])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Stored {} segments for {}", segments.len(), video_path);
        Ok(())
    }

    /// Loads the stored transcript, `None` when the video is unknown or has
    /// no segments.
    pub fn load_transcript(&self, video_path: &str) -> CoreResult<Option<TranscriptData>> {
        let video_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM videos WHERE path = ?1",
                [video_path],
                |row| row.get(0),
            )
            .optional()?;

        let Some(video_id) = video_id else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT start_time, end_time, text FROM transcripts WHERE video_id = ?1 ORDER BY id",
        )?;
        let segments = stmt
            .query_map([video_id], row_to_segment)?
            .collect::<Result<Vec<_>, _>>()?;

        if segments.is_empty() {
            return Ok(None);
        }
        Ok(Some(TranscriptData::from_segments(segments)))
    }

    /// Segments whose text contains `query` (ASCII case-insensitive), ordered
    /// by start time.
    pub fn search(&self, query: &str) -> CoreResult<Vec<Segment>> {
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.conn.prepare(
            r#"
            SELECT start_time, end_time, text FROM transcripts
            WHERE text LIKE ?1 ESCAPE '\'
            ORDER BY start_time, id
            "#,
        )?;
        let segments = stmt
            .query_map([pattern], row_to_segment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(segments)
    }
}

fn row_to_segment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Segment> {
    Ok(Segment {
        start: row.get(0)?,
        end: row.get(1)?,
        text: row.get(2)?,
    })
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
