//! Durable state store (C8): `files`/`stages`/`chunks` tables backed by
//! SQLite, so a crash between any two calls leaves exactly the last
//! committed state on disk (spec.md §4.8/§6).
//!
//! Grounded in the pack's `pmoaudiocache::db::AudioDB` — a `Mutex<Connection>`
//! wrapper with `CREATE TABLE IF NOT EXISTS` schema setup, `rusqlite::params!`
//! inserts, and row-mapped queries. The JSON-blob-in-a-column trick for
//! `detail_json` is the same one that crate uses for its metadata column.

use crate::error::{NeuravoxError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

pub const STAGE_INGEST: &str = "ingest";
pub const STAGE_SEGMENT: &str = "segment";
pub const STAGE_ENCODE: &str = "encode";
pub const STAGE_TRANSCRIBE: &str = "transcribe";
pub const STAGE_COMBINE: &str = "combine";

/// Ordered list of pipeline stages, used by the orchestrator to decide where
/// a resume restarts (spec.md §4.9).
pub const STAGES: [&str; 5] = [
    STAGE_INGEST,
    STAGE_SEGMENT,
    STAGE_ENCODE,
    STAGE_TRANSCRIBE,
    STAGE_COMBINE,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub file_id: String,
    pub original_path: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: String,
    pub status: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    pub detail_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub chunk_index: i64,
    pub audio_path: String,
    pub transcript_path: Option<String>,
    pub start_s: f64,
    pub end_s: f64,
    pub transcribed: bool,
}

pub struct StateStore {
    conn: Mutex<Connection>,
}

impl StateStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(NeuravoxError::from)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS files (
                 file_id       TEXT PRIMARY KEY,
                 original_path TEXT NOT NULL,
                 status        TEXT NOT NULL DEFAULT 'pending',
                 created_at    TEXT NOT NULL,
                 updated_at    TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS stages (
                 file_id      TEXT NOT NULL REFERENCES files(file_id),
                 stage        TEXT NOT NULL,
                 status       TEXT NOT NULL,
                 started_at   TEXT,
                 completed_at TEXT,
                 error        TEXT,
                 detail_json  TEXT,
                 PRIMARY KEY (file_id, stage)
             );
             CREATE TABLE IF NOT EXISTS chunks (
                 file_id         TEXT NOT NULL REFERENCES files(file_id),
                 chunk_index     INTEGER NOT NULL,
                 audio_path      TEXT NOT NULL,
                 transcript_path TEXT,
                 start_s         REAL NOT NULL,
                 end_s           REAL NOT NULL,
                 transcribed     INTEGER NOT NULL DEFAULT 0,
                 PRIMARY KEY (file_id, chunk_index)
             );",
        )
        .map_err(NeuravoxError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(NeuravoxError::from)?;
        conn.execute_batch(
            "CREATE TABLE files (
                 file_id       TEXT PRIMARY KEY,
                 original_path TEXT NOT NULL,
                 status        TEXT NOT NULL DEFAULT 'pending',
                 created_at    TEXT NOT NULL,
                 updated_at    TEXT NOT NULL
             );
             CREATE TABLE stages (
                 file_id      TEXT NOT NULL REFERENCES files(file_id),
                 stage        TEXT NOT NULL,
                 status       TEXT NOT NULL,
                 started_at   TEXT,
                 completed_at TEXT,
                 error        TEXT,
                 detail_json  TEXT,
                 PRIMARY KEY (file_id, stage)
             );
             CREATE TABLE chunks (
                 file_id         TEXT NOT NULL REFERENCES files(file_id),
                 chunk_index     INTEGER NOT NULL,
                 audio_path      TEXT NOT NULL,
                 transcript_path TEXT,
                 start_s         REAL NOT NULL,
                 end_s           REAL NOT NULL,
                 transcribed     INTEGER NOT NULL DEFAULT 0,
                 PRIMARY KEY (file_id, chunk_index)
             );",
        )
        .map_err(NeuravoxError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Idempotent create of a FileRecord in state `pending`.
    pub fn begin(&self, file_id: &str, original_path: &str) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let now = now_iso8601();
        conn.execute(
            "INSERT INTO files (file_id, original_path, status, created_at, updated_at)
             VALUES (?1, ?2, 'pending', ?3, ?3)
             ON CONFLICT(file_id) DO NOTHING",
            params![file_id, original_path, now],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    /// Sets the stage to `running` and the file's overall status to
    /// `processing` (spec.md §3 gives `FileRecord.overall_status` and
    /// `StageRecord.status` distinct in-flight literals).
    pub fn stage_start(&self, file_id: &str, stage: &str) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let now = now_iso8601();
        conn.execute(
            "INSERT INTO stages (file_id, stage, status, started_at)
             VALUES (?1, ?2, 'running', ?3)
             ON CONFLICT(file_id, stage) DO UPDATE SET
                 status = 'running', started_at = ?3, completed_at = NULL, error = NULL",
            params![file_id, stage, now],
        )
        .map_err(NeuravoxError::from)?;
        conn.execute(
            "UPDATE files SET status = 'processing', updated_at = ?2 WHERE file_id = ?1",
            params![file_id, now],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    pub fn stage_complete(&self, file_id: &str, stage: &str, detail: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let now = now_iso8601();
        conn.execute(
            "UPDATE stages SET status = 'completed', completed_at = ?3, detail_json = ?4
             WHERE file_id = ?1 AND stage = ?2",
            params![file_id, stage, now, detail],
        )
        .map_err(NeuravoxError::from)?;

        let file_status = if stage == STAGE_COMBINE { "completed" } else { "processing" };
        conn.execute(
            "UPDATE files SET status = ?2, updated_at = ?3 WHERE file_id = ?1",
            params![file_id, file_status, now],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    pub fn stage_fail(&self, file_id: &str, stage: &str, error: &str) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let now = now_iso8601();
        conn.execute(
            "UPDATE stages SET status = 'failed', completed_at = ?3, error = ?4
             WHERE file_id = ?1 AND stage = ?2",
            params![file_id, stage, now, error],
        )
        .map_err(NeuravoxError::from)?;
        conn.execute(
            "UPDATE files SET status = 'failed', updated_at = ?2 WHERE file_id = ?1",
            params![file_id, now],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    pub fn chunk_upsert(
        &self,
        file_id: &str,
        chunk_index: usize,
        audio_path: &str,
        start_s: f64,
        end_s: f64,
        transcribed: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        conn.execute(
            "INSERT INTO chunks (file_id, chunk_index, audio_path, start_s, end_s, transcribed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(file_id, chunk_index) DO UPDATE SET
                 audio_path = excluded.audio_path,
                 start_s = excluded.start_s,
                 end_s = excluded.end_s,
                 transcribed = excluded.transcribed",
            params![file_id, chunk_index as i64, audio_path, start_s, end_s, transcribed as i64],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    pub fn chunk_mark_transcribed(
        &self,
        file_id: &str,
        chunk_index: usize,
        transcript_path: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        conn.execute(
            "UPDATE chunks SET transcribed = 1, transcript_path = ?3
             WHERE file_id = ?1 AND chunk_index = ?2",
            params![file_id, chunk_index as i64, transcript_path],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    /// Record a transcription outcome for one chunk: always updates
    /// `transcript_path` (a failure marker is persisted there too, so a
    /// later combine-only resume can regenerate the document without
    /// re-calling the backend), and sets `transcribed` only on success.
    pub fn chunk_set_outcome(
        &self,
        file_id: &str,
        chunk_index: usize,
        transcript_path: &str,
        transcribed: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        conn.execute(
            "UPDATE chunks SET transcript_path = ?3, transcribed = ?4
             WHERE file_id = ?1 AND chunk_index = ?2",
            params![file_id, chunk_index as i64, transcript_path, transcribed as i64],
        )
        .map_err(NeuravoxError::from)?;
        Ok(())
    }

    pub fn chunks_for(&self, file_id: &str) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT chunk_index, audio_path, transcript_path, start_s, end_s, transcribed
                 FROM chunks WHERE file_id = ?1 ORDER BY chunk_index",
            )
            .map_err(NeuravoxError::from)?;

        let rows = stmt
            .query_map(params![file_id], |row| {
                Ok(ChunkRecord {
                    chunk_index: row.get(0)?,
                    audio_path: row.get(1)?,
                    transcript_path: row.get(2)?,
                    start_s: row.get(3)?,
                    end_s: row.get(4)?,
                    transcribed: row.get::<_, i64>(5)? != 0,
                })
            })
            .map_err(NeuravoxError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(NeuravoxError::from)?;

        Ok(rows)
    }

    pub fn stages_for(&self, file_id: &str) -> Result<Vec<StageRecord>> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT stage, status, started_at, completed_at, error, detail_json
                 FROM stages WHERE file_id = ?1",
            )
            .map_err(NeuravoxError::from)?;

        let rows = stmt
            .query_map(params![file_id], |row| {
                Ok(StageRecord {
                    stage: row.get(0)?,
                    status: row.get(1)?,
                    started_at: row.get(2)?,
                    completed_at: row.get(3)?,
                    error: row.get(4)?,
                    detail_json: row.get(5)?,
                })
            })
            .map_err(NeuravoxError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(NeuravoxError::from)?;

        Ok(rows)
    }

    /// Files whose most recent stage is `failed`, or whose overall status is
    /// not `completed` (spec.md §4.8).
    pub fn list_resumable(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT file_id FROM files WHERE status != 'completed'")
            .map_err(NeuravoxError::from)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(NeuravoxError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(NeuravoxError::from)?;

        Ok(rows)
    }

    pub fn file_status(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let conn = self.conn.lock().expect("state store mutex poisoned");
        conn.query_row(
            "SELECT file_id, original_path, status, created_at, updated_at
             FROM files WHERE file_id = ?1",
            params![file_id],
            |row| {
                Ok(FileRecord {
                    file_id: row.get(0)?,
                    original_path: row.get(1)?,
                    status: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(NeuravoxError::from)
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}
