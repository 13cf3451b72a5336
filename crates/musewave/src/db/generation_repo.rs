//! Generation repository: insert and read operations for the `generations` table.
//!
//! Rows are never updated; a generation is written once when its job succeeds.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw generation row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRow {
    pub id: String,
    pub request_json: String,
    pub bpm: i64,
    pub music_key: String,
    pub mix_url: String,
    pub instrumental_url: Option<String>,
    pub melody_url: Option<String>,
    pub vocals_url: Option<String>,
    /// JSON object of style slug to URL.
    pub video_urls: Option<String>,
    /// JSON object of stage to engine name.
    pub engines: String,
    pub created_at: String,
}

impl GenerationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            request_json: row.get("request_json")?,
            bpm: row.get("bpm")?,
            music_key: row.get("music_key")?,
            mix_url: row.get("mix_url")?,
            instrumental_url: row.get("instrumental_url")?,
            melody_url: row.get("melody_url")?,
            vocals_url: row.get("vocals_url")?,
            video_urls: row.get("video_urls")?,
            engines: row.get("engines")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new generation row. Fails on a duplicate id.
pub fn insert(db: &Database, row: &GenerationRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO generations (id, request_json, bpm, music_key, mix_url,
             instrumental_url, melody_url, vocals_url, video_urls, engines, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                row.id,
                row.request_json,
                row.bpm,
                row.music_key,
                row.mix_url,
                row.instrumental_url,
                row.melody_url,
                row.vocals_url,
                row.video_urls,
                row.engines,
                row.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a generation by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<GenerationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM generations WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], GenerationRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns the most recent generations, newest first.
pub fn list_recent(db: &Database, limit: u64) -> Result<Vec<GenerationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM generations ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], GenerationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
