use chrono::{DateTime, Utc};

use crate::db::generation_repo::{self, GenerationRow};
use crate::db::Database;
use crate::records::{GenerationRecord, RecordError, RecordStore};

/// Record store on the `generations` table.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn to_row(record: &GenerationRecord) -> Result<GenerationRow, RecordError> {
    let video_urls = if record.video_urls.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&record.video_urls)?)
    };

    Ok(GenerationRow {
        id: record.id.clone(),
        request_json: serde_json::to_string(&record.request)?,
        bpm: i64::from(record.bpm),
        music_key: record.key.clone(),
        mix_url: record.mix_url.clone(),
        instrumental_url: record.instrumental_url.clone(),
        melody_url: record.melody_url.clone(),
        vocals_url: record.vocals_url.clone(),
        video_urls,
        engines: serde_json::to_string(&record.engines)?,
        created_at: record.created_at.to_rfc3339(),
    })
}

fn from_row(row: GenerationRow) -> Result<GenerationRecord, RecordError> {
    let malformed = |message: String| RecordError::Malformed {
        id: row.id.clone(),
        message,
    };

    let request = serde_json::from_str(&row.request_json)
        .map_err(|e| malformed(format!("request_json: {}", e)))?;
    let video_urls = match row.video_urls.as_deref() {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| malformed(format!("video_urls: {}", e)))?
        }
        None => Default::default(),
    };
    let engines = serde_json::from_str(&row.engines)
        .map_err(|e| malformed(format!("engines: {}", e)))?;
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| malformed(format!("created_at: {}", e)))?;
    let bpm = u32::try_from(row.bpm).map_err(|e| malformed(format!("bpm: {}", e)))?;

    Ok(GenerationRecord {
        id: row.id,
        request,
        bpm,
        key: row.music_key,
        mix_url: row.mix_url,
        instrumental_url: row.instrumental_url,
        melody_url: row.melody_url,
        vocals_url: row.vocals_url,
        video_urls,
        engines,
        created_at,
    })
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: &GenerationRecord) -> Result<(), RecordError> {
        let row = to_row(record)?;
        generation_repo::insert(&self.db, &row).map_err(|e| {
            if e.is_constraint_violation() {
                RecordError::Duplicate(record.id.clone())
            } else {
                RecordError::Database(e)
            }
        })
    }

    fn find(&self, id: &str) -> Result<Option<GenerationRecord>, RecordError> {
        generation_repo::find_by_id(&self.db, id)?
            .map(from_row)
            .transpose()
    }

    fn list(&self, limit: usize) -> Result<Vec<GenerationRecord>, RecordError> {
        generation_repo::list_recent(&self.db, limit as u64)?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures;
    use chrono::{TimeDelta, TimeZone};

    fn store() -> SqliteRecordStore {
        SqliteRecordStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_insert_and_find() {
        let store = store();
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0).unwrap();
        let mut record = fixtures::record("g1", created);
        record
            .video_urls
            .insert("lyric-video".to_string(), "/assets/x/lyric-video.mp4".to_string());

        store.insert(&record).unwrap();
        assert_eq!(store.find("g1").unwrap(), Some(record));
    }

    #[test]
    fn test_insert_is_write_once() {
        let store = store();
        let record = fixtures::record("g1", Utc::now());
        store.insert(&record).unwrap();

        let err = store.insert(&record).unwrap_err();
        assert!(matches!(err, RecordError::Duplicate(id) if id == "g1"));
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = store();
        let base = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            let record = fixtures::record(&format!("g{}", i), base + TimeDelta::minutes(i));
            store.insert(&record).unwrap();
        }

        let listed = store.list(3).unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["g4", "g3", "g2"]);
    }

    #[test]
    fn test_find_missing() {
        assert!(store().find("nope").unwrap().is_none());
    }
}
