//! JSON Lines record store: one serialized [`GenerationRecord`] per line.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::records::{GenerationRecord, RecordError, RecordStore};

pub struct JsonFileRecordStore {
    path: PathBuf,
    // Serializes the read-check-append sequence of `insert`.
    lock: Mutex<()>,
}

impl JsonFileRecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> RecordError {
        RecordError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads every parseable record in file order. Malformed lines are
    /// skipped with a warning.
    fn read_all(&self) -> Result<Vec<GenerationRecord>, RecordError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<GenerationRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!(
                    "Skipping malformed record on line {} of {}: {}",
                    index + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(records)
    }
}

impl RecordStore for JsonFileRecordStore {
    fn insert(&self, record: &GenerationRecord) -> Result<(), RecordError> {
        let _guard = self.lock.lock().map_err(|_| RecordError::LockPoisoned)?;

        if self.read_all()?.iter().any(|r| r.id == record.id) {
            return Err(RecordError::Duplicate(record.id.clone()));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;

        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<GenerationRecord>, RecordError> {
        Ok(self.read_all()?.into_iter().find(|r| r.id == id))
    }

    fn list(&self, limit: usize) -> Result<Vec<GenerationRecord>, RecordError> {
        let mut records = self.read_all()?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures;
    use chrono::{TimeDelta, TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(dir.path().join("generations.jsonl"));
        assert!(store.list(10).unwrap().is_empty());
        assert!(store.find("g1").unwrap().is_none());
    }

    #[test]
    fn test_insert_appends_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("generations.jsonl");
        let store = JsonFileRecordStore::new(&path);

        store.insert(&fixtures::record("g1", Utc::now())).unwrap();
        store.insert(&fixtures::record("g2", Utc::now())).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(store.find("g2").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_rejected() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(dir.path().join("generations.jsonl"));
        let record = fixtures::record("g1", Utc::now());

        store.insert(&record).unwrap();
        assert!(matches!(
            store.insert(&record),
            Err(RecordError::Duplicate(_))
        ));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generations.jsonl");
        let store = JsonFileRecordStore::new(&path);
        store.insert(&fixtures::record("g1", Utc::now())).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ truncated").unwrap();

        store.insert(&fixtures::record("g2", Utc::now())).unwrap();
        assert_eq!(store.list(10).unwrap().len(), 2);
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileRecordStore::new(dir.path().join("generations.jsonl"));
        let base = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        for i in 0..4 {
            store
                .insert(&fixtures::record(&format!("g{}", i), base + TimeDelta::hours(i)))
                .unwrap();
        }

        let ids: Vec<String> = store.list(2).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["g3", "g2"]);
    }
}
