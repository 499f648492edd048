//! Snapshot persistence port.
//!
//! The engine persists a whole database as one opaque byte blob keyed by
//! database name. The encoding round-trips every value variant; the store
//! behind the port is pluggable: a directory of files by default, an
//! in-memory map for tests.

use crate::catalog::Database;
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// The snapshot port the engine consumes: save, load and list whole
/// database snapshots by name. Adapters are free to choose their layout;
/// concurrent-writer coordination (e.g. file locks) is their concern too.
pub trait SnapshotStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()>;
    fn load(&self, name: &str) -> Result<Vec<u8>>;
    fn list(&self) -> Result<Vec<String>>;
}

/// Serializes a database to a self-describing byte sequence.
pub fn encode_database(database: &Database) -> Result<Vec<u8>> {
    bincode::serialize(database).map_err(|e| Error::Io(e.to_string()))
}

/// Restores a database from snapshot bytes.
pub fn decode_database(bytes: &[u8]) -> Result<Database> {
    bincode::deserialize(bytes).map_err(|e| Error::CorruptSnapshot(e.to_string()))
}

/// Filesystem adapter: one `<name>.snapshot` file per database under a
/// base directory.
pub struct FileStore {
    dir: PathBuf,
}

const SNAPSHOT_EXTENSION: &str = "snapshot";

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, SNAPSHOT_EXTENSION))
    }
}

impl SnapshotStore for FileStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(name), bytes)?;
        debug!(database = name, size = bytes.len(), "saved snapshot");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>> {
        match std::fs::read(self.path(name)) {
            Ok(bytes) => {
                debug!(database = name, size = bytes.len(), "loaded snapshot");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::SnapshotNotFound(name.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory adapter, used by tests and as the default for sessions that
/// never persist.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.snapshots
            .borrow_mut()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>> {
        self.snapshots
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SnapshotNotFound(name.into()))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.snapshots.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableData;
    use crate::types::schema::{Column, Table};
    use crate::types::{DataType, Value};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn sample_database() -> Database {
        let schema = Table::new(
            "t".into(),
            vec![
                Column::new("id", DataType::Serial).primary_key(),
                Column::new("b", DataType::Boolean),
                Column::new("f", DataType::Float),
                Column::new("s", DataType::Text),
                Column::new("d", DataType::Date),
                Column::new("tm", DataType::Time),
                Column::new("ts", DataType::Timestamp),
            ],
            Vec::new(),
        )
        .unwrap();
        let mut data = TableData::new(schema);
        data.serials.insert("id".into(), 2);
        data.rows.push(vec![
            Value::Serial(1),
            Value::Boolean(true),
            Value::Float(1.5),
            Value::string("hello"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Value::Time(NaiveTime::from_hms_opt(3, 4, 5).unwrap()),
            Value::Timestamp(NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveTime::from_hms_opt(3, 4, 5).unwrap(),
            )),
        ]);
        let mut null_row = vec![Value::Serial(2)];
        null_row.resize(7, Value::Null);
        data.rows.push(null_row);
        let mut db = Database::new("d");
        db.tables.insert("t".into(), data);
        db
    }

    #[test]
    fn test_snapshot_roundtrip_every_value_variant() {
        let db = sample_database();
        let bytes = encode_database(&db).unwrap();
        let restored = decode_database(&bytes).unwrap();
        assert_eq!(db, restored);
    }

    #[test]
    fn test_corrupt_snapshot_detected() {
        assert!(matches!(
            decode_database(&[0xff, 0x00, 0x01]),
            Err(Error::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.save("a", b"123").unwrap();
        assert_eq!(store.load("a").unwrap(), b"123");
        assert_eq!(
            store.load("missing").unwrap_err(),
            Error::SnapshotNotFound("missing".into())
        );
        assert_eq!(store.list().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let db = sample_database();
        let bytes = encode_database(&db).unwrap();
        store.save("d", &bytes).unwrap();
        assert_eq!(store.list().unwrap(), vec!["d".to_string()]);
        assert_eq!(decode_database(&store.load("d").unwrap()).unwrap(), db);
    }
}
