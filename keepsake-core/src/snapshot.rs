//! Snapshot codec: the store's contents as a JSON file.
//!
//! The on-disk format is a single top-level object mapping each key to its
//! persisted record, `{"value": <scalar>, "expires_at": <epoch-seconds-or-null>}`.
//! The codec owns the file exclusively; the store never touches the path
//! except through `save` and `load`.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::entry::Entry;

/// Error type for snapshot operations
#[derive(Debug)]
pub enum SnapshotError {
    /// Filesystem failure while reading or writing the snapshot file
    Io(io::Error),
    /// The snapshot file exists but could not be parsed
    Corrupt(serde_json::Error),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "snapshot I/O failed: {}", e),
            SnapshotError::Corrupt(e) => write!(f, "snapshot file is corrupt: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            SnapshotError::Corrupt(e) => Some(e),
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

/// Writes every given entry to `path`.
///
/// The snapshot is written to a sibling `.tmp` file, synced, and renamed
/// over the target, so a prior snapshot is either fully replaced or left
/// intact; readers never observe a half-written file. Keys are emitted in
/// sorted order so identical store states produce identical files.
///
/// Callers are expected to pass live entries only; the codec persists what
/// it is given.
pub(crate) fn save(entries: &[(String, Entry)], path: &Path) -> Result<(), SnapshotError> {
    let map: BTreeMap<&str, &Entry> = entries.iter().map(|(k, e)| (k.as_str(), e)).collect();

    let tmp = path.with_extension("tmp");
    let file = File::create(&tmp)?;
    serde_json::to_writer(&file, &map).map_err(io::Error::from)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads a snapshot back from `path`.
///
/// `Ok(None)` means no snapshot exists yet, which is a normal first-run
/// condition rather than an error. Entries whose expiration instant has
/// already passed are dropped during the read; expired data is never
/// resurrected into a store.
pub(crate) fn load(path: &Path) -> Result<Option<HashMap<String, Entry>>, SnapshotError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SnapshotError::Io(e)),
    };

    let map: HashMap<String, Entry> =
        serde_json::from_str(&data).map_err(SnapshotError::Corrupt)?;

    Ok(Some(map.into_iter().filter(|(_, e)| !e.is_expired()).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock;
    use crate::entry::Value;
    use tempfile::tempdir;

    fn entry(value: Value, expires_at: Option<u64>) -> Entry {
        Entry::new(value, expires_at)
    }

    #[test]
    fn test_round_trip_preserves_values_and_expirations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let expires = clock::now() + 3600;
        let entries = vec![
            ("a".to_string(), entry(Value::Int(1), None)),
            ("b".to_string(), entry(Value::Int(2), Some(expires))),
        ];

        save(&entries, &path).unwrap();
        let loaded = load(&path).unwrap().expect("snapshot should exist");

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["a"].value(), &Value::Int(1));
        assert_eq!(loaded["a"].expires_at(), None);
        assert_eq!(loaded["b"].value(), &Value::Int(2));
        assert_eq!(loaded["b"].expires_at(), Some(expires));
    }

    #[test]
    fn test_load_missing_file_is_no_prior_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does_not_exist.json");

        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");
        fs::write(&path, "{not json at all").unwrap();

        match load(&path) {
            Err(SnapshotError::Corrupt(_)) => {}
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_load_drops_already_expired_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let entries = vec![
            ("live".to_string(), entry(Value::from("keep"), Some(clock::now() + 60))),
            ("dead".to_string(), entry(Value::from("drop"), Some(clock::now() - 60))),
        ];
        save(&entries, &path).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("live"));
        assert!(!loaded.contains_key("dead"));
    }

    #[test]
    fn test_save_fully_replaces_prior_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let first = vec![("old".to_string(), entry(Value::Int(1), None))];
        save(&first, &path).unwrap();

        let second = vec![("new".to_string(), entry(Value::Int(2), None))];
        save(&second, &path).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("new"));
        assert!(!loaded.contains_key("old"));

        // No temp file left behind after the rename
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_save_to_unwritable_path_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_subdir").join("dump.json");

        let entries = vec![("k".to_string(), entry(Value::Null, None))];
        match save(&entries, &path) {
            Err(SnapshotError::Io(_)) => {}
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_save_is_deterministic_for_a_given_state() {
        let dir = tempdir().unwrap();
        let path_a = dir.path().join("a.json");
        let path_b = dir.path().join("b.json");

        let entries = vec![
            ("zebra".to_string(), entry(Value::Int(1), None)),
            ("apple".to_string(), entry(Value::Int(2), None)),
        ];
        save(&entries, &path_a).unwrap();

        let mut reversed = entries.clone();
        reversed.reverse();
        save(&reversed, &path_b).unwrap();

        assert_eq!(
            fs::read_to_string(&path_a).unwrap(),
            fs::read_to_string(&path_b).unwrap()
        );
    }
}
