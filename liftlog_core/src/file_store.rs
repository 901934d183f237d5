//! JSON file store with file locking.
//!
//! All records live in one JSON document. Every operation takes an advisory
//! lock on a sibling lock file, so separate processes sharing a data
//! directory see each store operation as atomic. Writes go through a temp
//! file that is synced and renamed over the document.

use crate::store::{Backend, Database};
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Store persisted under `<data_dir>/db/`
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Open (or prepare) the store inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_dir = data_dir.join("db");
        std::fs::create_dir_all(&db_dir)?;

        Ok(Self {
            path: db_dir.join("liftlog.json"),
            lock_path: db_dir.join("liftlog.lock"),
        })
    }

    /// Path of the JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn load(&self) -> Result<Database> {
        if !self.path.exists() {
            tracing::debug!("No database at {:?}, starting empty", self.path);
            return Ok(Database::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::State(format!(
                "database {:?} is corrupt ({}); refusing to overwrite it",
                self.path, e
            ))
        })
    }

    fn save(&self, db: &Database) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "database path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(db)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved database to {:?}", self.path);
        Ok(())
    }
}

impl Backend for FileStore {
    fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> Result<R> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;

        let result = self.load().map(|db| f(&db));

        lock.unlock()?;
        result
    }

    fn write<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;

        let result = self.load().and_then(|mut db| {
            let value = f(&mut db)?;
            self.save(&db)?;
            Ok(value)
        });

        lock.unlock()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Exercise, ExerciseId, ExerciseStore, ProgressionRules, Units, User, UserId, UserStore,
    };
    use chrono::Utc;

    fn curls() -> Exercise {
        Exercise {
            id: ExerciseId::new(),
            name: "Curls".into(),
            sets: 2,
            weights: vec![30.0, 40.0],
            reps: vec![12, 10],
            scores: vec![360.0, 400.0],
            pr: 400.0,
        }
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exercise = curls();

        let store = FileStore::open(temp_dir.path()).unwrap();
        store.create_exercise(&exercise).unwrap();

        let reopened = FileStore::open(temp_dir.path()).unwrap();
        let loaded = reopened.find_exercise(exercise.id).unwrap().unwrap();
        assert_eq!(loaded, exercise);
    }

    #[test]
    fn test_empty_directory_reads_as_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        assert!(store.find_user(UserId::new()).unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_failed_write_is_not_persisted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let user = User {
            id: UserId::new(),
            name: "sam".into(),
            units: Units::Imperial,
            progress: ProgressionRules::default().initial_counters(),
            workouts: vec![],
            created_at: Utc::now(),
        };
        store.create_user(&user).unwrap();

        let result = store.update_user(user.id, |u| {
            u.progress.stars = 9;
            Err(Error::Validation("abort".into()))
        });
        assert!(result.is_err());

        let stored = store.find_user(user.id).unwrap().unwrap();
        assert_eq!(stored.progress.stars, 0);
    }

    #[test]
    fn test_corrupted_database_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        std::fs::write(store.path(), "{ invalid json }").unwrap();

        let result = store.find_exercise(ExerciseId::new());
        assert!(matches!(result, Err(Error::State(_))));

        // The corrupt document is left for manual recovery
        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "{ invalid json }");
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.create_exercise(&curls()).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path().join("db"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "liftlog.json" && e.file_name() != "liftlog.lock")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only liftlog.json and liftlog.lock, found extras: {:?}",
            extras
        );
    }
}
