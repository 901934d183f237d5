//! In-process store guarded by a mutex.

use crate::store::{Backend, Database};
use crate::{Error, Result};
use std::sync::{Mutex, MutexGuard};

/// A store that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    db: Mutex<Database>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::State("memory store lock poisoned".into()))
    }
}

impl Backend for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> Result<R> {
        let db = self.lock()?;
        Ok(f(&db))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        let mut db = self.lock()?;
        let mut staged = db.clone();
        let result = f(&mut staged)?;
        *db = staged;
        Ok(result)
    }
}
