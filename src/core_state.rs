//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state between the HTTP facade and
//! background workers. SQLite connections are opened per call — rusqlite
//! connections are not `Sync`, and each worker thread needs its own.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Shared application state, wrapped in `Arc` at startup.
pub struct CoreState {
    db_path: PathBuf,
}

impl CoreState {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection to the insights database (runs pending migrations).
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        Ok(db::open_database(&self.db_path)?)
    }
}
