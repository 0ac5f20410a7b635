/// Connection Management Module
///
/// A `Connection` joins a write credential and a read credential into one
/// logical connection. Native SQLite handles are opened lazily, one per role,
/// the first time a query needs them.

use crate::core::db::credential::{ConnectionCredential, Credential};
use crate::core::db::query::{PrepareMode, Query};
use crate::core::db::quoter::Quoter;
use crate::core::{DbError, Result};
use once_cell::unsync::OnceCell;
use rusqlite::OpenFlags;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Which credential a query runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Write-capable access (also valid for reads)
    Write,
    /// Read-only access
    Read,
}

/// A logical database connection with separate write and read access.
///
/// Not safe for concurrent use: handles are created and used without locking.
#[derive(Debug)]
pub struct Connection {
    credential: ConnectionCredential,
    write_handle: OnceCell<rusqlite::Connection>,
    read_handle: OnceCell<rusqlite::Connection>,
}

impl Connection {
    /// Creates a connection. No native handle is opened until first use.
    pub fn new(credential: ConnectionCredential) -> Self {
        Connection {
            credential,
            write_handle: OnceCell::new(),
            read_handle: OnceCell::new(),
        }
    }

    pub fn credential(&self) -> &ConnectionCredential {
        &self.credential
    }

    pub fn write_credential(&self) -> &Arc<Credential> {
        self.credential.write()
    }

    pub fn read_credential(&self) -> &Arc<Credential> {
        self.credential.read()
    }

    pub fn quoter(&self) -> &dyn Quoter {
        self.credential.quoter().as_ref()
    }

    /// Builds a query bound to this connection.
    pub fn query(&self, sql: &str, mode: PrepareMode, role: Role) -> Query<'_> {
        Query::new(self, sql, mode, role)
    }

    /// Builds a query that runs under the write credential.
    pub fn write_query(&self, sql: &str, mode: PrepareMode) -> Query<'_> {
        self.query(sql, mode, Role::Write)
    }

    /// Builds a query that runs under the read credential.
    pub fn read_query(&self, sql: &str, mode: PrepareMode) -> Query<'_> {
        self.query(sql, mode, Role::Read)
    }

    /// Returns the native handle for `role`, opening it on first use.
    ///
    /// Reads use the write handle when no distinct read credential exists.
    pub fn handle(&self, role: Role) -> Result<&rusqlite::Connection> {
        let (cell, credential, role) = self.slot(role);
        cell.get_or_try_init(|| open_handle(credential, role))
    }

    /// Whether the native handle serving `role` has been opened.
    pub fn is_open(&self, role: Role) -> bool {
        let (cell, _, _) = self.slot(role);
        cell.get().is_some()
    }

    /// Rowid of the most recent successful insert on the write handle.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        Ok(self.handle(Role::Write)?.last_insert_rowid())
    }

    fn slot(&self, role: Role) -> (&OnceCell<rusqlite::Connection>, &Credential, Role) {
        match role {
            Role::Read if !self.credential.read_is_write() => {
                (&self.read_handle, self.credential.read().as_ref(), Role::Read)
            }
            _ => (&self.write_handle, self.credential.write().as_ref(), Role::Write),
        }
    }
}

fn open_handle(credential: &Credential, role: Role) -> Result<rusqlite::Connection> {
    let Some(database) = credential.database() else {
        return Err(DbError::Connection {
            database: "<unnamed>".to_string(),
            source: rusqlite::Error::InvalidPath(PathBuf::new()),
        });
    };
    let connection_error = |source| DbError::Connection {
        database: database.to_string(),
        source,
    };

    debug!(
        database,
        host = credential.host(),
        user = credential.user(),
        db_role = credential.role(),
        ?role,
        "opening native handle"
    );

    let flags = match role {
        Role::Write => OpenFlags::default(),
        Role::Read => {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        }
    };
    let conn = rusqlite::Connection::open_with_flags(database, flags).map_err(connection_error)?;

    // Initialize connection with common pragmas
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(connection_error)?;
    if role == Role::Write {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(connection_error)?;
    }
    if let Some(timeout) = credential.busy_timeout_ms() {
        conn.busy_timeout(Duration::from_millis(timeout))
            .map_err(connection_error)?;
    }

    info!(database, ?role, "native handle opened");
    Ok(conn)
}
