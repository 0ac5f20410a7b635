//! SQLite driver: credential resolution for split write/read connections.

use crate::config::OptionSet;
use crate::core::db::{
    ConfigCredentialFactory, Connection, ConnectionCredential, Credential, CredentialFactory,
    SqliteQuoter,
};
use crate::core::Result;
use crate::drivers::Driver;
use std::sync::Arc;
use tracing::debug;

/// Builds SQLite connections from named credentials.
///
/// For a connection named `name` the credentials are resolved in this order:
///
/// 1. `name.write`, with `name.read` for reads (falling back to the write
///    credential when no read credential exists);
/// 2. `name` for both writes and reads.
///
/// If neither `name.write` nor `name` exists, the error of the `name.write`
/// lookup is returned.
pub struct SqliteConnectionFactory<C> {
    credentials: C,
}

impl<C: CredentialFactory> SqliteConnectionFactory<C> {
    pub fn new(credentials: C) -> Self {
        SqliteConnectionFactory { credentials }
    }

    /// Resolves the credentials of `name` and builds an unopened connection.
    pub fn get_connection(&self, name: &str) -> Result<Connection> {
        let (write, read) = self.resolve(name)?;
        Ok(Connection::new(ConnectionCredential::new(
            Arc::new(SqliteQuoter),
            write,
            read,
        )))
    }

    fn resolve(&self, name: &str) -> Result<(Arc<Credential>, Arc<Credential>)> {
        let write_error = match self.credentials.get_credential(&format!("{}.write", name)) {
            Ok(write) => {
                let read = match self.credentials.get_credential(&format!("{}.read", name)) {
                    Ok(read) => read,
                    Err(e) if e.is_key_missing() => {
                        debug!(name, "no read credential, reading through the write credential");
                        write.clone()
                    }
                    Err(e) => return Err(e),
                };
                return Ok((write, read));
            }
            Err(e) if e.is_key_missing() => e,
            Err(e) => return Err(e),
        };

        match self.credentials.get_credential(name) {
            Ok(general) => {
                debug!(name, "using general credential for writes and reads");
                Ok((general.clone(), general))
            }
            Err(e) if e.is_key_missing() => Err(write_error),
            Err(e) => Err(e),
        }
    }
}

/// Registry entry for the SQLite driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn connect_using_config(
        &self,
        config: &dyn OptionSet,
        group: &str,
        connection_name: &str,
    ) -> Result<Connection> {
        SqliteConnectionFactory::new(ConfigCredentialFactory::new(config, group))
            .get_connection(connection_name)
    }
}
