/// Credential Module
///
/// Credentials are the resolved connection parameters for one access role.
/// They are parsed from DSN-style option values such as
/// `host=db1;user=app;pass=secret;name=/var/lib/app/main.db`.

use crate::config::OptionSet;
use crate::core::db::quoter::Quoter;
use crate::core::{DbError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Immutable connection parameters for a single role (write or read).
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    secret: Option<String>,
    database: Option<String>,
    role: Option<String>,
    busy_timeout_ms: Option<u64>,
}

impl Credential {
    /// Parses a `key=value;key=value` credential string.
    ///
    /// `name` identifies the configuration entry in error messages.
    pub fn parse(name: &str, dsn: &str) -> Result<Self> {
        let invalid = |reason: String| DbError::InvalidCredential {
            key: name.to_string(),
            reason,
        };

        let mut credential = Credential::default();
        for segment in dsn.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| invalid(format!("segment '{}' is not key=value", segment)))?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "host" => credential.host = Some(value),
                "port" => {
                    let port = value
                        .parse::<u16>()
                        .map_err(|_| invalid(format!("port '{}' is not a number", value)))?;
                    credential.port = Some(port);
                }
                "user" => credential.user = Some(value),
                "pass" | "password" => credential.secret = Some(value),
                "name" | "dbname" | "database" => credential.database = Some(value),
                "role" => credential.role = Some(value),
                "timeout" => {
                    let timeout = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("timeout '{}' is not a number", value)))?;
                    credential.busy_timeout_ms = Some(timeout);
                }
                other => return Err(invalid(format!("unknown key '{}'", other))),
            }
        }
        Ok(credential)
    }

    /// Creates a credential that only names a database.
    pub fn for_database(database: impl Into<String>) -> Self {
        Credential {
            database: Some(database.into()),
            ..Credential::default()
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Busy timeout handed to the native client, in milliseconds.
    pub fn busy_timeout_ms(&self) -> Option<u64> {
        self.busy_timeout_ms
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("role", &self.role)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}

/// The write and read credentials of one logical connection, together with
/// the quoting capability of the driver that resolved them.
#[derive(Clone)]
pub struct ConnectionCredential {
    quoter: Arc<dyn Quoter>,
    write: Arc<Credential>,
    read: Arc<Credential>,
}

impl ConnectionCredential {
    pub fn new(quoter: Arc<dyn Quoter>, write: Arc<Credential>, read: Arc<Credential>) -> Self {
        ConnectionCredential {
            quoter,
            write,
            read,
        }
    }

    pub fn quoter(&self) -> &Arc<dyn Quoter> {
        &self.quoter
    }

    pub fn write(&self) -> &Arc<Credential> {
        &self.write
    }

    pub fn read(&self) -> &Arc<Credential> {
        &self.read
    }

    /// True when reads go through the write credential.
    pub fn read_is_write(&self) -> bool {
        Arc::ptr_eq(&self.write, &self.read)
    }
}

impl fmt::Debug for ConnectionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredential")
            .field("write", &self.write)
            .field("read", &self.read)
            .field("read_is_write", &self.read_is_write())
            .finish()
    }
}

/// Resolves named credentials.
///
/// Implementations must report an absent name as `DbError::ConfigKeyMissing`
/// so that connection factories can fall back to other names.
pub trait CredentialFactory {
    fn get_credential(&self, name: &str) -> Result<Arc<Credential>>;
}

/// Credential factory reading DSN strings from an option set group.
pub struct ConfigCredentialFactory<'a> {
    config: &'a dyn OptionSet,
    group: String,
}

impl<'a> ConfigCredentialFactory<'a> {
    pub fn new(config: &'a dyn OptionSet, group: &str) -> Self {
        ConfigCredentialFactory {
            config,
            group: group.to_string(),
        }
    }
}

impl CredentialFactory for ConfigCredentialFactory<'_> {
    fn get_credential(&self, name: &str) -> Result<Arc<Credential>> {
        let dsn = self.config.get(&self.group, name)?;
        let credential = Credential::parse(name, &dsn)?;
        debug!(group = %self.group, name, ?credential, "resolved credential");
        Ok(Arc::new(credential))
    }
}
