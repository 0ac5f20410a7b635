/// # Test Utilities Module
///
/// Fixtures shared by the unit tests: in-memory connections and on-disk
/// databases described by option sets.

use crate::config::MemoryOptionSet;
use crate::core::db::{Connection, ConnectionCredential, Credential, Role, SqliteQuoter};
use crate::drivers::ConnectionFactory;
use std::sync::Arc;
use tempfile::TempDir;

pub const GROUP: &str = "databases";

/// A connection to a private in-memory database, reads sharing the write handle.
pub fn memory_connection() -> Connection {
    let credential = Arc::new(Credential::for_database(":memory:"));
    Connection::new(ConnectionCredential::new(
        Arc::new(SqliteQuoter),
        credential.clone(),
        credential,
    ))
}

/// On-disk database with split write/read credentials in an option set
pub struct DatabaseFixture {
    pub dir: TempDir,
    pub config: MemoryOptionSet,
}

impl DatabaseFixture {
    /// Configures connection `name` with distinct `.write` and `.read` entries
    /// pointing at the same file.
    pub fn split(name: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("{}.db", name));
        let path = path.to_str().unwrap();

        let config = MemoryOptionSet::new()
            .with(GROUP, &format!("{}.driver", name), "Sqlite")
            .with(GROUP, &format!("{}.write", name), format!("host=primary;name={}", path))
            .with(GROUP, &format!("{}.read", name), format!("host=replica;name={}", path));

        DatabaseFixture { dir, config }
    }

    pub fn connect(&self, name: &str) -> Connection {
        ConnectionFactory::default()
            .connect_using_config(&self.config, GROUP, name)
            .unwrap()
    }

    /// Creates and fills a `users` table through the write handle.
    pub fn with_sample_data(name: &str) -> (Self, Connection) {
        let fixture = Self::split(name);
        let conn = fixture.connect(name);
        conn.handle(Role::Write)
            .unwrap()
            .execute_batch(
                "
                CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL UNIQUE,
                    active BOOLEAN DEFAULT TRUE
                );
                INSERT INTO users (username, email) VALUES ('alice', 'alice@example.com');
                INSERT INTO users (username, email) VALUES ('bob', 'bob@example.com');
                INSERT INTO users (username, email, active)
                    VALUES ('charlie', 'charlie@example.com', 0);
            ",
            )
            .unwrap();
        (fixture, conn)
    }
}
