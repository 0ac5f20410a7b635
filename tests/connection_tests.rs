#[cfg(test)]
mod connection_tests {
    use rusqlite::types::Value;
    use splitdb::drivers::SqliteDriver;
    use splitdb::{
        ConnectionFactory, DbError, DriverRegistry, FetchMode, MemoryOptionSet, PrepareMode,
        Record, Role, TomlOptionSet,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pdo_factory() -> ConnectionFactory {
        let mut registry = DriverRegistry::with_builtin_drivers();
        registry.register("Pdo", || Box::new(SqliteDriver));
        ConnectionFactory::new(registry)
    }

    #[test]
    fn test_round_trip_scenario() {
        let config = MemoryOptionSet::new()
            .with("databases", "db.driver", "Pdo")
            .with("databases", "db.write", "host=a;user=u;pass=p;name=n");

        let conn = pdo_factory()
            .connect_using_config(&config, "databases", "db")
            .unwrap();
        let write = conn.write_credential();
        assert!(Arc::ptr_eq(write, conn.read_credential()));
        assert_eq!(write.host(), Some("a"));
        assert_eq!(write.user(), Some("u"));
        assert_eq!(write.secret(), Some("p"));
        assert_eq!(write.database(), Some("n"));
        // nothing is opened until a query runs
        assert!(!conn.is_open(Role::Write));
    }

    #[test]
    fn test_unknown_driver_is_fatal() {
        let config = MemoryOptionSet::new()
            .with("databases", "db.driver", "Nonexistent")
            .with("databases", "db.write", "name=:memory:");
        match pdo_factory().connect_using_config(&config, "databases", "db") {
            Err(DbError::UnknownDriver(driver)) => assert_eq!(driver, "Nonexistent"),
            other => panic!("Expected UnknownDriver, got {other:?}"),
        }
    }

    #[test]
    fn test_statement_reuse_does_not_leak_parameters() {
        let config = MemoryOptionSet::new()
            .with("databases", "mem.driver", "Sqlite")
            .with("databases", "mem", "name=:memory:");
        let conn = ConnectionFactory::default()
            .connect_using_config(&config, "databases", "mem")
            .unwrap();

        let mut setup = conn.write_query(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, qty INTEGER)",
            PrepareMode::Unprepared,
        );
        setup.execute(&[]).unwrap();

        let mut insert = conn.write_query(
            "INSERT INTO items (label, qty) VALUES (?, ?)",
            PrepareMode::Native,
        );
        for (label, qty) in [("bolt", 10), ("nut", 25), ("washer", 25)] {
            insert
                .execute(&[Value::Text(label.to_string()), Value::Integer(qty)])
                .unwrap();
        }
        assert_eq!(insert.prepare_count(), 1);

        let mut by_qty = conn
            .read_query(
                "SELECT label FROM items WHERE qty = ? ORDER BY id",
                PrepareMode::Native,
            )
            .with_fetch_mode(FetchMode::Ordered);

        let first = by_qty.execute(&[Value::Integer(10)]).unwrap().fetch_all().unwrap();
        assert_eq!(first, vec![Record::Ordered(vec![Value::Text("bolt".to_string())])]);

        let second = by_qty.execute(&[Value::Integer(25)]).unwrap().fetch_all().unwrap();
        assert_eq!(
            second,
            vec![
                Record::Ordered(vec![Value::Text("nut".to_string())]),
                Record::Ordered(vec![Value::Text("washer".to_string())]),
            ]
        );

        let none = by_qty.execute(&[Value::Integer(99)]).unwrap().fetch_all().unwrap();
        assert!(none.is_empty());
        assert_eq!(by_qty.prepare_count(), 1);
        assert_eq!(by_qty.execution_count(), 3);
    }

    #[test]
    fn test_toml_configured_split_connection() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("orders.db");
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
[databases.orders]
driver = "Sqlite"
write = "host=primary;name={path}"
read = "host=replica;name={path};timeout=100"
"#,
                path = db_path.display()
            ),
        )
        .unwrap();

        let config = TomlOptionSet::load(&config_path).unwrap();
        let conn = ConnectionFactory::default()
            .connect_using_config(&config, "databases", "orders")
            .unwrap();
        assert_eq!(conn.read_credential().busy_timeout_ms(), Some(100));

        conn.write_query(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, total REAL)",
            PrepareMode::Unprepared,
        )
        .execute(&[])
        .unwrap();
        conn.write_query("INSERT INTO orders (total) VALUES (?)", PrepareMode::Emulated)
            .execute(&[Value::Real(19.5)])
            .unwrap();

        let result = conn
            .read_query("SELECT id, total FROM orders", PrepareMode::Native)
            .execute(&[])
            .unwrap()
            .into_query_result()
            .unwrap();
        assert_eq!(result.columns, vec!["id", "total"]);
        assert_eq!(result.rows, vec![vec!["1".to_string(), "19.5".to_string()]]);
        assert!(conn.is_open(Role::Read));
    }
}
