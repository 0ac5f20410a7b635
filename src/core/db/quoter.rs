/// Quoting Module
///
/// Turns identifiers and values into SQL literals. Emulated prepared
/// statements inline their parameters through the connection's quoter.

use rusqlite::types::Value;

/// SQL quoting capability of a driver.
pub trait Quoter: Send + Sync {
    /// Quotes an identifier (table, column, ...) for use in SQL text.
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Renders a value as a SQL literal.
    fn quote_value(&self, value: &Value) -> String;
}

/// Quoting rules understood by SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteQuoter;

impl Quoter for SqliteQuoter {
    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            // SQLite stores non-finite reals as NULL
            Value::Real(f) if !f.is_finite() => "NULL".to_string(),
            // Debug keeps the fractional part so 1.0 stays a REAL
            Value::Real(f) => format!("{:?}", f),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                format!("X'{}'", hex)
            }
        }
    }
}
