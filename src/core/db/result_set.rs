/// Result Set Module
///
/// A thin wrapper over the native cursor of an executed statement. A result
/// set mutably borrows the query that produced it, so it must be dropped (and
/// its cursor closed) before the query can run again. Statements that modify
/// the database are run to completion during execution and their rows are
/// buffered here.

use crate::core::{DbError, Result};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Row, Rows};

/// Shape of the records produced by [`ResultSet::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Values in column order
    #[default]
    Ordered,
    /// Column name and value pairs
    Named,
}

/// One fetched row.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Ordered(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Record {
    /// Values in column order, whatever the fetch mode.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Record::Ordered(values) => values.iter().collect(),
            Record::Named(pairs) => pairs.iter().map(|(_, value)| value).collect(),
        }
    }

    /// Looks up a value by column name. Ordered records carry no names.
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self {
            Record::Ordered(_) => None,
            Record::Named(pairs) => pairs
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| value),
        }
    }
}

/// Represents the result of a SQL query execution, formatted for display
#[derive(Debug)]
pub struct QueryResult {
    /// Column names from the query result
    pub columns: Vec<String>,
    /// Rows of data as string values
    pub rows: Vec<Vec<String>>,
    /// Number of rows returned
    pub row_count: usize,
    /// Rows changed by a statement without result columns
    pub affected_rows: usize,
}

impl QueryResult {
    /// Creates a new QueryResult from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>, affected_rows: usize) -> Self {
        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
            affected_rows,
        }
    }
}

enum Cursor<'q> {
    Closed,
    /// Rows collected while the statement ran
    Buffered(std::vec::IntoIter<Vec<Value>>),
    /// Live native cursor; `first` holds the row stepped during execution
    Streaming {
        first: Option<Vec<Value>>,
        rows: Rows<'q>,
    },
}

/// Cursor over the rows of one execution.
pub struct ResultSet<'q> {
    sql: String,
    columns: Vec<String>,
    fetch_mode: FetchMode,
    affected_rows: usize,
    cursor: Cursor<'q>,
    /// Raised when stepping the native cursor fails
    failed: Option<&'q mut bool>,
}

impl<'q> ResultSet<'q> {
    pub(crate) fn streaming(
        sql: &str,
        columns: Vec<String>,
        fetch_mode: FetchMode,
        first: Option<Vec<Value>>,
        rows: Rows<'q>,
    ) -> Self {
        ResultSet::new(sql, columns, fetch_mode, 0, Cursor::Streaming { first, rows })
    }

    pub(crate) fn buffered(
        sql: &str,
        columns: Vec<String>,
        fetch_mode: FetchMode,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let cursor = Cursor::Buffered(rows.into_iter());
        ResultSet::new(sql, columns, fetch_mode, 0, cursor)
    }

    pub(crate) fn affected(sql: &str, fetch_mode: FetchMode, affected_rows: usize) -> Self {
        ResultSet::new(sql, Vec::new(), fetch_mode, affected_rows, Cursor::Closed)
    }

    fn new(
        sql: &str,
        columns: Vec<String>,
        fetch_mode: FetchMode,
        affected_rows: usize,
        cursor: Cursor<'q>,
    ) -> Self {
        ResultSet {
            sql: sql.to_string(),
            columns,
            fetch_mode,
            affected_rows,
            cursor,
            failed: None,
        }
    }

    /// Flag set when a later fetch fails, so the owner can discard its statement.
    pub(crate) fn with_failure_flag(mut self, failed: Option<&'q mut bool>) -> Self {
        self.failed = failed;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Rows changed by the statement; zero for statements that return rows.
    pub fn affected_rows(&self) -> usize {
        self.affected_rows
    }

    /// Fetches the next record, or `None` once the cursor is exhausted.
    pub fn fetch(&mut self) -> Result<Option<Record>> {
        let Some(values) = self.next_values()? else {
            return Ok(None);
        };
        Ok(Some(match self.fetch_mode {
            FetchMode::Ordered => Record::Ordered(values),
            FetchMode::Named => Record::Named(self.columns.iter().cloned().zip(values).collect()),
        }))
    }

    /// Fetches every remaining record.
    pub fn fetch_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.fetch()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Closes the cursor. Dropping the result set has the same effect.
    pub fn close(self) {}

    /// Drains the cursor into display strings.
    pub fn into_query_result(mut self) -> Result<QueryResult> {
        let mut grid: Vec<Vec<String>> = Vec::new();
        while let Some(values) = self.next_values()? {
            grid.push(values.iter().map(|v| format_value(ValueRef::from(v))).collect());
        }
        Ok(QueryResult::new(
            std::mem::take(&mut self.columns),
            grid,
            self.affected_rows,
        ))
    }

    fn next_values(&mut self) -> Result<Option<Vec<Value>>> {
        let next = match &mut self.cursor {
            Cursor::Closed => Ok(None),
            Cursor::Buffered(rows) => Ok(rows.next()),
            Cursor::Streaming { first, rows } => match first.take() {
                Some(values) => Ok(Some(values)),
                None => match rows.next() {
                    Ok(Some(row)) => read_row(row, self.columns.len()).map(Some),
                    Ok(None) => Ok(None),
                    Err(e) => Err(e),
                },
            },
        };
        next.map_err(|e| {
            if let Some(failed) = self.failed.as_deref_mut() {
                *failed = true;
            }
            DbError::execution(&self.sql, e)
        })
    }
}

/// Copies the first `width` columns of `row`.
pub(crate) fn read_row(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<Value>> {
    (0..width)
        .map(|i| row.get_ref(i).map(Value::from))
        .collect()
}

impl std::fmt::Debug for ResultSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("sql", &self.sql)
            .field("columns", &self.columns)
            .field("fetch_mode", &self.fetch_mode)
            .field("affected_rows", &self.affected_rows)
            .field("open", &!matches!(self.cursor, Cursor::Closed))
            .finish()
    }
}

/// Formats a SQLite value for display
fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessors() {
        let named = Record::Named(vec![
            ("id".to_string(), Value::Integer(1)),
            ("name".to_string(), Value::Text("Alice".to_string())),
        ]);
        assert_eq!(named.get("name"), Some(&Value::Text("Alice".to_string())));
        assert_eq!(named.get("missing"), None);
        assert_eq!(
            named.values(),
            vec![&Value::Integer(1), &Value::Text("Alice".to_string())]
        );

        let ordered = Record::Ordered(vec![Value::Null]);
        assert_eq!(ordered.get("id"), None);
        assert_eq!(ordered.values(), vec![&Value::Null]);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(ValueRef::Null), "NULL");
        assert_eq!(format_value(ValueRef::Integer(3)), "3");
        assert_eq!(format_value(ValueRef::Text(b"hi")), "hi");
        assert_eq!(format_value(ValueRef::Blob(b"Hello")), "<BLOB: 5 bytes>");
    }

    #[test]
    fn test_affected_result_set_is_empty() {
        let mut result = ResultSet::affected("DELETE FROM t", FetchMode::Named, 4);
        assert_eq!(result.affected_rows(), 4);
        assert!(result.columns().is_empty());
        assert!(result.fetch().unwrap().is_none());
        let grid = result.into_query_result().unwrap();
        assert_eq!(grid.row_count, 0);
        assert_eq!(grid.affected_rows, 4);
    }

    #[test]
    fn test_buffered_result_set() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec![Value::Integer(1), Value::Text("a".to_string())],
            vec![Value::Integer(2), Value::Null],
        ];
        let mut result =
            ResultSet::buffered("INSERT ... RETURNING", columns, FetchMode::Named, rows);
        assert_eq!(
            result.fetch().unwrap().unwrap().get("name"),
            Some(&Value::Text("a".to_string()))
        );
        let grid = result.into_query_result().unwrap();
        assert_eq!(grid.rows, vec![vec!["2".to_string(), "NULL".to_string()]]);
    }
}
