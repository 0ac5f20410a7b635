/// Query Execution Module
///
/// A `Query` owns SQL text and runs it against its connection in one of three
/// preparation modes chosen at construction:
///
/// - **Native**: the statement is prepared once by SQLite and the handle is
///   reused for every execution, rebinding parameters each time.
/// - **Emulated**: the statement is "prepared" client-side into an
///   [`EmulatedStatement`] template; each execution inlines quoted parameters
///   and hands literal SQL to SQLite.
/// - **Unprepared**: the literal SQL is submitted on every call and nothing is
///   cached. Parameters are rejected.
///
/// Every execution returns a [`ResultSet`] that borrows the query, so the
/// previous cursor is always closed before the statement runs again.

use crate::core::db::connection::{Connection, Role};
use crate::core::db::emulate::EmulatedStatement;
use crate::core::db::result_set::{read_row, FetchMode, ResultSet};
use crate::core::{DbError, Result};
use once_cell::unsync::OnceCell;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Statement};
use tracing::{debug, warn};

/// Statement preparation strategy of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrepareMode {
    /// Prepared by the native client and reused across executions
    #[default]
    Native,
    /// Prepared client-side, parameters inlined as literals
    Emulated,
    /// Submitted as literal SQL on every execution
    Unprepared,
}

impl std::str::FromStr for PrepareMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(PrepareMode::Native),
            "emulated" => Ok(PrepareMode::Emulated),
            "unprepared" | "none" => Ok(PrepareMode::Unprepared),
            other => Err(format!("unknown prepare mode '{}'", other)),
        }
    }
}

/// A SQL statement bound to a connection.
pub struct Query<'c> {
    connection: &'c Connection,
    sql: String,
    mode: PrepareMode,
    role: Role,
    fetch_mode: FetchMode,
    params: Vec<Value>,
    /// Native handle reused across executions (native mode only)
    statement: Option<Statement<'c>>,
    /// Client-side template (emulated mode only)
    template: OnceCell<EmulatedStatement>,
    /// Statement of the latest emulated or unprepared execution; replaced on every call
    transient: Option<Statement<'c>>,
    /// Set when an execution or fetch failed on the cached handle
    stale: bool,
    prepare_count: usize,
    execution_count: usize,
}

impl<'c> Query<'c> {
    pub fn new(connection: &'c Connection, sql: &str, mode: PrepareMode, role: Role) -> Self {
        Query {
            connection,
            sql: sql.to_string(),
            mode,
            role,
            fetch_mode: FetchMode::default(),
            params: Vec::new(),
            statement: None,
            template: OnceCell::new(),
            transient: None,
            stale: false,
            prepare_count: 0,
            execution_count: 0,
        }
    }

    pub fn with_fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
        self.fetch_mode = fetch_mode;
        self
    }

    pub fn set_fetch_mode(&mut self, fetch_mode: FetchMode) {
        self.fetch_mode = fetch_mode;
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn mode(&self) -> PrepareMode {
        self.mode
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Parameters bound by the latest execution.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Number of statements handed to the native client for preparation.
    pub fn prepare_count(&self) -> usize {
        self.prepare_count
    }

    pub fn execution_count(&self) -> usize {
        self.execution_count
    }

    /// Whether a statement handle is held for reuse by the next execution.
    pub fn has_cached_statement(&self) -> bool {
        self.statement.is_some() || self.template.get().is_some()
    }

    /// Executes the query with `params` bound to its placeholders in order.
    pub fn execute(&mut self, params: &[Value]) -> Result<ResultSet<'_>> {
        self.params = params.to_vec();
        self.execution_count += 1;
        match self.mode {
            PrepareMode::Native => self.execute_native(),
            PrepareMode::Emulated => self.execute_emulated(),
            PrepareMode::Unprepared => self.execute_unprepared(),
        }
    }

    fn execute_native(&mut self) -> Result<ResultSet<'_>> {
        if self.stale {
            warn!(sql = %self.sql, "discarding statement left by a failed execution");
            self.statement = None;
            self.stale = false;
        }

        let statement = match self.statement.take() {
            Some(statement) => {
                debug!(sql = %self.sql, "reusing prepared statement");
                self.statement.insert(statement)
            }
            None => {
                let handle = self.connection.handle(self.role)?;
                let statement = handle
                    .prepare(&self.sql)
                    .map_err(|e| DbError::execution(&self.sql, e))?;
                self.prepare_count += 1;
                debug!(sql = %self.sql, role = ?self.role, "prepared native statement");
                self.statement.insert(statement)
            }
        };

        run(
            statement,
            &self.sql,
            &self.params,
            self.fetch_mode,
            Some(&mut self.stale),
        )
    }

    fn execute_emulated(&mut self) -> Result<ResultSet<'_>> {
        let template = self.template.get_or_try_init(|| {
            EmulatedStatement::parse(&self.sql).map_err(|e| DbError::execution(&self.sql, e))
        })?;
        let rendered = template
            .render(&self.params, self.connection.quoter())
            .map_err(|e| DbError::execution(&self.sql, e))?;
        debug!(sql = %self.sql, %rendered, "rendered emulated statement");

        let handle = self.connection.handle(self.role)?;
        let statement = handle
            .prepare(&rendered)
            .map_err(|e| DbError::execution(&rendered, e))?;
        self.prepare_count += 1;
        let statement = self.transient.insert(statement);
        run(statement, &self.sql, &[], self.fetch_mode, None)
    }

    fn execute_unprepared(&mut self) -> Result<ResultSet<'_>> {
        if !self.params.is_empty() {
            let source = rusqlite::Error::InvalidParameterCount(self.params.len(), 0);
            return Err(DbError::execution(&self.sql, source));
        }

        let handle = self.connection.handle(self.role)?;
        let statement = handle
            .prepare(&self.sql)
            .map_err(|e| DbError::execution(&self.sql, e))?;
        self.prepare_count += 1;
        let statement = self.transient.insert(statement);
        run(statement, &self.sql, &[], self.fetch_mode, None)
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("mode", &self.mode)
            .field("role", &self.role)
            .field("fetch_mode", &self.fetch_mode)
            .field("params", &self.params)
            .field("prepare_count", &self.prepare_count)
            .field("execution_count", &self.execution_count)
            .finish()
    }
}

/// Binds `params` and runs `statement`, raising `stale` if it fails.
fn run<'s>(
    statement: &'s mut Statement<'_>,
    sql: &str,
    params: &[Value],
    fetch_mode: FetchMode,
    stale: Option<&'s mut bool>,
) -> Result<ResultSet<'s>> {
    match step(statement, sql, params, fetch_mode) {
        Ok(result) => Ok(result.with_failure_flag(stale)),
        Err(e) => {
            if let Some(stale) = stale {
                *stale = true;
            }
            Err(e)
        }
    }
}

/// Statements without result columns, and statements that modify the
/// database, run to completion here. Read-only queries step their first row
/// and leave the rest of the cursor to the caller.
fn step<'s>(
    statement: &'s mut Statement<'_>,
    sql: &str,
    params: &[Value],
    fetch_mode: FetchMode,
) -> Result<ResultSet<'s>> {
    let error = |e: rusqlite::Error| DbError::execution(sql, e);

    if statement.column_count() == 0 {
        let affected = statement
            .execute(params_from_iter(params.iter()))
            .map_err(error)?;
        return Ok(ResultSet::affected(sql, fetch_mode, affected));
    }

    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let width = columns.len();
    let readonly = statement.readonly();
    let mut rows = statement
        .query(params_from_iter(params.iter()))
        .map_err(error)?;

    if !readonly {
        let mut buffered = Vec::new();
        while let Some(row) = rows.next().map_err(error)? {
            buffered.push(read_row(row, width).map_err(error)?);
        }
        return Ok(ResultSet::buffered(sql, columns, fetch_mode, buffered));
    }

    let first = match rows.next().map_err(error)? {
        Some(row) => Some(read_row(row, width).map_err(error)?),
        None => None,
    };
    Ok(ResultSet::streaming(sql, columns, fetch_mode, first, rows))
}
