use rusqlite::types::Value;
use serde::Serialize;
use splitdb::{ConnectionFactory, PrepareMode, Role, TomlOptionSet};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "usage: splitdb [--config PATH] [--group GROUP] [--read] \
[--mode native|emulated|unprepared] [--json] <connection> <sql> [param...]";

const DEFAULT_GROUP: &str = "databases";

#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    group: String,
    role: Role,
    mode: PrepareMode,
    json: bool,
    connection: String,
    sql: String,
    params: Vec<String>,
}

#[derive(Serialize)]
struct JsonOutput {
    columns: Vec<String>,
    rows: Vec<serde_json::Value>,
    affected_rows: usize,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut config = None;
    let mut group = DEFAULT_GROUP.to_string();
    let mut role = Role::Write;
    let mut mode = PrepareMode::Native;
    let mut json = false;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(iter.next().ok_or("--config needs a path")?));
            }
            "--group" => group = iter.next().ok_or("--group needs a name")?.clone(),
            "--mode" => mode = iter.next().ok_or("--mode needs a value")?.parse()?,
            "--read" => role = Role::Read,
            "--json" => json = true,
            other => positional.push(other.to_string()),
        }
    }

    if positional.len() < 2 {
        return Err(USAGE.to_string());
    }
    let params = positional.split_off(2);
    let sql = positional.pop().unwrap_or_default();
    let connection = positional.pop().unwrap_or_default();

    Ok(Args {
        config,
        group,
        role,
        mode,
        json,
        connection,
        sql,
        params,
    })
}

/// `$SPLITDB_CONFIG`, else `<config dir>/splitdb/config.toml`.
fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("SPLITDB_CONFIG")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("splitdb").join("config.toml")))
}

/// Command-line parameters: integers and reals are bound as numbers, `NULL` as null.
fn parse_param(raw: &str) -> Value {
    if raw == "NULL" {
        Value::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Real(f)
    } else {
        Value::Text(raw.to_string())
    }
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Value::from(*f),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Blob(b) => serde_json::Value::from(format!("<BLOB: {} bytes>", b.len())),
    }
}

fn render_json(output: &JsonOutput) -> splitdb::Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

fn run(args: Args) -> splitdb::Result<()> {
    let path = args
        .config
        .or_else(default_config_path)
        .ok_or_else(|| splitdb::DbError::Config("no configuration file found".to_string()))?;
    let config = TomlOptionSet::load(&path)?;

    let connection =
        ConnectionFactory::default().connect_using_config(&config, &args.group, &args.connection)?;
    info!(connection = %args.connection, mode = ?args.mode, role = ?args.role, "executing");

    let params: Vec<Value> = args.params.iter().map(|raw| parse_param(raw)).collect();
    let mut query = connection.query(&args.sql, args.mode, args.role);

    if args.json {
        let mut result = query.execute(&params)?;
        let columns = result.columns().to_vec();
        let rows = result
            .fetch_all()?
            .iter()
            .map(|record| {
                serde_json::Value::Object(
                    columns
                        .iter()
                        .cloned()
                        .zip(record.values().into_iter().map(json_value))
                        .collect(),
                )
            })
            .collect();
        let output = JsonOutput {
            columns,
            rows,
            affected_rows: result.affected_rows(),
        };
        println!("{}", render_json(&output)?);
    } else {
        let result = query.execute(&params)?.into_query_result()?;
        if result.columns.is_empty() {
            println!("{} row(s) affected", result.affected_rows);
        } else {
            println!("{}", result.columns.join("\t"));
            for row in &result.rows {
                println!("{}", row.join("\t"));
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("splitdb: {}", e);
            ExitCode::FAILURE
        }
    }
}
