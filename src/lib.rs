// Core infrastructure modules
pub mod core;

// Configuration and driver dispatch
pub mod config;
pub mod drivers;

#[cfg(test)]
mod test_utils;

pub use crate::config::{MemoryOptionSet, OptionSet, TomlOptionSet};
pub use crate::core::db::{
    Connection, Credential, FetchMode, PrepareMode, Query, Record, ResultSet, Role,
};
pub use crate::core::{DbError, Result};
pub use crate::drivers::{ConnectionFactory, Driver, DriverRegistry};
