/// Core Module for splitdb
///
/// This module contains the connection, query and error infrastructure shared
/// by the drivers and the command-line client.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbError, Result};
