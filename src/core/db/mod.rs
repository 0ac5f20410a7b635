/// Database Module
///
/// This module provides the connection layer of splitdb, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Credentials** (`credential.rs`): Connection parameters and the credential factory seam
/// - **Quoting** (`quoter.rs`): SQL literal rendering used by emulated statements
/// - **Connection** (`connection.rs`): Write/read credential pair with lazily opened native handles
/// - **Query Execution** (`query.rs`): Native, emulated and unprepared execution strategies
/// - **Emulation** (`emulate.rs`): Client-side statement templates
/// - **Results** (`result_set.rs`): Cursor wrapper and display formatting
///
/// ## Error Handling
///
/// All database operations use the standardized `DbError` type for consistent error propagation.
pub mod connection;
pub mod credential;
pub mod emulate;
pub mod query;
pub mod quoter;
pub mod result_set;

pub use connection::*;
pub use credential::*;
pub use emulate::*;
pub use query::*;
pub use quoter::*;
pub use result_set::*;
