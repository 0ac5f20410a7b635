//! Driver dispatch.
//!
//! A [`ConnectionFactory`] reads the driver name configured for a connection,
//! looks it up in a [`DriverRegistry`] and delegates to the registered
//! [`Driver`]. New drivers are added by registration; the dispatcher never
//! changes.

pub mod sqlite;

pub use sqlite::{SqliteConnectionFactory, SqliteDriver};

use crate::config::OptionSet;
use crate::core::db::Connection;
use crate::core::{DbError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Prefix of the namespaced registry identifier of a driver.
pub const DRIVER_NAMESPACE: &str = "sql::";
/// Suffix of the namespaced registry identifier of a driver.
pub const DRIVER_SUFFIX: &str = "::connection_factory";

/// A driver family able to build connections from configuration.
pub trait Driver {
    fn connect_using_config(
        &self,
        config: &dyn OptionSet,
        group: &str,
        connection_name: &str,
    ) -> Result<Connection>;
}

/// Constructor stored in a [`DriverRegistry`].
pub type DriverConstructor = Arc<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

/// Registry identifier under which `driver` is registered by [`DriverRegistry::register`].
pub fn namespaced_identifier(driver: &str) -> String {
    format!("{}{}{}", DRIVER_NAMESPACE, driver, DRIVER_SUFFIX)
}

/// Maps registry identifiers to driver constructors.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    constructors: HashMap<String, DriverConstructor>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the drivers shipped with this crate.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        registry.register("Sqlite", || Box::new(SqliteDriver));
        registry
    }

    /// Registers a driver under its namespaced identifier.
    pub fn register<F>(&mut self, driver: &str, constructor: F)
    where
        F: Fn() -> Box<dyn Driver> + Send + Sync + 'static,
    {
        self.register_custom(&namespaced_identifier(driver), constructor);
    }

    /// Registers a driver under `identifier` verbatim.
    pub fn register_custom<F>(&mut self, identifier: &str, constructor: F)
    where
        F: Fn() -> Box<dyn Driver> + Send + Sync + 'static,
    {
        debug!(identifier, "registering driver");
        self.constructors
            .insert(identifier.to_string(), Arc::new(constructor));
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors.contains_key(identifier)
    }

    /// Registered driver identifiers, sorted.
    pub fn driver_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn instantiate(&self, identifier: &str) -> Option<Box<dyn Driver>> {
        self.constructors
            .get(identifier)
            .map(|constructor| constructor())
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.driver_names())
            .finish()
    }
}

/// Builds connections by dispatching on the configured driver name.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    registry: DriverRegistry,
}

impl ConnectionFactory {
    pub fn new(registry: DriverRegistry) -> Self {
        ConnectionFactory { registry }
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Connects `connection_name` from `group` using its `{name}.driver` option.
    pub fn connect_using_config(
        &self,
        config: &dyn OptionSet,
        group: &str,
        connection_name: &str,
    ) -> Result<Connection> {
        let driver = config.get(group, &format!("{}.driver", connection_name))?;

        for candidate in driver_candidates(&driver) {
            if let Some(factory) = self.registry.instantiate(&candidate) {
                debug!(connection_name, %driver, %candidate, "dispatching to driver");
                return factory.connect_using_config(config, group, connection_name);
            }
        }

        Err(DbError::UnknownDriver(driver))
    }
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        ConnectionFactory::new(DriverRegistry::with_builtin_drivers())
    }
}

/// Registry identifiers tried for `driver`, in order.
fn driver_candidates(driver: &str) -> [String; 2] {
    [namespaced_identifier(driver), driver.to_string()]
}
