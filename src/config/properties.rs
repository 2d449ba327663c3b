//! The merged, unresolved property tree.

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use super::convert::FromProperty;
use super::resolve::{lookup_path, Resolver};
use super::ConfigError;

/// Flattened view over layered configuration.
///
/// Values are kept raw; placeholders are expanded on access so that a
/// property referencing a missing key only fails when it is requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    root: Table,
}

impl Properties {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_table(root: Table) -> Self {
        Self { root }
    }

    /// Parses properties from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_table(toml::from_str(contents)?))
    }

    /// Returns the raw value at a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup_path(&self.root, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn table(&self) -> &Table {
        &self.root
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.root)
    }

    /// Expands every placeholder in `raw`.
    pub fn resolve(&self, raw: &str) -> Result<String, ConfigError> {
        self.resolver().resolve_str(raw)
    }

    /// Resolves `expr` and converts the result to `T`.
    ///
    /// ```
    /// use hiboot::config::Properties;
    ///
    /// let props = Properties::parse("[app]\nname = \"hiboot\"\nport = 8080").unwrap();
    /// let port: u16 = props.value("${app.port}").unwrap();
    /// let url: String = props.value("http://${app.name}:${app.port}").unwrap();
    /// assert_eq!(port, 8080);
    /// assert_eq!(url, "http://hiboot:8080");
    /// ```
    pub fn value<T: FromProperty>(&self, expr: &str) -> Result<T, ConfigError> {
        let resolved = self.resolver().resolve_expr(expr)?;
        T::from_property(&resolved, expr)
    }

    /// Resolves the subtree at `prefix` and deserializes it into `T`.
    ///
    /// A missing subtree deserializes from an empty table, so `T` can lean
    /// on serde defaults.
    pub fn section<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, ConfigError> {
        let resolved = match self.get(prefix) {
            Some(value) => self.resolver().resolve_value(value)?,
            None => Value::Table(Table::new()),
        };
        resolved.try_into().map_err(ConfigError::DeserializeError)
    }

    /// Resolves the whole tree and deserializes it into `T`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let resolved = self.resolver().resolve_value(&Value::Table(self.root.clone()))?;
        resolved.try_into().map_err(ConfigError::DeserializeError)
    }
}
