//! Layered property loading and placeholder resolution.

mod builder;
mod convert;
mod defaults;
mod env;
mod error;
mod file;
mod properties;
mod resolve;
mod source;

pub use builder::{Config, ACTIVE_PROFILE_ENV};
pub use convert::FromProperty;
pub use defaults::DefaultsSource;
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use properties::Properties;
pub use resolve::{resolve_references, Resolver, MAX_PLACEHOLDER_DEPTH};
pub use source::{ConfigEntry, ConfigSource};
