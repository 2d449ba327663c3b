//! Dependency injection and auto-configuration core.
//!
//! Properties are layered from defaults, TOML files and the environment
//! ([`config`]); components and configurations are registered and resolved
//! by type and qualifier name ([`inject`]); [`AppContext`] ties both together.

pub mod config;
pub mod context;
mod error;
pub mod inject;

pub use config::{Config, ConfigError, Properties};
pub use context::{AppContext, AppContextBuilder};
pub use error::Error;
pub use inject::{Configuration, Container, Dependency, InjectError, Injectable, InjectionPoint, Provider};
