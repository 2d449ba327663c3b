//! Provider registry, configuration builder and injection engine.
//!
//! Providers are registered on a [`Registry`], which builds every registered
//! [`Configuration`] and freezes into a [`Container`]. The container resolves
//! [`Injectable`] targets by type, optional qualifier name, or property
//! expression, caching one singleton per provider key.

mod configuration;
mod container;
mod error;
mod injectable;
mod key;
mod provider;
mod registry;

pub use configuration::{Configuration, Providers};
pub use container::{Container, Injector};
pub use error::InjectError;
pub use injectable::{Injectable, InjectionPoint, Initializer, PointKind, Request, Resolvable};
pub use key::{Dependency, ProviderKey, Qualifier};
pub use provider::{Kind, MetaData, Provider};
pub use registry::{Param, Registry};
