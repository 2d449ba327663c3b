//! Configuration objects: structs whose methods declare providers.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::config::Properties;

use super::container::Injector;
use super::injectable::Injectable;
use super::provider::{MetaData, Provider};
use super::InjectError;

/// A struct built from a property section whose methods become providers.
///
/// The configuration is itself [`Injectable`]: it is registered as a ready
/// instance under [`NAME`](Self::NAME) and wired the first time one of its
/// providers runs, so its own injection points see the rest of the container.
///
/// ```
/// use serde::Deserialize;
/// use hiboot::inject::{Configuration, Injectable, Providers};
///
/// #[derive(Debug, Default, Deserialize)]
/// struct FakeProperties {
///     name: String,
/// }
///
/// struct FakeConfiguration {
///     properties: FakeProperties,
/// }
///
/// struct FooUser {
///     name: String,
/// }
/// impl Injectable for FooUser {}
/// impl Injectable for FakeConfiguration {}
///
/// impl Configuration for FakeConfiguration {
///     const NAME: &'static str = "fake";
///     type Properties = FakeProperties;
///
///     fn new(properties: FakeProperties) -> Self {
///         Self { properties }
///     }
///
///     fn providers(providers: &mut Providers<Self>) {
///         providers.provide("fooUser", |cfg, _| {
///             Ok(FooUser { name: cfg.properties.name.clone() })
///         });
///     }
/// }
/// ```
pub trait Configuration: Injectable {
    /// Name the configuration itself is registered under.
    const NAME: &'static str;
    /// Property section deserialized into [`Configuration::Properties`].
    const PREFIX: &'static str = Self::NAME;

    type Properties: DeserializeOwned;

    fn new(properties: Self::Properties) -> Self;

    fn providers(providers: &mut Providers<Self>);
}

/// Collects the providers a [`Configuration`] declares.
pub struct Providers<C> {
    entries: Vec<MetaData>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Configuration> Providers<C> {
    /// Builds a constructor provider named `method` that runs against the
    /// wired configuration instance. Use this when the provider needs extra
    /// bindings before [`add`](Self::add).
    pub fn method<T, F>(&self, method: &str, body: F) -> Provider<T>
    where
        T: Injectable,
        F: Fn(&C, &mut Injector<'_>) -> Result<T, InjectError> + Send + Sync + 'static,
    {
        Provider::constructor(move |injector: &mut Injector<'_>| {
            let configuration = injector.get_named::<C>(C::NAME)?;
            body(&configuration, injector)
        })
        .named(method)
    }

    pub fn add<T: ?Sized + Send + Sync + 'static>(&mut self, provider: Provider<T>) -> &mut Self {
        self.entries.push(provider.into());
        self
    }

    /// Shorthand for `add(method(..))`.
    pub fn provide<T, F>(&mut self, method: &str, body: F) -> &mut Self
    where
        T: Injectable,
        F: Fn(&C, &mut Injector<'_>) -> Result<T, InjectError> + Send + Sync + 'static,
    {
        let provider = self.method(method, body);
        self.add(provider)
    }
}

/// Deferred build of one registered configuration.
pub(crate) struct ConfigurationEntry {
    pub(crate) name: &'static str,
    build: fn(&Properties) -> Result<Vec<MetaData>, InjectError>,
}

impl ConfigurationEntry {
    pub(crate) fn of<C: Configuration>() -> Self {
        Self {
            name: C::NAME,
            build: build_configuration::<C>,
        }
    }

    pub(crate) fn build(&self, properties: &Properties) -> Result<Vec<MetaData>, InjectError> {
        (self.build)(properties)
    }
}

impl std::fmt::Debug for ConfigurationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConfigurationEntry").field(&self.name).finish()
    }
}

/// Populates the configuration from its property section, then collects its
/// providers. The configuration instance is provided under its own name.
fn build_configuration<C: Configuration>(properties: &Properties) -> Result<Vec<MetaData>, InjectError> {
    let section: C::Properties = properties.section(C::PREFIX)?;

    let mut providers = Providers::<C> {
        entries: Vec::new(),
        _marker: PhantomData,
    };
    C::providers(&mut providers);

    let mut entries = Vec::with_capacity(providers.entries.len() + 1);
    entries.push(Provider::instance(C::new(section)).named(C::NAME).into());
    entries.append(&mut providers.entries);

    tracing::debug!(
        configuration = C::NAME,
        providers = entries.len() - 1,
        "built configuration"
    );
    Ok(entries)
}
