//! Application context: properties, typed configuration and the frozen container.

use std::sync::Arc;

use crate::config::Properties;
use crate::inject::{Configuration, Container, Injectable, Param, Provider, Registry};
use crate::Error;

/// Central application context holding configuration and the provider container.
///
/// Generic over an optional typed configuration `C`, supplied once at build time.
/// Components are resolved through [`container()`](Self::container) or the
/// shorthands on the context itself.
///
/// ## Example
///
/// ```no_run
/// use hiboot::{AppContext, Config, Provider};
/// use hiboot::inject::Injectable;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct MyConfig {
///     app: AppSection,
/// }
///
/// #[derive(Deserialize)]
/// struct AppSection {
///     name: String,
/// }
///
/// struct Greeter;
/// impl Injectable for Greeter {}
///
/// let properties = Config::builder()
///     .with_file("config.toml", true)
///     .build_properties()?;
///
/// let ctx = AppContext::builder()
///     .with_config(properties.bind::<MyConfig>()?)
///     .with_properties(properties)
///     .component(Provider::constructor(|_| Ok(Greeter)))
///     .build()?;
///
/// let name = &ctx.config().app.name;
/// let greeter = ctx.get::<Greeter>()?;
/// # Ok::<(), hiboot::Error>(())
/// ```
#[derive(Debug)]
pub struct AppContext<C = ()> {
    config: C,
    container: Container,
}

impl<C> AppContext<C> {
    /// Returns a reference to the typed configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn properties(&self) -> &Properties {
        self.container.properties()
    }

    /// Wires the injection points and initializer of `target`.
    pub fn into_object<T: Injectable>(&self, target: &mut T) -> Result<(), Error> {
        Ok(self.container.into_object(target)?)
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        Ok(self.container.get::<T>()?)
    }

    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, Error> {
        Ok(self.container.get_named::<T>(name)?)
    }
}

impl AppContext<()> {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder<()> {
        AppContextBuilder {
            config: (),
            properties: Properties::empty(),
            registry: Registry::new(),
        }
    }
}

/// Builder for constructing an [`AppContext`].
///
/// The builder starts with no typed config (`AppContextBuilder<()>`) and
/// transitions to `AppContextBuilder<C>` when [`with_config`](Self::with_config)
/// is called. Registration is only possible here; [`build`](Self::build)
/// freezes the registry.
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder<C> {
    config: C,
    properties: Properties,
    registry: Registry,
}

impl AppContextBuilder<()> {
    /// Attaches a typed configuration to the application context.
    ///
    /// Usually the result of [`Config::build`](crate::Config::build) or
    /// [`Properties::bind`].
    pub fn with_config<C>(self, config: C) -> AppContextBuilder<C> {
        AppContextBuilder {
            config,
            properties: self.properties,
            registry: self.registry,
        }
    }
}

impl<C> AppContextBuilder<C> {
    /// Sets the property tree used for placeholders, values and configurations.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn component<T: ?Sized + Send + Sync + 'static>(mut self, provider: Provider<T>) -> Self {
        self.registry.component(provider);
        self
    }

    pub fn named_component<T: ?Sized + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        provider: Provider<T>,
    ) -> Result<Self, Error> {
        self.registry.named_component(name, provider)?;
        Ok(self)
    }

    /// See [`Registry::register`].
    pub fn register<I>(mut self, params: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Param>,
    {
        self.registry.register(params)?;
        Ok(self)
    }

    pub fn auto_configuration<T: Configuration>(mut self) -> Self {
        self.registry.auto_configuration::<T>();
        self
    }

    /// Builds every registered configuration and freezes the container.
    pub fn build(self) -> Result<AppContext<C>, Error> {
        Ok(AppContext {
            config: self.config,
            container: self.registry.build(self.properties)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::{InjectError, Providers};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct AppSection {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct AppConfig {
        app: AppSection,
    }

    struct Greeter {
        greeting: String,
    }

    impl Injectable for Greeter {}

    #[derive(Debug, Deserialize)]
    struct GreetingProperties {
        greeting: String,
    }

    struct GreetingConfiguration {
        properties: GreetingProperties,
    }

    impl Injectable for GreetingConfiguration {}

    impl Configuration for GreetingConfiguration {
        const NAME: &'static str = "greeting";
        type Properties = GreetingProperties;

        fn new(properties: GreetingProperties) -> Self {
            Self { properties }
        }

        fn providers(providers: &mut Providers<Self>) {
            providers.provide("greeter", |cfg, _| {
                Ok(Greeter {
                    greeting: cfg.properties.greeting.clone(),
                })
            });
        }
    }

    fn properties() -> Properties {
        Properties::parse(
            r#"
            [app]
            name = "hiboot"

            [greeting]
            greeting = "hello ${app.name}"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_without_config() {
        let ctx = AppContext::builder()
            .component(Provider::instance(Greeter { greeting: "hi".into() }))
            .build()
            .unwrap();

        assert_eq!(ctx.config(), &());
        assert_eq!(ctx.get::<Greeter>().unwrap().greeting, "hi");
    }

    #[test]
    fn test_build_with_config_and_configuration() {
        let properties = properties();
        let ctx = AppContext::builder()
            .with_config(properties.bind::<AppConfig>().unwrap())
            .with_properties(properties)
            .auto_configuration::<GreetingConfiguration>()
            .build()
            .unwrap();

        assert_eq!(ctx.config().app.name, "hiboot");
        assert_eq!(ctx.get_named::<Greeter>("greeter").unwrap().greeting, "hello hiboot");
        assert!(ctx.get_named::<GreetingConfiguration>("greeting").is_ok());
    }

    #[test]
    fn test_duplicate_registration_fails_build() {
        let result = AppContext::builder()
            .component(Provider::instance(Greeter { greeting: "a".into() }))
            .component(Provider::instance(Greeter { greeting: "b".into() }))
            .build();

        assert!(matches!(
            result,
            Err(Error::Inject(InjectError::AmbiguousProvider { .. }))
        ));
    }

    #[test]
    fn test_invalid_register_call() {
        let result = AppContext::builder().register(Vec::new());
        assert!(matches!(
            result,
            Err(Error::Inject(InjectError::InvalidObjectType(_)))
        ));
    }
}
