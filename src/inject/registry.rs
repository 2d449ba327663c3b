use crate::config::Properties;

use super::configuration::{Configuration, ConfigurationEntry};
use super::container::Container;
use super::provider::{MetaData, Provider};
use super::InjectError;

/// One argument of [`Registry::register`].
#[derive(Debug)]
pub enum Param {
    Name(String),
    Provider(MetaData),
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::Name(name.to_string())
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::Name(name)
    }
}

impl From<MetaData> for Param {
    fn from(meta: MetaData) -> Self {
        Param::Provider(meta)
    }
}

impl<T: ?Sized + Send + Sync + 'static> From<Provider<T>> for Param {
    fn from(provider: Provider<T>) -> Self {
        Param::Provider(provider.into())
    }
}

/// Ordered collections of components and configurations awaiting build.
#[derive(Debug, Default)]
pub struct Registry {
    components: Vec<MetaData>,
    configurations: Vec<ConfigurationEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers components from a heterogeneous argument list.
    ///
    /// Accepted shapes are `[provider]`, `[name, provider]` and
    /// `[provider, provider, ...]`. Anything else is rejected and nothing
    /// is registered.
    ///
    /// ```
    /// use hiboot::inject::{Injectable, Param, Provider, Registry};
    ///
    /// struct User;
    /// impl Injectable for User {}
    ///
    /// let mut registry = Registry::new();
    /// registry
    ///     .register([Param::from("admin"), Provider::instance(User).into()])
    ///     .unwrap();
    /// assert!(registry.register(Vec::<Param>::new()).is_err());
    /// ```
    pub fn register<I>(&mut self, params: I) -> Result<&mut Self, InjectError>
    where
        I: IntoIterator<Item = Param>,
    {
        let params: Vec<Param> = params.into_iter().collect();

        if params.is_empty() {
            return Err(InjectError::InvalidObjectType(
                "nothing to register".to_string(),
            ));
        }

        if let Some(Param::Name(_)) = params.first() {
            let mut params = params.into_iter();
            return match (params.next(), params.next(), params.next()) {
                (Some(Param::Name(name)), Some(Param::Provider(meta)), None) => {
                    self.push_named(name, meta)
                }
                _ => Err(InjectError::InvalidObjectType(
                    "a name must be followed by exactly one object".to_string(),
                )),
            };
        }

        let mut components = Vec::with_capacity(params.len());
        for param in params {
            match param {
                Param::Provider(meta) => components.push(meta),
                Param::Name(name) => {
                    return Err(InjectError::InvalidObjectType(format!(
                        "unexpected name `{name}` after the first argument"
                    )))
                }
            }
        }
        self.components.extend(components);
        Ok(self)
    }

    pub fn component<T: ?Sized + Send + Sync + 'static>(&mut self, provider: Provider<T>) -> &mut Self {
        self.components.push(provider.into());
        self
    }

    pub fn named_component<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        provider: Provider<T>,
    ) -> Result<&mut Self, InjectError> {
        self.push_named(name.into(), provider.into())
    }

    /// Registers a configuration; it is built in registration order by [`build`](Self::build).
    pub fn auto_configuration<C: Configuration>(&mut self) -> &mut Self {
        self.configurations.push(ConfigurationEntry::of::<C>());
        self
    }

    pub fn components(&self) -> impl Iterator<Item = &MetaData> {
        self.components.iter()
    }

    pub fn configurations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.configurations.iter().map(|entry| entry.name)
    }

    /// Builds every configuration and freezes the result into a [`Container`].
    ///
    /// Configuration providers follow the registered components. The first
    /// failing configuration aborts the build.
    pub fn build(self, properties: Properties) -> Result<Container, InjectError> {
        let mut providers = self.components;
        for configuration in &self.configurations {
            providers.extend(configuration.build(&properties)?);
        }
        Container::new(properties, providers)
    }

    fn push_named(&mut self, name: String, mut meta: MetaData) -> Result<&mut Self, InjectError> {
        if name.is_empty() {
            return Err(InjectError::InvalidObjectType(
                "component name must not be empty".to_string(),
            ));
        }
        meta.set_name(name);
        self.components.push(meta);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::Injectable;

    struct User;

    impl Injectable for User {}

    struct Repository;

    impl Injectable for Repository {}

    #[test]
    fn test_register_single_object() {
        let mut registry = Registry::new();
        registry.register([Param::from(Provider::instance(User))]).unwrap();
        assert_eq!(registry.components().count(), 1);
        assert_eq!(registry.components().next().unwrap().name(), None);
    }

    #[test]
    fn test_register_named_object() {
        let mut registry = Registry::new();
        registry
            .register([Param::from("admin"), Param::from(Provider::instance(User))])
            .unwrap();
        assert_eq!(registry.components().next().unwrap().name(), Some("admin"));
    }

    #[test]
    fn test_register_many_preserves_order() {
        let mut registry = Registry::new();
        registry
            .register([
                Param::from(Provider::instance(User)),
                Param::from(Provider::constructor(|_| Ok(Repository))),
            ])
            .unwrap();
        let names: Vec<_> = registry.components().map(MetaData::type_name).collect();
        assert!(names[0].ends_with("User"));
        assert!(names[1].ends_with("Repository"));
    }

    #[test]
    fn test_register_rejects_malformed_input() {
        fn invalid(result: Result<&mut Registry, InjectError>) -> bool {
            matches!(result, Err(InjectError::InvalidObjectType(_)))
        }

        let mut registry = Registry::new();

        assert!(invalid(registry.register(Vec::new())));
        assert!(invalid(registry.register([Param::from("admin")])));
        assert!(invalid(registry.register([
            Param::from("admin"),
            Param::from(Provider::instance(User)),
            Param::from(Provider::instance(Repository)),
        ])));
        assert!(invalid(registry.register([
            Param::from(Provider::instance(User)),
            Param::from("late"),
        ])));
        assert!(invalid(registry.register([Param::from(""), Param::from(Provider::instance(User))])));
        assert_eq!(registry.components().count(), 0);
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let mut registry = Registry::new();
        registry.component(Provider::instance(User));
        registry.component(Provider::instance(User));
        assert!(matches!(
            registry.build(Properties::empty()),
            Err(InjectError::AmbiguousProvider { .. })
        ));
    }
}
