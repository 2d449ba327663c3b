use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::config::{FromProperty, Properties};

use super::injectable::{Injectable, Request, Resolvable};
use super::key::{Dependency, ProviderKey, Qualifier};
use super::provider::{Erased, Kind, MetaData};
use super::InjectError;

/// Frozen provider registry plus the singleton cache.
///
/// Built once by [`Registry::build`](super::Registry::build); afterwards no
/// providers can be added. Resolution only takes `&self`, so a container can
/// be shared across threads. The cache lock is held for lookup and insert,
/// never while a provider runs.
pub struct Container {
    properties: Properties,
    providers: Vec<MetaData>,
    /// Injectable type -> (provider index, binding index), in registration order.
    index: HashMap<TypeId, Vec<(usize, usize)>>,
    singletons: RwLock<HashMap<ProviderKey, Erased>>,
}

impl Container {
    pub(crate) fn new(properties: Properties, providers: Vec<MetaData>) -> Result<Self, InjectError> {
        validate(&providers)?;

        let mut index: HashMap<TypeId, Vec<(usize, usize)>> = HashMap::new();
        for (p, provider) in providers.iter().enumerate() {
            for (b, binding) in provider.bindings.iter().enumerate() {
                index.entry(binding.type_id).or_default().push((p, b));
            }
        }

        tracing::debug!(providers = providers.len(), "container built");
        Ok(Self {
            properties,
            providers,
            index,
            singletons: RwLock::new(HashMap::new()),
        })
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn providers(&self) -> impl Iterator<Item = &MetaData> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Starts a resolution pass.
    pub fn injector(&self) -> Injector<'_> {
        Injector {
            container: self,
            resolving: Vec::new(),
        }
    }

    /// Wires every injection point of `target`, then runs its initializer.
    pub fn into_object<T: Injectable>(&self, target: &mut T) -> Result<(), InjectError> {
        self.injector().wire(target)
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        self.injector().get::<T>()
    }

    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, InjectError> {
        self.injector().get_named::<T>(name)
    }

    pub fn resolve<R: Resolvable>(&self, dependency: &Dependency) -> Result<R, InjectError> {
        self.injector().resolve::<R>(dependency)
    }

    pub fn value<V: FromProperty>(&self, expr: &str) -> Result<V, InjectError> {
        Ok(self.properties.value(expr)?)
    }

    /// Whether a singleton of provider type `T` has been built under `name`.
    pub fn is_cached<T: ?Sized + 'static>(&self, name: Option<&str>) -> bool {
        let key = ProviderKey {
            name: name.map(str::to_string),
            ..ProviderKey::of::<T>()
        };
        self.singletons
            .read()
            .map(|cache| cache.contains_key(&key))
            .unwrap_or(false)
    }

    fn cached(&self, key: &ProviderKey) -> Result<Option<Erased>, InjectError> {
        let cache = self.singletons.read().map_err(|_| InjectError::LockPoisoned {
            resource: "singletons",
        })?;
        Ok(cache.get(key).cloned())
    }

    /// Caches `value` unless another pass stored one first; returns the cached one.
    fn store(&self, key: ProviderKey, value: Erased) -> Result<Erased, InjectError> {
        let mut cache = self.singletons.write().map_err(|_| InjectError::LockPoisoned {
            resource: "singletons",
        })?;
        Ok(Arc::clone(cache.entry(key).or_insert(value)))
    }

    /// Picks the provider serving `type_id` for `qualifier`.
    ///
    /// Returns (provider, binding, cache name).
    fn select(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        qualifier: &Qualifier,
    ) -> Result<Option<(usize, usize, Option<String>)>, InjectError> {
        let candidates = self.index.get(&type_id).map(Vec::as_slice).unwrap_or(&[]);
        let with_name = |name: Option<&str>| -> Vec<(usize, usize)> {
            candidates
                .iter()
                .copied()
                .filter(|(p, _)| self.providers[*p].name() == name)
                .collect()
        };
        let ambiguous = |count: usize| InjectError::AmbiguousProvider {
            type_name: type_name.to_string(),
            name: qualifier.name().map(str::to_string),
            candidates: count,
        };
        let single = |matches: Vec<(usize, usize)>| match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            many => Err(ambiguous(many.len())),
        };

        let chosen = match qualifier.name() {
            Some(name) => match single(with_name(Some(name)))? {
                Some(exact) => Some(exact),
                None => single(with_name(None))?,
            },
            None => match single(with_name(None))? {
                Some(unnamed) => Some(unnamed),
                None => single(candidates.to_vec())?,
            },
        };

        Ok(chosen.map(|(p, b)| {
            let provider = &self.providers[p];
            let cache_name = match provider.kind() {
                Kind::Constructor => provider
                    .name
                    .clone()
                    .or_else(|| qualifier.name().map(str::to_string)),
                Kind::Instance => provider.name.clone(),
            };
            (p, b, cache_name)
        }))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

/// Rejects two providers of the same type under the same name.
fn validate(providers: &[MetaData]) -> Result<(), InjectError> {
    let mut seen: HashMap<(TypeId, Option<&str>), usize> = HashMap::new();
    for provider in providers {
        let count = seen.entry((provider.type_id, provider.name())).or_insert(0);
        *count += 1;
        if *count > 1 {
            return Err(InjectError::AmbiguousProvider {
                type_name: provider.type_name.to_string(),
                name: provider.name.clone(),
                candidates: *count,
            });
        }
    }
    Ok(())
}

/// One resolution pass over a [`Container`].
///
/// Constructors receive the injector so their own parameters resolve through
/// the same pass; providers currently under construction are tracked to
/// detect cycles.
pub struct Injector<'c> {
    container: &'c Container,
    resolving: Vec<ProviderKey>,
}

impl<'c> Injector<'c> {
    pub fn properties(&self) -> &'c Properties {
        &self.container.properties
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>, InjectError> {
        self.resolve_field::<Arc<T>>(std::any::type_name::<T>(), &Dependency::new())
    }

    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<T>, InjectError> {
        self.resolve_field::<Arc<T>>(std::any::type_name::<T>(), &Dependency::new().named(name))
    }

    pub fn resolve<R: Resolvable>(&mut self, dependency: &Dependency) -> Result<R, InjectError> {
        self.resolve_field::<R>(std::any::type_name::<R>(), dependency)
    }

    pub fn value<V: FromProperty>(&self, expr: &str) -> Result<V, InjectError> {
        self.container.value(expr)
    }

    /// Wires `target`: injection points in order, then the initializer.
    pub fn wire<T: Injectable>(&mut self, target: &mut T) -> Result<(), InjectError> {
        for point in T::injection_points() {
            tracing::trace!(target_type = std::any::type_name::<T>(), field = point.field(), "injecting");
            point.apply(target, self)?;
        }
        if let Some(initializer) = T::initializer() {
            initializer.apply(target, self)?;
        }
        Ok(())
    }

    pub(crate) fn resolve_field<R: Resolvable>(
        &mut self,
        field: &str,
        dependency: &Dependency,
    ) -> Result<R, InjectError> {
        let qualifier = dependency.resolve(self.properties())?;
        R::resolve(
            self,
            Request {
                field,
                qualifier: &qualifier,
            },
        )
    }

    /// Resolves the singleton serving `T` for `request`, building it if needed.
    pub fn lookup<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        request: Request<'_>,
    ) -> Result<Arc<T>, InjectError> {
        self.try_lookup::<T>(request)?
            .ok_or_else(|| InjectError::not_implemented::<T>(request.field))
    }

    /// Like [`lookup`](Self::lookup), but `Ok(None)` when no provider serves `T`.
    pub fn try_lookup<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        request: Request<'_>,
    ) -> Result<Option<Arc<T>>, InjectError> {
        let container = self.container;
        let type_name = std::any::type_name::<T>();
        let Some((p, b, cache_name)) = container.select(TypeId::of::<T>(), type_name, request.qualifier)? else {
            return Ok(None);
        };

        let provider = &container.providers[p];
        let key = ProviderKey {
            type_id: provider.type_id,
            type_name: provider.type_name,
            name: cache_name,
        };

        let erased = match container.cached(&key)? {
            Some(erased) => {
                tracing::trace!(provider = %key, "reusing singleton");
                erased
            }
            None => self.produce(provider, key, request.qualifier)?,
        };

        provider.bindings[b]
            .cast::<T>(&erased)
            .map(Some)
            .ok_or_else(|| InjectError::provider::<T>(format!("provider {} yielded a different type", provider.type_name)))
    }

    fn produce(
        &mut self,
        provider: &'c MetaData,
        key: ProviderKey,
        qualifier: &Qualifier,
    ) -> Result<Erased, InjectError> {
        if self.resolving.contains(&key) {
            let path = self
                .resolving
                .iter()
                .chain(std::iter::once(&key))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(InjectError::CircularDependency { path });
        }

        self.resolving.push(key.clone());
        let produced = provider.activate(self, qualifier);
        self.resolving.pop();

        let value = produced?;
        tracing::debug!(provider = %key, "constructed singleton");
        self.container.store(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::{InjectionPoint, Provider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct User {
        name: String,
    }

    impl Injectable for User {}

    trait Repository: Send + Sync {
        fn url(&self) -> &str;
    }

    struct SqlRepository {
        url: String,
    }

    impl Injectable for SqlRepository {}

    impl Repository for SqlRepository {
        fn url(&self) -> &str {
            &self.url
        }
    }

    fn container(providers: Vec<MetaData>) -> Container {
        let properties = Properties::parse(
            r#"
            [app]
            name = "hiboot"
            "#,
        )
        .unwrap();
        Container::new(properties, providers).unwrap()
    }

    #[test]
    fn test_unnamed_provider_is_a_singleton() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        let container = container(vec![Provider::constructor(|_| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(User { name: "foo".into() })
        })
        .into()]);

        let first = container.get::<User>().unwrap();
        let second = container.get::<User>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert!(container.is_cached::<User>(None));
    }

    #[test]
    fn test_unqualified_request_matches_single_named_provider() {
        let container = container(vec![Provider::instance(User { name: "foo".into() })
            .named("fooUser")
            .into()]);

        assert_eq!(container.get::<User>().unwrap().name, "foo");
        assert!(container.is_cached::<User>(Some("fooUser")));
    }

    #[test]
    fn test_named_request_prefers_exact_name() {
        let container = container(vec![
            Provider::instance(User { name: "foo".into() }).named("foo").into(),
            Provider::instance(User { name: "bar".into() }).named("bar").into(),
        ]);

        assert_eq!(container.get_named::<User>("bar").unwrap().name, "bar");
        assert!(matches!(
            container.get::<User>(),
            Err(InjectError::AmbiguousProvider { candidates: 2, .. })
        ));
        assert!(matches!(
            container.get_named::<User>("baz"),
            Err(InjectError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_factory_builds_one_instance_per_name() {
        let container = container(vec![Provider::factory(|_, qualifier: &Qualifier| {
            Ok(User {
                name: qualifier.name().unwrap_or("anonymous").to_string(),
            })
        })
        .into()]);

        let foo = container.get_named::<User>("foo").unwrap();
        let bar = container.get_named::<User>("bar").unwrap();
        let foo_again = container.get_named::<User>("foo").unwrap();
        assert_eq!(foo.name, "foo");
        assert_eq!(bar.name, "bar");
        assert!(Arc::ptr_eq(&foo, &foo_again));
        assert!(!Arc::ptr_eq(&foo, &bar));
    }

    #[test]
    fn test_placeholder_in_name() {
        let container = container(vec![Provider::factory(|_, qualifier: &Qualifier| {
            Ok(User {
                name: qualifier.name().unwrap_or_default().to_string(),
            })
        })
        .into()]);

        let user: Arc<User> = container
            .resolve(&Dependency::new().named("${app.name}"))
            .unwrap();
        assert_eq!(user.name, "hiboot");
        assert!(container.is_cached::<User>(Some("hiboot")));
    }

    #[test]
    fn test_interface_binding() {
        let container = container(vec![Provider::instance(SqlRepository {
            url: "postgres://localhost".into(),
        })
        .bind::<dyn Repository, _>(|repo| repo as Arc<dyn Repository>)
        .into()]);

        let repo = container.get::<dyn Repository>().unwrap();
        let concrete = container.get::<SqlRepository>().unwrap();
        assert_eq!(repo.url(), "postgres://localhost");
        assert_eq!(concrete.url, "postgres://localhost");
    }

    #[test]
    fn test_missing_interface_is_not_implemented() {
        let container = container(Vec::new());
        let err = container.get::<dyn Repository>().err().unwrap();
        assert!(err.to_string().contains("Repository is not implemented"));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let result = Container::new(
            Properties::empty(),
            vec![
                Provider::instance(User { name: "a".into() }).into(),
                Provider::instance(User { name: "b".into() }).into(),
            ],
        );
        assert!(matches!(result, Err(InjectError::AmbiguousProvider { .. })));
    }

    struct Chicken {
        _egg: Option<Arc<Egg>>,
    }

    struct Egg {
        _chicken: Option<Arc<Chicken>>,
    }

    impl Injectable for Chicken {
        fn injection_points() -> Vec<InjectionPoint<Self>> {
            vec![InjectionPoint::inject("egg", Dependency::new(), |c: &mut Self, egg| c._egg = Some(egg))]
        }
    }

    impl Injectable for Egg {
        fn injection_points() -> Vec<InjectionPoint<Self>> {
            vec![InjectionPoint::inject("chicken", Dependency::new(), |e: &mut Self, chicken| {
                e._chicken = Some(chicken)
            })]
        }
    }

    #[test]
    fn test_cycle_is_reported() {
        let container = container(vec![
            Provider::constructor(|_| Ok(Chicken { _egg: None })).into(),
            Provider::constructor(|_| Ok(Egg { _chicken: None })).into(),
        ]);

        let err = container.get::<Chicken>().err().unwrap();
        match err {
            InjectError::CircularDependency { path } => {
                assert!(path.contains("Chicken"));
                assert!(path.contains("Egg"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!container.is_cached::<Chicken>(None));
    }
}
