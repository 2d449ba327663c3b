//! Providers: registered instances and constructors.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use super::container::Injector;
use super::injectable::Injectable;
use super::key::Qualifier;
use super::InjectError;

/// Type-erased singleton. Always holds an `Arc<T>` for the provider's `T`.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

type Cast = Arc<dyn Fn(&Erased) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;
type Construct =
    Box<dyn Fn(&mut Injector<'_>, &Qualifier) -> Result<Erased, InjectError> + Send + Sync>;

fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Erased {
    Arc::new(value)
}

/// A type a provider can be injected as: its own type or a bound interface.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    cast: Cast,
}

impl Binding {
    fn identity<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            cast: Arc::new(|erased: &Erased| {
                erased
                    .downcast_ref::<Arc<T>>()
                    .map(|value| Box::new(Arc::clone(value)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// Casts an erased singleton to `Arc<I>` for the type this binding targets.
    pub(crate) fn cast<I: ?Sized + 'static>(&self, erased: &Erased) -> Option<Arc<I>> {
        (self.cast)(erased)
            .and_then(|boxed| boxed.downcast::<Arc<I>>().ok())
            .map(|value| *value)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

enum Activation {
    /// Ready and already wired.
    Shared(Erased),
    /// Ready instance, wired on first use.
    Instance(Mutex<Option<InstanceSlot>>),
    Constructor(Construct),
}

enum InstanceSlot {
    Unwired(Box<dyn UnwiredInstance>),
    Wired(Erased),
}

/// A registered value whose injection points have not been applied yet.
trait UnwiredInstance: Send {
    fn wire(&mut self, injector: &mut Injector<'_>) -> Result<(), InjectError>;

    fn seal(self: Box<Self>) -> Erased;
}

struct Unwired<T>(T);

impl<T: Injectable> UnwiredInstance for Unwired<T> {
    fn wire(&mut self, injector: &mut Injector<'_>) -> Result<(), InjectError> {
        injector.wire(&mut self.0)
    }

    fn seal(self: Box<Self>) -> Erased {
        erase(Arc::new(self.0))
    }
}

/// How a provider produces its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Instance,
    Constructor,
}

/// Typed provider declaration, erased into [`MetaData`] on registration.
///
/// ```
/// use std::sync::Arc;
/// use hiboot::inject::{Injectable, Provider};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Injectable for English {}
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// let provider = Provider::constructor(|_| Ok(English))
///     .named("english")
///     .bind::<dyn Greeter, _>(|english| english as Arc<dyn Greeter>);
/// ```
#[must_use = "providers do nothing until registered"]
pub struct Provider<T: ?Sized> {
    name: Option<String>,
    activation: Activation,
    bindings: Vec<Binding>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: Injectable> Provider<T> {
    /// A ready instance. Its injection points are wired the first time it is
    /// requested; if wiring fails the value stays unwired and the next
    /// request retries.
    pub fn instance(value: T) -> Self {
        Self::with_activation(Activation::Instance(Mutex::new(Some(InstanceSlot::Unwired(
            Box::new(Unwired(value)),
        )))))
    }

    /// A constructor whose parameters are resolved through the injector.
    pub fn constructor<F>(constructor: F) -> Self
    where
        F: Fn(&mut Injector<'_>) -> Result<T, InjectError> + Send + Sync + 'static,
    {
        Self::factory(move |injector, _| constructor(injector))
    }

    /// A constructor that also receives the resolved qualifier of the request.
    ///
    /// Requested under a name the provider does not carry, a factory yields
    /// one instance per name, built with that request's qualifier.
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&mut Injector<'_>, &Qualifier) -> Result<T, InjectError> + Send + Sync + 'static,
    {
        Self::with_activation(Activation::Constructor(Box::new(
            move |injector: &mut Injector<'_>, qualifier: &Qualifier| {
                let mut value = factory(injector, qualifier)?;
                injector.wire(&mut value)?;
                Ok(erase(Arc::new(value)))
            },
        )))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> {
    /// A ready, already wired value of any type, including trait objects.
    pub fn shared(value: Arc<T>) -> Self {
        Self::with_activation(Activation::Shared(erase(value)))
    }

    fn with_activation(activation: Activation) -> Self {
        Self {
            name: None,
            activation,
            bindings: vec![Binding::identity::<T>()],
            _marker: PhantomData,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the provider injectable as `I`, typically a `dyn Trait`.
    pub fn bind<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.bindings.push(Binding {
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            cast: Arc::new(move |erased: &Erased| {
                erased
                    .downcast_ref::<Arc<T>>()
                    .map(|value| Box::new(cast(Arc::clone(value))) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }
}

/// A registered provider: instance or constructor, optionally named.
pub struct MetaData {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) name: Option<String>,
    activation: Activation,
    pub(crate) bindings: Vec<Binding>,
}

impl MetaData {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> Kind {
        match self.activation {
            Activation::Shared(_) | Activation::Instance(_) => Kind::Instance,
            Activation::Constructor(_) => Kind::Constructor,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub(crate) fn activate(
        &self,
        injector: &mut Injector<'_>,
        qualifier: &Qualifier,
    ) -> Result<Erased, InjectError> {
        match &self.activation {
            Activation::Shared(value) => Ok(Arc::clone(value)),
            Activation::Instance(slot) => {
                // Held while wiring: a pass never re-enters the same provider,
                // and concurrent passes wait for the wired value.
                let mut slot = slot.lock().map_err(|_| InjectError::LockPoisoned {
                    resource: "provider_instance",
                })?;
                let (next, result) = match slot.take() {
                    Some(InstanceSlot::Wired(erased)) => {
                        (InstanceSlot::Wired(Arc::clone(&erased)), Ok(erased))
                    }
                    Some(InstanceSlot::Unwired(mut unwired)) => match unwired.wire(injector) {
                        Ok(()) => {
                            let erased = unwired.seal();
                            (InstanceSlot::Wired(Arc::clone(&erased)), Ok(erased))
                        }
                        Err(e) => (InstanceSlot::Unwired(unwired), Err(e)),
                    },
                    // only left empty by a panic mid-wiring, which also poisons the lock
                    None => {
                        return Err(InjectError::LockPoisoned {
                            resource: "provider_instance",
                        })
                    }
                };
                *slot = Some(next);
                result
            }
            Activation::Constructor(construct) => construct(injector, qualifier),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> From<Provider<T>> for MetaData {
    fn from(provider: Provider<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: provider.name,
            activation: provider.activation,
            bindings: provider.bindings,
        }
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaData")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("bindings", &self.bindings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct User {
        name: String,
    }

    impl Injectable for User {}

    impl Named for User {
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_metadata_from_provider() {
        let meta: MetaData = Provider::instance(User { name: "foo".into() })
            .named("foo")
            .bind::<dyn Named, _>(|user| user as Arc<dyn Named>)
            .into();

        assert_eq!(meta.name(), Some("foo"));
        assert_eq!(meta.kind(), Kind::Instance);
        assert_eq!(meta.type_id, TypeId::of::<User>());
        assert_eq!(meta.bindings.len(), 2);
        assert_eq!(meta.bindings[1].type_id, TypeId::of::<dyn Named>());
    }

    #[test]
    fn test_binding_casts_erased_value() {
        let meta: MetaData = Provider::shared(Arc::new(User { name: "bar".into() }))
            .bind::<dyn Named, _>(|user| user as Arc<dyn Named>)
            .into();
        let erased = erase(Arc::new(User { name: "bar".into() }));

        let user: Arc<User> = meta.bindings[0].cast(&erased).unwrap();
        let named: Arc<dyn Named> = meta.bindings[1].cast(&erased).unwrap();
        assert_eq!(user.name, "bar");
        assert_eq!(named.name(), "bar");
        assert!(meta.bindings[0].cast::<String>(&erased).is_none());
    }

    #[test]
    fn test_constructor_kind() {
        let meta: MetaData = Provider::constructor(|_| Ok(User { name: "x".into() })).into();
        assert_eq!(meta.kind(), Kind::Constructor);
        assert_eq!(meta.name(), None);
    }
}
