//! Injection targets and the values that can be resolved into them.

use std::fmt;
use std::sync::Arc;

use crate::config::FromProperty;

use super::container::Injector;
use super::key::{Dependency, Qualifier};
use super::InjectError;

/// A type whose fields and initializer are wired by the container.
///
/// Injection points are applied in the order returned, then the initializer
/// runs once. The first failure stops wiring; points applied before it stay
/// applied.
///
/// ```
/// use std::sync::Arc;
/// use hiboot::inject::{Dependency, Injectable, InjectionPoint};
///
/// struct User {
///     name: String,
/// }
/// impl Injectable for User {}
///
/// #[derive(Default)]
/// struct UserService {
///     user: Option<Arc<User>>,
///     url: String,
/// }
///
/// impl Injectable for UserService {
///     fn injection_points() -> Vec<InjectionPoint<Self>> {
///         vec![
///             InjectionPoint::inject("user", Dependency::new(), |s: &mut Self, user| s.user = Some(user)),
///             InjectionPoint::value("url", "${fake.url:http://localhost:8080}", |s: &mut Self, url| s.url = url),
///         ]
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    fn injection_points() -> Vec<InjectionPoint<Self>> {
        Vec::new()
    }

    fn initializer() -> Option<Initializer<Self>> {
        None
    }
}

type Apply<T> = Box<dyn Fn(&mut T, &mut Injector<'_>) -> Result<(), InjectError>>;

/// What an injection point resolves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointKind {
    /// A provider, looked up by type and qualifier.
    Inject(Dependency),
    /// A property expression such as `${fake.url:http://localhost}`.
    Value(String),
}

/// One wired field of an [`Injectable`].
pub struct InjectionPoint<T> {
    field: &'static str,
    kind: PointKind,
    apply: Apply<T>,
}

impl<T: 'static> InjectionPoint<T> {
    /// Resolves `R` from the container and hands it to `set`.
    pub fn inject<R, F>(field: &'static str, dependency: Dependency, set: F) -> Self
    where
        R: Resolvable,
        F: Fn(&mut T, R) + 'static,
    {
        let lookup = dependency.clone();
        Self {
            field,
            kind: PointKind::Inject(dependency),
            apply: Box::new(move |target: &mut T, injector: &mut Injector<'_>| {
                let value = injector.resolve_field::<R>(field, &lookup)?;
                set(target, value);
                Ok(())
            }),
        }
    }

    /// Resolves a property expression, converts it to `V` and hands it to `set`.
    pub fn value<V, F>(field: &'static str, expr: impl Into<String>, set: F) -> Self
    where
        V: FromProperty,
        F: Fn(&mut T, V) + 'static,
    {
        let expr = expr.into();
        let lookup = expr.clone();
        Self {
            field,
            kind: PointKind::Value(expr),
            apply: Box::new(move |target: &mut T, injector: &mut Injector<'_>| {
                let value = injector.value::<V>(&lookup)?;
                set(target, value);
                Ok(())
            }),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn kind(&self) -> &PointKind {
        &self.kind
    }

    pub(crate) fn apply(&self, target: &mut T, injector: &mut Injector<'_>) -> Result<(), InjectError> {
        (self.apply)(target, injector)
    }
}

impl<T> fmt::Debug for InjectionPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("field", &self.field)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Constructor-style injection: resolves every parameter by type and
/// invokes the initializer once, after all injection points. Tuple
/// parameters are reported as `init#0`, `init#1`, ... in errors.
pub struct Initializer<T> {
    apply: Apply<T>,
}

impl<T: 'static> Initializer<T> {
    /// `A` is a single [`Resolvable`] or a tuple of them.
    pub fn new<A, F>(init: F) -> Self
    where
        A: Resolvable,
        F: Fn(&mut T, A) + 'static,
    {
        let unqualified = Dependency::new();
        Self {
            apply: Box::new(move |target: &mut T, injector: &mut Injector<'_>| {
                let args = injector.resolve_field::<A>("init", &unqualified)?;
                init(target, args);
                Ok(())
            }),
        }
    }

    pub(crate) fn apply(&self, target: &mut T, injector: &mut Injector<'_>) -> Result<(), InjectError> {
        (self.apply)(target, injector)
    }
}

/// A resolution request: the requesting field and its resolved qualifier.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub field: &'a str,
    pub qualifier: &'a Qualifier,
}

/// A value the container can produce for an injection point.
pub trait Resolvable: Sized {
    fn resolve(injector: &mut Injector<'_>, request: Request<'_>) -> Result<Self, InjectError>;

    /// `Ok(None)` when no provider serves the requested type at all. Failures
    /// raised while building a provider that does exist are returned as errors.
    fn resolve_provided(
        injector: &mut Injector<'_>,
        request: Request<'_>,
    ) -> Result<Option<Self>, InjectError> {
        Self::resolve(injector, request).map(Some)
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resolvable for Arc<T> {
    fn resolve(injector: &mut Injector<'_>, request: Request<'_>) -> Result<Self, InjectError> {
        injector.lookup::<T>(request)
    }

    fn resolve_provided(
        injector: &mut Injector<'_>,
        request: Request<'_>,
    ) -> Result<Option<Self>, InjectError> {
        injector.try_lookup::<T>(request)
    }
}

/// Optional dependency: `None` when nothing provides the type.
impl<R: Resolvable> Resolvable for Option<R> {
    fn resolve(injector: &mut Injector<'_>, request: Request<'_>) -> Result<Self, InjectError> {
        R::resolve_provided(injector, request)
    }
}

/// Sequences are only injectable when a provider of the whole `Vec<T>` exists.
impl<T: Clone + Send + Sync + 'static> Resolvable for Vec<T> {
    fn resolve(injector: &mut Injector<'_>, request: Request<'_>) -> Result<Self, InjectError> {
        Self::resolve_provided(injector, request)?.ok_or(InjectError::SliceInjectionNotImplemented)
    }

    fn resolve_provided(
        injector: &mut Injector<'_>,
        request: Request<'_>,
    ) -> Result<Option<Self>, InjectError> {
        Ok(injector
            .try_lookup::<Vec<T>>(request)?
            .map(|values| values.as_ref().clone()))
    }
}

// Each element is labelled `<field>#<index>` so errors name the parameter.
macro_rules! tuple_resolvable {
    ($($idx:tt $name:ident),+) => {
        impl<$($name: Resolvable),+> Resolvable for ($($name,)+) {
            fn resolve(injector: &mut Injector<'_>, request: Request<'_>) -> Result<Self, InjectError> {
                Ok(($(
                    $name::resolve(
                        injector,
                        Request {
                            field: &format!("{}#{}", request.field, $idx),
                            qualifier: request.qualifier,
                        },
                    )?,
                )+))
            }

            fn resolve_provided(
                injector: &mut Injector<'_>,
                request: Request<'_>,
            ) -> Result<Option<Self>, InjectError> {
                Ok(Some(($(
                    match $name::resolve_provided(
                        injector,
                        Request {
                            field: &format!("{}#{}", request.field, $idx),
                            qualifier: request.qualifier,
                        },
                    )? {
                        Some(value) => value,
                        None => return Ok(None),
                    },
                )+)))
            }
        }
    };
}

tuple_resolvable!(0 A);
tuple_resolvable!(0 A, 1 B);
tuple_resolvable!(0 A, 1 B, 2 C);
tuple_resolvable!(0 A, 1 B, 2 C, 3 D);
tuple_resolvable!(0 A, 1 B, 2 C, 3 D, 4 E);
tuple_resolvable!(0 A, 1 B, 2 C, 3 D, 4 E, 5 G);
