use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while registering providers or wiring objects.
///
/// The first error hit during a resolution pass aborts the pass and is
/// returned unchanged; fields set before the failure stay set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InjectError {
    #[error("invalid object type: {0}")]
    InvalidObjectType(String),

    #[error("{type_name} is not implemented (required by `{field}`)")]
    NotImplemented { type_name: String, field: String },

    #[error("slice injection is not implemented")]
    SliceInjectionNotImplemented,

    #[error("ambiguous provider for {type_name}{}: {candidates} candidates, add a qualifier", qualifier_suffix(.name))]
    AmbiguousProvider {
        type_name: String,
        name: Option<String>,
        candidates: usize,
    },

    #[error("circular dependency detected: {path}")]
    CircularDependency { path: String },

    #[error("provider for {type_name} failed: {message}")]
    Provider {
        type_name: &'static str,
        message: String,
    },

    #[error("lock error on resource: {resource}")]
    LockPoisoned { resource: &'static str },

    #[error(transparent)]
    Property(#[from] ConfigError),
}

impl InjectError {
    /// Wraps a failure raised inside a user constructor for `T`.
    pub fn provider<T: ?Sized>(message: impl std::fmt::Display) -> Self {
        Self::Provider {
            type_name: std::any::type_name::<T>(),
            message: message.to_string(),
        }
    }

    pub fn not_implemented<T: ?Sized>(field: &str) -> Self {
        Self::NotImplemented {
            type_name: std::any::type_name::<T>().to_string(),
            field: field.to_string(),
        }
    }
}

fn qualifier_suffix(name: &Option<String>) -> String {
    name.as_ref().map(|n| format!("({n})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    trait FakeRepository {}

    #[test]
    fn test_messages() {
        let err = InjectError::not_implemented::<dyn FakeRepository>("FooRepository");
        assert!(err.to_string().contains("FakeRepository is not implemented"));

        assert_eq!(
            InjectError::SliceInjectionNotImplemented.to_string(),
            "slice injection is not implemented"
        );

        let err = InjectError::AmbiguousProvider {
            type_name: "User".into(),
            name: Some("foo".into()),
            candidates: 2,
        };
        assert_eq!(
            err.to_string(),
            "ambiguous provider for User(foo): 2 candidates, add a qualifier"
        );
    }

    #[test]
    fn test_property_errors_are_transparent() {
        let err: InjectError = ConfigError::UnresolvedProperty {
            key: "fake.url".into(),
        }
        .into();
        assert_eq!(err.to_string(), "unresolved property: fake.url");
    }
}
