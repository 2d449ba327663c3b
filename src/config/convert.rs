//! Conversion of resolved property values into field types.

use toml::Value;

use super::resolve::value_to_string;
use super::ConfigError;

/// A type that can be produced from a resolved property value.
///
/// `key` names the expression being converted and is only used for errors.
pub trait FromProperty: Sized {
    fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError>;
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        expected,
    }
}

impl FromProperty for String {
    fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError> {
        value_to_string(value, key)
    }
}

impl FromProperty for bool {
    fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(invalid(key, "bool")),
        }
    }
}

macro_rules! integer_from_property {
    ($($ty:ty),*) => {$(
        impl FromProperty for $ty {
            fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError> {
                match value {
                    Value::Integer(i) => <$ty>::try_from(*i).map_err(|_| invalid(key, stringify!($ty))),
                    Value::String(s) => s.trim().parse().map_err(|_| invalid(key, stringify!($ty))),
                    _ => Err(invalid(key, stringify!($ty))),
                }
            }
        }
    )*};
}

integer_from_property!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_from_property {
    ($($ty:ty),*) => {$(
        impl FromProperty for $ty {
            fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError> {
                match value {
                    Value::Float(f) => Ok(*f as $ty),
                    Value::Integer(i) => Ok(*i as $ty),
                    Value::String(s) => s.trim().parse().map_err(|_| invalid(key, stringify!($ty))),
                    _ => Err(invalid(key, stringify!($ty))),
                }
            }
        }
    )*};
}

float_from_property!(f32, f64);

impl<T: FromProperty> FromProperty for Vec<T> {
    fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError> {
        match value {
            Value::Array(items) => items.iter().map(|item| T::from_property(item, key)).collect(),
            Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
            Value::String(s) => s
                .split(',')
                .map(|part| T::from_property(&Value::String(part.trim().to_string()), key))
                .collect(),
            _ => Err(invalid(key, "sequence")),
        }
    }
}

impl<T: FromProperty> FromProperty for Option<T> {
    fn from_property(value: &Value, key: &str) -> Result<Self, ConfigError> {
        match value {
            Value::String(s) if s.is_empty() => Ok(None),
            other => T::from_property(other, key).map(Some),
        }
    }
}

impl FromProperty for Value {
    fn from_property(value: &Value, _key: &str) -> Result<Self, ConfigError> {
        Ok(value.clone())
    }
}
