use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("unresolved property: {key}")]
    UnresolvedProperty { key: String },

    #[error("cyclic property reference while expanding: {key}")]
    CyclicProperty { key: String },

    #[error("cannot interpolate non-scalar property: {0}")]
    NonScalarProperty(String),

    #[error("unclosed placeholder (missing '}}') in: {0}")]
    UnclosedPlaceholder(String),

    #[error("property '{key}' cannot be converted to {expected}")]
    InvalidValue { key: String, expected: &'static str },
}
