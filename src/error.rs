use crate::config::ConfigError;
use crate::inject::InjectError;
use thiserror::Error;

/// Top-level error type for the hiboot library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("injection error: {0}")]
    Inject(#[from] InjectError),
}
