//! Property files: a required base file and optional profile overrides.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use toml::Table;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// A TOML property file merged at the root of the property tree.
///
/// A missing required file fails the build; a missing optional file
/// contributes nothing.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }

    /// `<dir>/<base>.toml`, required.
    pub fn base(dir: impl AsRef<Path>, base: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{base}.toml")), true)
    }

    /// `<dir>/<base>-<profile>.toml`, optional.
    pub fn profile(dir: impl AsRef<Path>, base: &str, profile: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{base}-{profile}.toml")), false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn read_table(&self) -> Result<Option<Table>, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound && !self.required => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::ParseError {
                path: self.path.clone(),
                source,
            })
    }
}

impl ConfigSource for FileSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let Some(table) = self.read_table()? else {
            tracing::debug!(path = %self.path.display(), "optional property file absent");
            return Ok(Vec::new());
        };
        tracing::debug!(path = %self.path.display(), "loaded property file");
        Ok(vec![ConfigEntry::root(table)])
    }
}
