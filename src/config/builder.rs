use std::path::Path;

use serde::de::DeserializeOwned;
use toml::Value;

use super::defaults::DefaultsSource;
use super::env::EnvSource;
use super::file::FileSource;
use super::properties::Properties;
use super::source::{merge_at_path, ConfigSource};
use super::ConfigError;

/// Environment variable selecting the active profile override file.
pub const ACTIVE_PROFILE_ENV: &str = "APP_PROFILES_ACTIVE";

/// Builder for layering configuration from defaults, files and environment.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Nested tables are merged recursively and keys absent from an
/// override are kept; other values (including arrays) are replaced entirely.
/// In-code defaults always sit underneath every other source.
///
/// ## Placeholders
///
/// String values can reference other properties using `${path.to.field}` or
/// `${path.to.field:default}`:
///
/// ```toml
/// [app]
/// name = "hiboot"
///
/// [fake]
/// nickname = "${app.name} fake"
/// username = "${unknown.name:bar}"
/// ```
///
/// [`build_properties`](Self::build_properties) keeps values raw and resolves
/// on access; [`build`](Self::build) resolves the whole tree up front.
///
/// ## Example
///
/// ```no_run
/// use hiboot::Config;
///
/// // application.toml, then application-<APP_PROFILES_ACTIVE>.toml if set
/// let properties = Config::builder()
///     .with_default("app.name", "hi")
///     .with_default("app.server.port", 8080)
///     .with_active_profile("config", "application")
///     .with_env("HIBOOT", "__")
///     .build_properties()?;
///
/// let port: u16 = properties.value("${app.server.port}")?;
/// # Ok::<(), hiboot::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    defaults: DefaultsSource,
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets a default value at a dotted key.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.set(key, value);
        self
    }

    /// Adds a TOML file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds `<dir>/<base>.toml` (required) followed by the optional
    /// `<dir>/<base>-<profile>.toml` override.
    pub fn with_profile(self, dir: impl AsRef<Path>, base: &str, profile: Option<&str>) -> Self {
        let dir = dir.as_ref();
        let builder = self.with_source(FileSource::base(dir, base));
        match profile.filter(|p| !p.is_empty()) {
            Some(profile) => builder.with_source(FileSource::profile(dir, base, profile)),
            None => builder,
        }
    }

    /// Like [`with_profile`](Self::with_profile), reading the profile from
    /// [`ACTIVE_PROFILE_ENV`].
    pub fn with_active_profile(self, dir: impl AsRef<Path>, base: &str) -> Self {
        let profile = std::env::var(ACTIVE_PROFILE_ENV).ok();
        tracing::debug!(profile = ?profile, "selecting property profile");
        self.with_profile(dir, base, profile.as_deref())
    }

    /// Loads configuration from environment variables with the given prefix.
    ///
    /// Environment variables are mapped to property keys by:
    /// 1. Removing the prefix and separator
    /// 2. Splitting remaining segments on the separator
    /// 3. Converting path segments to lowercase
    ///
    /// Values are coerced from strings to the most specific type:
    /// integer, float, boolean, or string (fallback).
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds a custom source.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads and merges all sources without resolving placeholders.
    pub fn build_properties(self) -> Result<Properties, ConfigError> {
        let mut merged = toml::Table::new();

        merge_source(&mut merged, &self.defaults)?;
        for source in &self.sources {
            merge_source(&mut merged, source.as_ref())?;
        }

        Ok(Properties::from_table(merged))
    }

    /// Builds the configuration by loading, merging, resolving, and deserializing.
    pub fn build<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        self.build_properties()?.bind()
    }
}

fn merge_source(merged: &mut toml::Table, source: &dyn ConfigSource) -> Result<(), ConfigError> {
    for entry in source.entries()? {
        merge_at_path(merged, &entry.path, entry.value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    fn config_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "application.toml",
            r#"
            [app]
            name = "hiboot"
            project = "devops"
            "#,
        );
        write(
            &dir,
            "application-dev.toml",
            r#"
            [app]
            name = "hiboot-dev"
            "#,
        );
        dir
    }

    #[test]
    fn test_defaults_are_overridden_by_files() {
        let dir = config_dir();
        let props = Config::builder()
            .with_default("app.name", "hi")
            .with_default("app.server.port", 8080)
            .with_file(dir.path().join("application.toml"), true)
            .build_properties()
            .unwrap();

        assert_eq!(props.value::<String>("${app.name}").unwrap(), "hiboot");
        assert_eq!(props.value::<u16>("${app.server.port}").unwrap(), 8080);
    }

    #[test]
    fn test_profile_override_keeps_base_keys() {
        let dir = config_dir();
        let props = Config::builder()
            .with_profile(dir.path(), "application", Some("dev"))
            .build_properties()
            .unwrap();

        assert_eq!(props.value::<String>("${app.name}").unwrap(), "hiboot-dev");
        assert_eq!(props.value::<String>("${app.project}").unwrap(), "devops");
    }

    #[test]
    fn test_missing_profile_file_is_optional() {
        let dir = config_dir();
        let props = Config::builder()
            .with_profile(dir.path(), "application", Some("prod"))
            .build_properties()
            .unwrap();

        assert_eq!(props.value::<String>("${app.name}").unwrap(), "hiboot");
    }

    #[test]
    fn test_missing_base_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = Config::builder()
            .with_profile(dir.path(), "application", None)
            .build_properties();

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_active_profile_from_env() {
        let dir = config_dir();
        std::env::set_var(ACTIVE_PROFILE_ENV, "dev");
        let props = Config::builder()
            .with_active_profile(dir.path(), "application")
            .build_properties();
        std::env::remove_var(ACTIVE_PROFILE_ENV);

        assert_eq!(props.unwrap().value::<String>("${app.name}").unwrap(), "hiboot-dev");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = config_dir();
        std::env::set_var("HIBOOT_TEST__APP__NAME", "from-env");
        let props = Config::builder()
            .with_file(dir.path().join("application.toml"), true)
            .with_env("HIBOOT_TEST", "__")
            .build_properties();
        std::env::remove_var("HIBOOT_TEST__APP__NAME");

        assert_eq!(props.unwrap().value::<String>("${app.name}").unwrap(), "from-env");
    }

    #[derive(Debug, Deserialize)]
    struct AppConfig {
        app: AppSection,
    }

    #[derive(Debug, Deserialize)]
    struct AppSection {
        name: String,
        url: String,
    }

    #[test]
    fn test_build_resolves_and_deserializes() {
        let config: AppConfig = Config::builder()
            .with_default("app.name", "hiboot")
            .with_default("app.url", "http://${app.name}:${app.port:8080}")
            .build()
            .unwrap();

        assert_eq!(config.app.name, "hiboot");
        assert_eq!(config.app.url, "http://hiboot:8080");
    }
}
