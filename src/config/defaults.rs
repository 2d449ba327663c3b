use toml::Value;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// In-code default values keyed by dotted path, e.g. `app.server.port`.
#[derive(Debug, Clone, Default)]
pub struct DefaultsSource {
    values: Vec<(String, Value)>,
}

impl DefaultsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for DefaultsSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self
            .values
            .iter()
            .map(|(key, value)| ConfigEntry::at_key(key, value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_become_dotted_entries() {
        let mut defaults = DefaultsSource::new();
        defaults.set("app.name", "hi");
        defaults.set("app.server.port", 8080);

        let entries = defaults.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, vec!["app", "server", "port"]);
        assert_eq!(entries[1].value.as_integer(), Some(8080));
    }
}
