use toml::Value;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Maps `PREFIX<sep>A<sep>B=value` environment variables onto `a.b`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
        }
    }

    fn entries_from<I>(&self, vars: I) -> Vec<ConfigEntry>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if self.separator.is_empty() {
            return Vec::new();
        }
        let lead = format!("{}{}", self.prefix, self.separator);

        vars.into_iter()
            .filter_map(|(name, raw)| {
                let rest = name.strip_prefix(&lead).filter(|rest| !rest.is_empty())?;
                let path = rest
                    .split(self.separator.as_str())
                    .map(str::to_lowercase)
                    .collect::<Vec<_>>();
                Some(ConfigEntry::at_path(path, coerce_value(&raw)))
            })
            .collect()
    }
}

impl ConfigSource for EnvSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self.entries_from(std::env::vars()))
    }
}

/// Environment values are strings; recover integers, floats and booleans.
/// Anything else, placeholders included, stays a string.
fn coerce_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(raw.eq_ignore_ascii_case("true"));
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let integral = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
    match (integral, raw.contains('.')) {
        (true, _) => raw.parse().map(Value::Integer).unwrap_or_else(|_| Value::String(raw.to_string())),
        (false, true) => raw.parse().map(Value::Float).unwrap_or_else(|_| Value::String(raw.to_string())),
        (false, false) => Value::String(raw.to_string()),
    }
}
