//! Provider keys and injection descriptors.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{ConfigError, Properties};

use super::InjectError;

/// Identifies a singleton: the provider's own type plus an optional qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub name: Option<String>,
}

impl ProviderKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
        }
    }

    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of::<T>()
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})", self.type_name, name),
            None => f.write_str(self.type_name),
        }
    }
}

/// Declares how a field or parameter is resolved.
///
/// Every part may carry `${...}` placeholders; they are expanded against the
/// container's properties right before lookup. An empty resolved name acts
/// as a wildcard.
///
/// ```
/// use hiboot::inject::Dependency;
///
/// let builder = Dependency::new().named("${fake.name}").with("app", "${app.name}");
/// let parsed: Dependency = "name=${fake.name},app=${app.name}".parse().unwrap();
/// assert_eq!(builder, parsed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependency {
    name: Option<String>,
    attributes: Vec<(String, String)>,
}

impl Dependency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an auxiliary `key=value` qualifier.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parses the `name=<literal|${placeholder}>[,<key>=<value>]*` form.
    ///
    /// A bare entry without `=` is taken as the name.
    pub fn parse(tag: &str) -> Result<Self, InjectError> {
        let mut dependency = Self::new();
        for part in split_top_level(tag) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    if key.is_empty() {
                        return Err(InjectError::InvalidObjectType(format!(
                            "qualifier without key in `{tag}`"
                        )));
                    }
                    if key == "name" {
                        dependency.name = Some(value.trim().to_string());
                    } else {
                        dependency
                            .attributes
                            .push((key.to_string(), value.trim().to_string()));
                    }
                }
                None => dependency.name = Some(part.to_string()),
            }
        }
        Ok(dependency)
    }

    /// Expands placeholders, producing the qualifier used for lookup.
    pub fn resolve(&self, properties: &Properties) -> Result<Qualifier, ConfigError> {
        let name = match &self.name {
            Some(raw) => Some(properties.resolve(raw)?).filter(|n| !n.is_empty()),
            None => None,
        };
        let mut attributes = BTreeMap::new();
        for (key, raw) in &self.attributes {
            attributes.insert(key.clone(), properties.resolve(raw)?);
        }
        Ok(Qualifier { name, attributes })
    }
}

impl FromStr for Dependency {
    type Err = InjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A resolved [`Dependency`], handed to factories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualifier {
    name: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl Qualifier {
    pub fn unqualified() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            attributes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Splits on commas that are not inside a `${...}` placeholder.
fn split_top_level(tag: &str) -> Vec<&str> {
    let bytes = tag.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&tag[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&tag[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> Properties {
        Properties::parse(
            r#"
            [app]
            name = "hiboot"

            [fake]
            name = "fake"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_tag() {
        let dep = Dependency::parse("name=${fake.name},app=${app.name}").unwrap();
        assert_eq!(dep.name(), Some("${fake.name}"));
        assert_eq!(dep.attributes, vec![("app".to_string(), "${app.name}".to_string())]);

        assert_eq!(Dependency::parse("").unwrap(), Dependency::new());
        assert_eq!(Dependency::parse("fooUser").unwrap().name(), Some("fooUser"));
    }

    #[test]
    fn test_parse_keeps_commas_inside_placeholders() {
        let dep = Dependency::parse("name=${users.default:a,b},region=eu").unwrap();
        assert_eq!(dep.name(), Some("${users.default:a,b}"));
        assert_eq!(dep.attributes.len(), 1);
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        assert!(matches!(
            Dependency::parse("=foo"),
            Err(InjectError::InvalidObjectType(_))
        ));
    }

    #[test]
    fn test_resolve_expands_placeholders() {
        let qualifier = Dependency::new()
            .named("${fake.name}")
            .with("app", "${app.name}")
            .resolve(&properties())
            .unwrap();
        assert_eq!(qualifier.name(), Some("fake"));
        assert_eq!(qualifier.attribute("app"), Some("hiboot"));
    }

    #[test]
    fn test_empty_name_is_wildcard() {
        let qualifier = Dependency::new()
            .named("${missing:}")
            .resolve(&properties())
            .unwrap();
        assert_eq!(qualifier, Qualifier::unqualified());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ProviderKey::of::<u32>().to_string(), "u32");
        assert_eq!(ProviderKey::named::<u32>("port").to_string(), "u32(port)");
    }
}
