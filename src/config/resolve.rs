//! Placeholder resolution for property values.
//!
//! Supports `${path.to.field}` and `${path.to.field:default}` syntax. Values
//! found for a key are resolved again before substitution, so properties may
//! reference other placeholder-bearing properties. A default may itself hold
//! placeholders (`${a:${b}}`). Use `$${...}` to produce a literal `${...}`;
//! any other `$` is kept verbatim.

use super::ConfigError;
use toml::{Table, Value};

/// Maximum nesting of placeholder expansion before the chain is treated as cyclic.
pub const MAX_PLACEHOLDER_DEPTH: usize = 32;

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(String),
    Placeholder {
        key: &'a str,
        default: Option<&'a str>,
    },
}

/// Resolves placeholders against a property tree.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    root: &'a Table,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Table) -> Self {
        Self { root }
    }

    /// Expands every placeholder in `raw`, producing a string.
    pub fn resolve_str(&self, raw: &str) -> Result<String, ConfigError> {
        self.interpolate(raw, 0)
    }

    /// Resolves an expression. An expression made of exactly one placeholder
    /// yields the referenced value as-is (lists stay lists, numbers stay numbers).
    pub fn resolve_expr(&self, raw: &str) -> Result<Value, ConfigError> {
        self.expr(raw, 0)
    }

    /// Resolves every string inside `value`, element-wise for arrays and tables.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, ConfigError> {
        self.value(value, 0)
    }

    fn expr(&self, raw: &str, depth: usize) -> Result<Value, ConfigError> {
        let segments = parse(raw)?;
        match segments.as_slice() {
            [Segment::Placeholder { key, default }] => self.lookup(key, *default, depth),
            _ => Ok(Value::String(self.render(&segments, depth)?)),
        }
    }

    fn interpolate(&self, raw: &str, depth: usize) -> Result<String, ConfigError> {
        let segments = parse(raw)?;
        self.render(&segments, depth)
    }

    fn render(&self, segments: &[Segment<'_>], depth: usize) -> Result<String, ConfigError> {
        let mut result = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => result.push_str(text),
                Segment::Placeholder { key, default } => {
                    let value = self.lookup(key, *default, depth)?;
                    result.push_str(&value_to_string(&value, key)?);
                }
            }
        }
        Ok(result)
    }

    fn lookup(&self, key: &str, default: Option<&str>, depth: usize) -> Result<Value, ConfigError> {
        if depth >= MAX_PLACEHOLDER_DEPTH {
            return Err(ConfigError::CyclicProperty {
                key: key.to_string(),
            });
        }
        tracing::trace!(key, depth, "expanding placeholder");

        match lookup_path(self.root, key) {
            Some(found) => self.value(found, depth + 1),
            None => match default {
                Some(default) => self.interpolate(default, depth + 1).map(Value::String),
                None => Err(ConfigError::UnresolvedProperty {
                    key: key.to_string(),
                }),
            },
        }
    }

    fn value(&self, value: &Value, depth: usize) -> Result<Value, ConfigError> {
        match value {
            Value::String(s) => self.expr(s, depth),
            Value::Array(items) => items
                .iter()
                .map(|item| self.value(item, depth))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Table(table) => self.table(table, depth).map(Value::Table),
            other => Ok(other.clone()),
        }
    }

    fn table(&self, table: &Table, depth: usize) -> Result<Table, ConfigError> {
        let mut resolved = Table::new();
        for (key, value) in table {
            resolved.insert(key.clone(), self.value(value, depth)?);
        }
        Ok(resolved)
    }
}

/// Resolves all placeholders in the table against itself.
pub fn resolve_references(table: &mut Table) -> Result<(), ConfigError> {
    let resolved = Resolver::new(table).table(table, 0)?;
    *table = resolved;
    Ok(())
}

/// Looks up a dotted path in the TOML table.
pub(crate) fn lookup_path<'t>(root: &'t Table, path: &str) -> Option<&'t Value> {
    let mut parts = path.split('.');
    let first = parts.next().filter(|p| !p.is_empty())?;
    let mut current = root.get(first)?;
    for part in parts {
        current = current.as_table()?.get(part)?;
    }
    Some(current)
}

/// Converts a scalar TOML value to its string representation.
pub(crate) fn value_to_string(value: &Value, key: &str) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        Value::Array(_) | Value::Table(_) => Err(ConfigError::NonScalarProperty(key.to_string())),
    }
}

fn parse(raw: &str) -> Result<Vec<Segment<'_>>, ConfigError> {
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' {
            match bytes.get(i + 1) {
                Some(b'$') if bytes.get(i + 2) == Some(&b'{') => {
                    // `$${` is a literal `${`; a lone `$$` is kept as is
                    literal.push_str(&raw[start..=i]);
                    i += 2;
                    start = i;
                    continue;
                }
                Some(b'{') => {
                    literal.push_str(&raw[start..i]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let body_start = i + 2;
                    let end = find_closing(bytes, body_start)
                        .ok_or_else(|| ConfigError::UnclosedPlaceholder(raw.to_string()))?;
                    segments.push(split_body(&raw[body_start..end]));
                    i = end + 1;
                    start = i;
                    continue;
                }
                _ => {}
            }
        }
        i += 1;
    }

    literal.push_str(&raw[start..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Index of the `}` closing a placeholder body starting at `from`.
fn find_closing(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_body(body: &str) -> Segment<'_> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 => {
                return Segment::Placeholder {
                    key: body[..i].trim(),
                    default: Some(&body[i + 1..]),
                };
            }
            _ => {}
        }
        i += 1;
    }
    Segment::Placeholder {
        key: body.trim(),
        default: None,
    }
}
