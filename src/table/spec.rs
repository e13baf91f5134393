//! Item and key paths of a table

use super::key::Key;
use crate::dom::normalize_space;
use crate::error::{Result, TableError};
use crate::xpath::compile_cached;

/// Key path used when a definition names none
pub const DEFAULT_KEY: &str = "name";

/// Key path(s), evaluated relative to each item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Single(String),
    Composite(Vec<String>),
}

impl KeySpec {
    pub fn paths(&self) -> &[String] {
        match self {
            KeySpec::Single(path) => std::slice::from_ref(path),
            KeySpec::Composite(paths) => paths,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, KeySpec::Composite(_))
    }
}

impl Default for KeySpec {
    fn default() -> Self {
        KeySpec::Single(DEFAULT_KEY.to_string())
    }
}

impl From<&str> for KeySpec {
    fn from(path: &str) -> Self {
        KeySpec::Single(path.to_string())
    }
}

impl From<Vec<&str>> for KeySpec {
    fn from(paths: Vec<&str>) -> Self {
        KeySpec::Composite(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for KeySpec {
    fn from(paths: Vec<String>) -> Self {
        KeySpec::Composite(paths)
    }
}

/// Where a table's items live and how each one is keyed.
/// No item path makes a container table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    item: Option<String>,
    key: KeySpec,
}

impl PathSpec {
    /// Build a path spec; every path must compile and a composite key needs at
    /// least one path
    pub fn new(item: impl Into<String>, key: impl Into<KeySpec>) -> Result<Self> {
        let spec = PathSpec {
            item: Some(item.into()),
            key: key.into(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn container() -> Self {
        PathSpec {
            item: None,
            key: KeySpec::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| TableError::InvalidKeySpec {
            table: self.item.clone().unwrap_or_default(),
            reason,
        };
        if self.key.paths().is_empty() {
            return Err(invalid("composite key needs at least one path".to_string()));
        }
        for path in self.item.iter().chain(self.key.paths()) {
            if path.trim().is_empty() {
                return Err(invalid("empty path".to_string()));
            }
            compile_cached(path).map_err(|e| TableError::path(path, e))?;
        }
        Ok(())
    }

    pub fn item_path(&self) -> Option<&str> {
        self.item.as_deref()
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn is_container(&self) -> bool {
        self.item.is_none()
    }

    /// Path selecting the items whose key equals `key`, one
    /// `[normalize-space(path)="value"]` predicate per key path.
    /// `None` when the key's shape does not fit the key paths.
    pub fn lookup_path(&self, key: &Key) -> Option<String> {
        let item = self.item.as_deref()?;
        let paths = self.key.paths();
        if key.is_composite() != self.key.is_composite() || key.parts().len() != paths.len() {
            return None;
        }
        let mut query = String::with_capacity(item.len() + 32 * paths.len());
        query.push_str(item);
        for (path, value) in paths.iter().zip(key.parts()) {
            query.push_str("[normalize-space(");
            query.push_str(path);
            query.push_str(")=");
            query.push_str(&string_literal(&normalize_space(value)));
            query.push(']');
        }
        Some(query)
    }
}

/// Quote a value as a path string literal. Values holding both quote
/// characters are spelled with concat().
pub fn string_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let pieces: Vec<String> = value
        .split('"')
        .map(|piece| format!("\"{}\"", piece))
        .collect();
    format!("concat({})", pieces.join(", '\"', "))
}
