//! Table keys

use std::fmt;

/// Key identifying one item of a table.
///
/// Simple keys hold the trimmed text of the key path. Composite keys hold
/// one untrimmed value per key path, with `""` standing in for a path that
/// matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Simple(String),
    Composite(Vec<String>),
}

impl Key {
    pub fn as_simple(&self) -> Option<&str> {
        match self {
            Key::Simple(s) => Some(s),
            Key::Composite(_) => None,
        }
    }

    /// Key values in key-path order
    pub fn parts(&self) -> &[String] {
        match self {
            Key::Simple(s) => std::slice::from_ref(s),
            Key::Composite(parts) => parts,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Key::Composite(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Simple(s) => f.write_str(s),
            Key::Composite(parts) => write!(f, "({})", parts.join(", ")),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Simple(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Simple(s)
    }
}

impl From<Vec<String>> for Key {
    fn from(parts: Vec<String>) -> Self {
        Key::Composite(parts)
    }
}

impl From<Vec<&str>> for Key {
    fn from(parts: Vec<&str>) -> Self {
        Key::Composite(parts.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(parts: [&str; N]) -> Self {
        Key::Composite(parts.iter().map(|p| p.to_string()).collect())
    }
}

impl From<(&str, &str)> for Key {
    fn from((a, b): (&str, &str)) -> Self {
        Key::Composite(vec![a.to_string(), b.to_string()])
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
