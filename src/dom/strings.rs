//! String Pool
//!
//! All document strings live in one contiguous UTF-8 buffer and are
//! addressed by `u32` ids. Element and attribute names are interned (hash
//! lookup, one copy per distinct name); text content is appended without
//! deduplication since it rarely repeats.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Id 0 always resolves to the empty string
pub const EMPTY: u32 = 0;

#[derive(Debug, Default)]
pub struct StringPool {
    /// (offset, len) into `data`, indexed by string id
    entries: Vec<(u32, u32)>,
    data: String,
    /// Hash of interned content -> ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool {
            entries: vec![(0, 0)],
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a name, returning the existing id when already present
    pub fn intern(&mut self, s: &[u8]) -> u32 {
        if s.is_empty() {
            return EMPTY;
        }
        let s = String::from_utf8_lossy(s);
        let hash = Self::compute_hash(&s);

        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get_str(id) == Some(s.as_ref()) {
                    return id;
                }
            }
        }

        let id = self.append(&s);
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Store text content without deduplication
    pub fn store(&mut self, s: &[u8]) -> u32 {
        if s.is_empty() {
            return EMPTY;
        }
        self.append(&String::from_utf8_lossy(s))
    }

    fn append(&mut self, s: &str) -> u32 {
        let offset = self.data.len() as u32;
        self.data.push_str(s);
        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        id
    }

    pub fn get_str(&self, id: u32) -> Option<&str> {
        let &(offset, len) = self.entries.get(id as usize)?;
        let start = offset as usize;
        self.data.get(start..start + len as usize)
    }

    /// Number of stored strings, including the reserved empty entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern(b"name");
        let id2 = pool.intern(b"name");
        assert_eq!(id1, id2);
        assert_eq!(pool.get_str(id1), Some("name"));
    }

    #[test]
    fn test_store_does_not_dedup() {
        let mut pool = StringPool::new();
        let id1 = pool.store(b"up");
        let id2 = pool.store(b"up");
        assert_ne!(id1, id2);
        assert_eq!(pool.get_str(id2), Some("up"));
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(b""), EMPTY);
        assert_eq!(pool.get_str(EMPTY), Some(""));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_long_text_survives() {
        let mut pool = StringPool::new();
        let long = "x".repeat(70_000);
        let id = pool.store(long.as_bytes());
        assert_eq!(pool.get_str(id).map(str::len), Some(70_000));
    }
}
