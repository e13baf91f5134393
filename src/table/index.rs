//! Key, position and slice lookups over a resolved key list
//!
//! The index holds keys only. Every lookup is a fresh path query against
//! the document, so memory stays bounded by the key list.

use super::item::Item;
use super::key::Key;
use super::resolver::item_nodes;
use super::spec::PathSpec;
use crate::dom::XmlDocument;
use crate::error::{Result, TableError};
use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};
use std::sync::Arc;
use tracing::trace;

pub struct ItemIndex<'t> {
    doc: &'t Arc<XmlDocument>,
    spec: &'t PathSpec,
    keys: &'t [Key],
}

impl<'t> ItemIndex<'t> {
    pub fn new(doc: &'t Arc<XmlDocument>, spec: &'t PathSpec, keys: &'t [Key]) -> Self {
        ItemIndex { doc, spec, keys }
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.keys.contains(key)
    }

    /// First item in document order whose key paths match `key`
    pub fn lookup_by_key(&self, key: &Key) -> Result<Option<Item>> {
        let Some(query) = self.spec.lookup_path(key) else {
            trace!(%key, "key shape does not match table key spec");
            return Ok(None);
        };
        trace!(%query, "key lookup");
        let first = item_nodes(self.doc, &query)?.into_iter().next();
        Ok(first.map(|node| Item::new(Arc::clone(self.doc), node)))
    }

    /// Item at `position`; negative positions count from the end
    pub fn lookup_by_position(&self, position: isize) -> Result<Option<Item>> {
        let len = self.keys.len();
        let resolved = if position < 0 {
            position + len as isize
        } else {
            position
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(TableError::Index {
                index: position,
                len,
            });
        }
        self.lookup_by_key(&self.keys[resolved as usize])
    }

    /// Items for the keys selected by `range`; keys with no match are skipped
    pub fn lookup_by_slice(&self, range: &SliceRange) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        for i in range.indices(self.keys.len())? {
            if let Some(item) = self.lookup_by_key(&self.keys[i])? {
                items.push(item);
            }
        }
        Ok(items)
    }
}

/// Python-style slice: optional bounds, negative values count from the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl SliceRange {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        SliceRange { start, stop, step }
    }

    pub fn with_step(self, step: isize) -> Self {
        SliceRange { step, ..self }
    }

    /// Positions selected from a sequence of `len` elements
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        let step = self.step;
        if step == 0 {
            return Err(TableError::SliceStep);
        }
        let len = len as isize;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: Option<isize>, default: isize| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).clamp(lower, upper),
            Some(b) => b.clamp(lower, upper),
        };

        let mut i = clamp(self.start, if step > 0 { lower } else { upper });
        let stop = clamp(self.stop, if step > 0 { upper } else { lower });

        let mut out = Vec::new();
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(out)
    }
}

impl Default for SliceRange {
    fn default() -> Self {
        SliceRange::new(None, None, 1)
    }
}

impl From<Range<isize>> for SliceRange {
    fn from(r: Range<isize>) -> Self {
        SliceRange::new(Some(r.start), Some(r.end), 1)
    }
}

impl From<RangeFrom<isize>> for SliceRange {
    fn from(r: RangeFrom<isize>) -> Self {
        SliceRange::new(Some(r.start), None, 1)
    }
}

impl From<RangeTo<isize>> for SliceRange {
    fn from(r: RangeTo<isize>) -> Self {
        SliceRange::new(None, Some(r.end), 1)
    }
}

impl From<RangeToInclusive<isize>> for SliceRange {
    fn from(r: RangeToInclusive<isize>) -> Self {
        SliceRange::new(None, inclusive_stop(r.end), 1)
    }
}

impl From<RangeInclusive<isize>> for SliceRange {
    fn from(r: RangeInclusive<isize>) -> Self {
        SliceRange::new(Some(*r.start()), inclusive_stop(*r.end()), 1)
    }
}

/// Exclusive stop for an inclusive end; `-1` and `isize::MAX` run to the end
fn inclusive_stop(end: isize) -> Option<isize> {
    if end == -1 {
        return None;
    }
    end.checked_add(1)
}

impl From<RangeFull> for SliceRange {
    fn from(_: RangeFull) -> Self {
        SliceRange::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(range: impl Into<SliceRange>, len: usize) -> Vec<usize> {
        range.into().indices(len).unwrap()
    }

    #[test]
    fn test_forward_slices() {
        assert_eq!(idx(1..3, 5), [1, 2]);
        assert_eq!(idx(..2, 5), [0, 1]);
        assert_eq!(idx(3.., 5), [3, 4]);
        assert_eq!(idx(.., 3), [0, 1, 2]);
        assert_eq!(idx(0..=1, 5), [0, 1]);
    }

    #[test]
    fn test_negative_bounds_and_clamping() {
        assert_eq!(idx(-2.., 5), [3, 4]);
        assert_eq!(idx(..-1, 5), [0, 1, 2, 3]);
        assert_eq!(idx(-10..2, 5), [0, 1]);
        assert_eq!(idx(2..100, 4), [2, 3]);
        assert_eq!(idx(3..1, 5), Vec::<usize>::new());
        assert_eq!(idx(-3..=-1, 5), [2, 3, 4]);
    }

    #[test]
    fn test_steps() {
        assert_eq!(idx(SliceRange::default().with_step(2), 5), [0, 2, 4]);
        assert_eq!(idx(SliceRange::default().with_step(-1), 3), [2, 1, 0]);
        assert_eq!(idx(SliceRange::new(Some(3), Some(0), -2), 5), [3, 1]);
        assert_eq!(idx(SliceRange::default().with_step(-1), 0), Vec::<usize>::new());
    }

    #[test]
    fn test_extreme_steps_and_bounds() {
        assert_eq!(idx(SliceRange::new(Some(1), None, isize::MAX), 3), [1]);
        assert_eq!(idx(SliceRange::new(None, None, isize::MIN), 3), [2]);
        assert_eq!(idx(..=isize::MAX, 3), [0, 1, 2]);
        assert_eq!(idx(1..=isize::MAX, 3), [1, 2]);
        assert_eq!(SliceRange::from(..=isize::MAX).stop, None);
    }

    #[test]
    fn test_zero_step_rejected() {
        assert!(matches!(
            SliceRange::default().with_step(0).indices(3),
            Err(TableError::SliceStep)
        ));
    }
}
