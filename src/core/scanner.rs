//! SIMD-accelerated delimiter scanning using memchr
//!
//! The reader walks the input with a single `Scanner`. Markup boundaries
//! (`<`, `>`, closing sequences of comments/CDATA/PIs) are located with
//! memchr so long text runs are skipped without per-byte branching.

use memchr::{memchr, memchr2, memmem};

/// Cursor over an XML byte slice
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end.min(self.input.len())]
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Find next '<' at or after the cursor
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find the '>' closing the current tag, skipping quoted attribute values
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut pos = self.pos;
        loop {
            let rel = memchr2(b'>', b'"', &self.input[pos..])
                .into_iter()
                .chain(memchr(b'\'', &self.input[pos..]))
                .min()?;
            let at = pos + rel;
            match self.input[at] {
                b'>' => return Some(at),
                quote => {
                    // Jump over the quoted value
                    let close = memchr(quote, &self.input[at + 1..])?;
                    pos = at + 1 + close + 1;
                }
            }
        }
    }

    /// Find the start of `needle` at or after the cursor
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.input[self.pos..], needle).map(|i| self.pos + i)
    }

    /// Read an XML name starting at the cursor
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        if !self.input.get(start).copied().is_some_and(is_name_start_char) {
            return None;
        }
        self.pos += 1;
        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }
}

/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
