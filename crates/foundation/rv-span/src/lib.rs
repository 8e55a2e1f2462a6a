//! Source positions and extents
//!
//! A [`Pos`] is an offset that is unique across every file of a compiled
//! unit: each file is assigned a base offset and positions inside it are
//! `base + byte offset`. Correlating syntax with IR relies on that
//! uniqueness, so two distinct syntactic occurrences never share a `Pos`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// Wraps a raw file index
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A position in the compiled unit. `Pos::NONE` marks synthesized entities.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Pos(pub u32);

impl Pos {
    /// No source position
    pub const NONE: Self = Self(0);

    /// Position at the given unit-wide offset
    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Whether this position refers to real source text
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// The position `len` bytes further on
    #[must_use]
    pub fn advance(self, len: u32) -> Self {
        Self(self.0 + len)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(formatter, "@{}", self.0)
        } else {
            write!(formatter, "@-")
        }
    }
}

/// A half-open extent `[start, end)` of source text
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// First position inside the extent
    pub start: Pos,
    /// First position past the extent
    pub end: Pos,
}

impl Span {
    /// Extent from `start` up to but excluding `end`
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Extent covering both `self` and `other`
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Byte range of the extent
    pub fn range(&self) -> Range<usize> {
        self.start.0 as usize..self.end.0 as usize
    }

    /// Length in bytes
    pub fn len(&self) -> u32 {
        self.end.0 - self.start.0
    }

    /// Whether the extent covers no text
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `pos` lies inside this extent
    pub fn contains(&self, pos: Pos) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Whether `other` lies entirely inside this extent
    pub fn encloses(&self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_containment() {
        let outer = Span::new(Pos(10), Pos(20));
        assert!(outer.contains(Pos(10)));
        assert!(outer.contains(Pos(19)));
        assert!(!outer.contains(Pos(20)));
        assert!(outer.encloses(Span::new(Pos(12), Pos(20))));
        assert!(!outer.encloses(Span::new(Pos(9), Pos(12))));
    }

    #[test]
    fn test_join() {
        let joined = Span::new(Pos(4), Pos(6)).join(Span::new(Pos(1), Pos(5)));
        assert_eq!(joined, Span::new(Pos(1), Pos(6)));
        assert_eq!(joined.len(), 5);
    }

    #[test]
    fn test_no_pos() {
        assert!(!Pos::NONE.is_valid());
        assert_eq!(Pos::NONE.to_string(), "@-");
        assert_eq!(Pos(7).to_string(), "@7");
    }
}
