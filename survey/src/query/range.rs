//! Range selectors over ordered response sequences.

use std::fmt;
use std::ops::Range;

/// What a range endpoint is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// `first`, `first+N`, `first-N`
    FromStart,
    /// `last`, `last+N`, `last-N`
    FromEnd,
    /// Bare index `N`
    Absolute,
}

/// One side of a range selector.
///
/// Endpoints are symbolic: they never refer to a concrete sequence and are
/// only resolved against a length by [`RangeSelector::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEndpoint {
    pub kind: EndpointKind,
    /// Signed offset for `first`/`last`; the index itself for `Absolute`.
    pub offset: i64,
    /// Text the endpoint was parsed from, kept for diagnostics.
    pub raw: String,
}

impl RangeEndpoint {
    fn new(kind: EndpointKind, offset: i64) -> Self {
        let mut endpoint = Self {
            kind,
            offset,
            raw: String::new(),
        };
        endpoint.raw = endpoint.to_string();
        endpoint
    }

    /// `first` shifted by `offset`.
    pub fn first(offset: i64) -> Self {
        Self::new(EndpointKind::FromStart, offset)
    }

    /// `last` shifted by `offset`.
    pub fn last(offset: i64) -> Self {
        Self::new(EndpointKind::FromEnd, offset)
    }

    /// Absolute zero-based index.
    pub fn index(index: u32) -> Self {
        Self::new(EndpointKind::Absolute, i64::from(index))
    }

    /// Resolve against the index of the last element (`len - 1`).
    ///
    /// Widened to i128 so extreme offsets cannot overflow before clamping.
    fn resolve(&self, last: i128) -> i128 {
        let offset = i128::from(self.offset);
        match self.kind {
            EndpointKind::FromStart | EndpointKind::Absolute => offset,
            EndpointKind::FromEnd => last + offset,
        }
    }
}

impl fmt::Display for RangeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            EndpointKind::Absolute => return write!(f, "{}", self.offset),
            EndpointKind::FromStart => "first",
            EndpointKind::FromEnd => "last",
        };
        if self.offset == 0 {
            write!(f, "{}", keyword)
        } else {
            write!(f, "{}{:+}", keyword, self.offset)
        }
    }
}

/// A pair of endpoints selecting a contiguous slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSelector {
    pub start: RangeEndpoint,
    pub end: RangeEndpoint,
}

impl Default for RangeSelector {
    /// `[first..last]`, i.e. everything.
    fn default() -> Self {
        Self {
            start: RangeEndpoint::first(0),
            end: RangeEndpoint::last(0),
        }
    }
}

impl RangeSelector {
    pub fn new(start: RangeEndpoint, end: RangeEndpoint) -> Self {
        Self { start, end }
    }

    /// Check if this selector keeps every element of any sequence.
    pub fn is_full(&self) -> bool {
        self.start.kind == EndpointKind::FromStart
            && self.start.offset <= 0
            && self.end.kind == EndpointKind::FromEnd
            && self.end.offset >= 0
    }

    /// Resolve the selector against a sequence of `len` elements.
    ///
    /// The start is clamped to 0 and the end to `len - 1`. Returns `None`
    /// when nothing is selected: an empty sequence, an end before the start,
    /// or a start past the end of the sequence.
    pub fn evaluate(&self, len: usize) -> Option<IndexRange> {
        if len == 0 {
            return None;
        }
        let last = len as i128 - 1;
        let start = self.start.resolve(last).max(0);
        let end = self.end.resolve(last).min(last);
        if end < start || start > last {
            return None;
        }
        Some(IndexRange {
            start: start as usize,
            end: end as usize,
        })
    }
}

impl fmt::Display for RangeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start, self.end)
    }
}

/// A resolved, inclusive index interval. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    /// Number of selected elements.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; an empty selection is `None` from `evaluate`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Half-open form for slicing.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        assert_eq!(RangeEndpoint::first(0).to_string(), "first");
        assert_eq!(RangeEndpoint::first(2).to_string(), "first+2");
        assert_eq!(RangeEndpoint::last(-3).to_string(), "last-3");
        assert_eq!(RangeEndpoint::index(7).to_string(), "7");
        assert_eq!(RangeSelector::default().to_string(), "[first..last]");
    }

    #[test]
    fn test_constructed_endpoint_keeps_raw_text() {
        assert_eq!(RangeEndpoint::last(-2).raw, "last-2");
    }

    #[test]
    fn test_index_range_helpers() {
        let range = IndexRange { start: 2, end: 4 };
        assert_eq!(range.len(), 3);
        assert!(!range.is_empty());
        assert_eq!(range.as_range(), 2..5);
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }

    #[test]
    fn test_is_full() {
        assert!(RangeSelector::default().is_full());
        assert!(RangeSelector::new(RangeEndpoint::first(-4), RangeEndpoint::last(9)).is_full());
        assert!(!RangeSelector::new(RangeEndpoint::first(1), RangeEndpoint::last(0)).is_full());
        assert!(!RangeSelector::new(RangeEndpoint::index(0), RangeEndpoint::last(0)).is_full());
    }
}
