use std::fmt;

/// A byte range `[start, start + length)` of an image.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Span {
    /// Absolute offset of the first byte
    pub start: usize,
    /// Number of bytes
    pub length: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub fn new(start: usize, length: usize) -> Span {
        Span { start, length }
    }

    /// Offset one past the last byte.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Returns `true` if `offset` lies inside the span.
    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// Returns `true` if `other` lies completely inside this span.
    #[must_use]
    pub fn encloses(&self, other: &Span) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Returns `true` if both spans share at least one byte.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}..{:#x})", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment() {
        let span = Span::new(0x10, 0x10);

        assert_eq!(span.end(), 0x20);
        assert!(span.contains(0x10));
        assert!(span.contains(0x1F));
        assert!(!span.contains(0x20));
        assert!(span.encloses(&Span::new(0x18, 8)));
        assert!(!span.encloses(&Span::new(0x18, 9)));
        assert!(span.overlaps(&Span::new(0x1F, 4)));
        assert!(!span.overlaps(&Span::new(0x20, 4)));
        assert_eq!(span.to_string(), "[0x10..0x20)");
    }
}
