//! Half-open intervals over a single coordinate axis.
//!
//! Everything in this crate that occupies a stretch of the axis (hierarchy
//! nodes, raw rows, synthetic rows, query windows) is compared through the
//! [`Interval`] trait. All intervals are 0-based and half-open, so an interval
//! `[start, end)` covers `start` up until (but not including) `end`.
//!
//! ```text
//! | 0 | 1 | 2 | 3 | 4 | 5 | 6 |
//! -----------------------------
//! |   | X | X | X | O |   |   |  <= [1, 4)
//! |   |   |   |   | X | X | O  <= [4, 6)
//! ```
//!
//! The two intervals above are adjacent but do not overlap.

use omics::coordinate::position::Number;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to an interval.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The start of the interval was greater than its end.
    StartGreaterThanEnd(Number, Number),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::StartGreaterThanEnd(start, end) => write!(
                f,
                "start position ({start}) cannot be greater than the end position ({end})"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Interval
////////////////////////////////////////////////////////////////////////////////////////

/// A half-open interval on the coordinate axis.
pub trait Interval {
    /// The inclusive start of the interval.
    fn start(&self) -> Number;

    /// The exclusive end of the interval.
    fn end(&self) -> Number;

    /// The number of positions covered by the interval.
    fn len(&self) -> Number {
        self.end().saturating_sub(self.start())
    }

    /// Whether the interval covers no positions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the interval overlaps the half-open range `[start, end)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::Interval;
    /// use hiertrack::Span;
    ///
    /// let span = Span::try_new(2, 5)?;
    ///
    /// assert!(span.overlaps(4, 10));
    /// assert!(!span.overlaps(5, 10));
    /// assert!(!span.overlaps(0, 2));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn overlaps(&self, start: Number, end: Number) -> bool {
        self.start() < end && self.end() > start
    }

    /// Whether the interval entirely contains `other`.
    fn contains<I: Interval + ?Sized>(&self, other: &I) -> bool
    where
        Self: Sized,
    {
        self.start() <= other.start() && other.end() <= self.end()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Span
////////////////////////////////////////////////////////////////////////////////////////

/// A concrete half-open interval.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Span {
    /// The inclusive start.
    start: Number,

    /// The exclusive end.
    end: Number,
}

impl Span {
    /// Attempts to create a new [`Span`].
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::Interval;
    /// use hiertrack::Span;
    ///
    /// let span = Span::try_new(10, 20)?;
    /// assert_eq!(span.len(), 10);
    ///
    /// assert!(Span::try_new(20, 10).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(start: Number, end: Number) -> Result<Self> {
        if start > end {
            return Err(Error::StartGreaterThanEnd(start, end));
        }

        Ok(Self { start, end })
    }

    /// Creates a new [`Span`], collapsing it to an empty span at `start` if
    /// `end` falls before `start`.
    pub fn clamped(start: Number, end: Number) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Creates a span covering exactly one position.
    pub fn unit(position: Number) -> Self {
        Self {
            start: position,
            end: position + 1,
        }
    }
}

impl Interval for Span {
    fn start(&self) -> Number {
        self.start
    }

    fn end(&self) -> Number {
        self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_rejects_inverted_spans() {
        let err = Span::try_new(5, 4).unwrap_err();
        assert_eq!(err, Error::StartGreaterThanEnd(5, 4));
        assert_eq!(
            err.to_string(),
            "start position (5) cannot be greater than the end position (4)"
        );
    }

    #[test]
    fn it_treats_adjacent_spans_as_disjoint() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let span = Span::try_new(0, 10)?;

        assert!(span.overlaps(9, 11));
        assert!(!span.overlaps(10, 11));
        assert!(span.contains(&Span::try_new(0, 10)?));
        assert!(span.contains(&Span::unit(9)));
        assert!(!span.contains(&Span::unit(10)));

        Ok(())
    }

    #[test]
    fn it_clamps_spans() {
        let span = Span::clamped(10, 4);
        assert_eq!(span.start(), 10);
        assert_eq!(span.end(), 10);
        assert!(span.is_empty());
        assert_eq!(span.to_string(), "[10, 10)");
    }
}
