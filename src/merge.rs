//! Merging of raw row and value streams with a resolved selection.
//!
//! Raw rows arrive in ascending index order. Alongside them, the canonical
//! selected nodes of a [`Resolution`] are walked in ascending start order. Each
//! selected node is emitted (when collapsed) as soon as the raw stream moves
//! past its end, and every raw row is shifted down by the number of raw
//! indices removed before it.

pub mod rows;
pub mod values;

use std::iter::Peekable;
use std::slice::Iter;

use omics::coordinate::position::Number;

pub use rows::merge_rows;
pub use values::merge_values;

use crate::interval::Interval;
use crate::selection::Resolution;
use crate::selection::Selected;

/// The pending selected nodes of a resolution, walked in lock-step with a raw
/// stream.
#[derive(Debug)]
pub(crate) struct Boundaries<'a> {
    /// The selected nodes that have not been passed yet.
    pending: Peekable<Iter<'a, Selected>>,

    /// The number of raw indices removed before the raw cursor.
    collapse: Number,

    /// The end of the query range.
    end: Number,
}

impl<'a> Boundaries<'a> {
    /// Creates new [`Boundaries`] for `resolution`.
    pub(crate) fn new(resolution: &'a Resolution) -> Self {
        Self {
            pending: resolution.pending().iter().peekable(),
            collapse: resolution.start_collapse(),
            end: resolution.range().end(),
        }
    }

    /// Gets the number of raw indices removed before the raw cursor.
    pub(crate) fn collapse(&self) -> Number {
        self.collapse
    }

    /// Pops the next pending node if it ends at or before `position`.
    pub(crate) fn passed(&mut self, position: Number) -> Option<&'a Selected> {
        let passed = self
            .pending
            .peek()
            .is_some_and(|selected| selected.end() <= position);

        match passed {
            true => self.advance(),
            false => None,
        }
    }

    /// Gets the next pending node if it fully contains `interval`.
    pub(crate) fn containing<I: Interval>(&mut self, interval: &I) -> Option<&'a Selected> {
        self.pending
            .peek()
            .copied()
            .filter(|selected| selected.contains(interval))
    }

    /// Pops the next pending node if it still overlaps the query range.
    ///
    /// Used to flush the nodes left over once the raw stream is exhausted.
    pub(crate) fn remaining(&mut self) -> Option<&'a Selected> {
        let end = self.end;
        let overlaps = self
            .pending
            .peek()
            .is_some_and(|selected| selected.start() < end);

        match overlaps {
            true => self.advance(),
            false => None,
        }
    }

    /// Pops the next pending node.
    fn advance(&mut self) -> Option<&'a Selected> {
        let selected = self.pending.next()?;
        self.collapse = selected.collapse_after();
        Some(selected)
    }
}
