//! Columnar collections of emitted rows and values.
//!
//! Both collections are stored column-wise, which is also how they are sent
//! over the wire. Each emitted entry additionally remembers the span of raw
//! leaf indices it stands in for (a single leaf for a raw row, every leaf
//! beneath the node for a synthetic row). Reordering is driven by those leaf
//! spans.

pub mod row;
pub mod value;

use omics::coordinate::position::Number;

pub use row::RowCollection;
pub use value::ValueCollection;

use crate::interval::Span;
use crate::order::Permutation;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a collection.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// A permutation was applied to a collection of a different length.
    PermutationLength {
        /// The length of the collection.
        expected: usize,

        /// The length of the permutation.
        found: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::PermutationLength { expected, found } => write!(
                f,
                "permutation of length {found} cannot be applied to a collection of length \
                 {expected}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Reordering
////////////////////////////////////////////////////////////////////////////////////////

/// A collection whose entries can be permuted.
pub trait Reorder: Sized {
    /// Gets the span of raw leaf indices each entry stands in for.
    fn leaves(&self) -> &[Span];

    /// Permutes the entries of the collection.
    ///
    /// Entry `k` of the result is entry `permutation[k]` of `self`. Indices are
    /// renumbered consecutively from the global start index and positions are
    /// laid out contiguously from the start of the first entry of `self`.
    fn reorder(&self, permutation: &Permutation) -> Result<Self>;
}

/// Checks that `permutation` can be applied to a collection of `len` entries.
pub(crate) fn check(permutation: &Permutation, len: usize) -> Result<()> {
    if permutation.len() != len {
        return Err(Error::PermutationLength {
            expected: len,
            found: permutation.len(),
        });
    }

    Ok(())
}

/// Lays out entries of the given widths contiguously from `origin`.
///
/// Returns the start and end of each entry.
pub(crate) fn lay_out(
    origin: Number,
    widths: impl Iterator<Item = Number>,
) -> (Vec<Number>, Vec<Number>) {
    let mut position = origin;
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    for width in widths {
        starts.push(position);
        position += width;
        ends.push(position);
    }

    (starts, ends)
}
