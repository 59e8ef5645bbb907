//! A columnar collection of emitted measurement values.

use omics::coordinate::position::Number;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;

use crate::collection::Reorder;
use crate::collection::Result;
use crate::collection::check;
use crate::collection::lay_out;
use crate::interval::Interval;
use crate::interval::Span;
use crate::order::Permutation;

/// The number of decimal places values are rounded to.
pub const PRECISION: i32 = 3;

/// Normalizes a raw value: a missing value reads as zero and a present value
/// is rounded to [`PRECISION`] decimal places.
///
/// # Examples
///
/// ```
/// use hiertrack::collection::value::normalize;
///
/// assert_eq!(normalize(None), 0.0);
/// assert_eq!(normalize(Some(1.23456)), 1.235);
/// ```
pub fn normalize(value: Option<f64>) -> f64 {
    match value {
        Some(value) => {
            let scale = 10f64.powi(PRECISION);
            (value * scale).round() / scale
        }
        None => 0.0,
    }
}

/// A columnar collection of values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueCollection {
    /// The index of the first value.
    global_start_index: Option<Number>,

    /// The values.
    values: Vec<f64>,

    /// The index of each value.
    index: Vec<Number>,

    /// The start of each value.
    start: Vec<Number>,

    /// The end of each value.
    end: Vec<Number>,

    /// The span of raw leaf indices each value stands in for.
    leaves: Vec<Span>,
}

impl ValueCollection {
    /// Gets the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the collection holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the index of the first value.
    pub fn global_start_index(&self) -> Option<Number> {
        self.global_start_index
    }

    /// Gets the values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Gets the index of each value.
    pub fn indices(&self) -> &[Number] {
        &self.index
    }

    /// Gets the start of each value.
    pub fn starts(&self) -> &[Number] {
        &self.start
    }

    /// Gets the end of each value.
    pub fn ends(&self) -> &[Number] {
        &self.end
    }

    /// Pushes a value into the collection.
    pub fn push(&mut self, value: f64, index: Number, span: Span, leaves: Span) {
        if self.global_start_index.is_none() {
            self.global_start_index = Some(index);
        }

        self.values.push(value);
        self.index.push(index);
        self.start.push(span.start());
        self.end.push(span.end());
        self.leaves.push(leaves);
    }
}

impl Reorder for ValueCollection {
    fn leaves(&self) -> &[Span] {
        &self.leaves
    }

    fn reorder(&self, permutation: &Permutation) -> Result<Self> {
        check(permutation, self.len())?;

        let Some(global_start_index) = self.global_start_index else {
            return Ok(self.clone());
        };

        let origin = self.start.first().copied().unwrap_or_default();
        let (start, end) = lay_out(
            origin,
            permutation
                .iter()
                .map(|&i| self.end[i].saturating_sub(self.start[i])),
        );

        Ok(Self {
            global_start_index: Some(global_start_index),
            values: permutation.iter().map(|&i| self.values[i]).collect(),
            index: (0..self.len() as Number)
                .map(|k| global_start_index + k)
                .collect(),
            start,
            end,
            leaves: permutation.iter().map(|&i| self.leaves[i]).collect(),
        })
    }
}

impl Serialize for ValueCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("globalStartIndex", &self.global_start_index)?;
        map.serialize_entry("values", &self.values)?;
        map.end()
    }
}
