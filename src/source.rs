//! The host data sources the engine reads from.
//!
//! The engine never talks to a storage system directly. Instead, a host
//! implements the traits in this module:
//!
//! - [`HierarchySource`] looks up hierarchy nodes.
//! - [`RowSource`] streams raw rows in ascending index order.
//! - [`ValueSource`] streams raw measurement values in ascending index order.
//!
//! [`Dataset`] implements all three over an in-memory JSON document.

pub mod dataset;

use std::collections::BTreeMap;
use std::collections::HashMap;

use omics::coordinate::Contig;
use omics::coordinate::position::Number;
use serde::Deserialize;
use serde::Serialize;

pub use dataset::Dataset;

use crate::hierarchy::Node;
use crate::hierarchy::NodeId;
use crate::hierarchy::node;
use crate::interval::Interval;
use crate::interval::Span;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a data source.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(std::io::Error),

    /// The source document could not be deserialized.
    Json(serde_json::Error),

    /// A hierarchy node in the source was invalid.
    InvalidNode(node::builder::Error),

    /// A row in the source was invalid.
    InvalidRow(Number, String),

    /// An error raised by a host-provided source.
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::InvalidNode(err) => write!(f, "invalid node: {err}"),
            Error::InvalidRow(index, reason) => write!(f, "invalid row at index {index}: {reason}"),
            Error::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed cursor over the items produced by a source.
pub type Cursor<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

////////////////////////////////////////////////////////////////////////////////////////
// Queries
////////////////////////////////////////////////////////////////////////////////////////

/// A query for raw rows or values.
///
/// A row matches when it belongs to the partition (if one is specified) and
/// falls within the extent of at least one window. The extent of a window is
/// the contiguous run of rows from the lowest-indexed row that overlaps the
/// window to the highest-indexed row that overlaps the window.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Query {
    /// The partition to restrict to, if any.
    partition: Option<Contig>,

    /// The windows.
    windows: Vec<Span>,
}

impl Query {
    /// Creates a new [`Query`].
    pub fn new(partition: Option<Contig>, windows: Vec<Span>) -> Self {
        Self {
            partition,
            windows,
        }
    }

    /// Gets the partition.
    pub fn partition(&self) -> Option<&Contig> {
        self.partition.as_ref()
    }

    /// Gets the windows.
    pub fn windows(&self) -> &[Span] {
        &self.windows
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Records
////////////////////////////////////////////////////////////////////////////////////////

/// A raw row produced by a [`RowSource`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    /// The global index.
    index: Number,

    /// The inclusive start.
    start: Number,

    /// The exclusive end.
    end: Number,

    /// The named metadata values.
    metadata: HashMap<String, String>,

    /// The lineage labels of the leaf the row belongs to.
    lineage_label: Vec<String>,

    /// The lineage identifiers of the leaf the row belongs to.
    lineage: Vec<NodeId>,
}

impl Record {
    /// Creates a new [`Record`] with no metadata.
    pub fn new(index: Number, start: Number, end: Number) -> Self {
        Self {
            index,
            start,
            end,
            ..Default::default()
        }
    }

    /// Adds a metadata value to the record.
    pub fn with_metadata(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(column.into(), value.into());
        self
    }

    /// Sets the lineage of the leaf the record belongs to.
    pub fn with_lineage(mut self, lineage: Vec<NodeId>, lineage_label: Vec<String>) -> Self {
        self.lineage = lineage;
        self.lineage_label = lineage_label;
        self
    }

    /// Gets the global index.
    pub fn index(&self) -> Number {
        self.index
    }

    /// Gets a metadata value by column name.
    pub fn metadata(&self, column: &str) -> Option<&str> {
        self.metadata.get(column).map(|s| s.as_str())
    }

    /// Gets the lineage labels.
    pub fn lineage_label(&self) -> &[String] {
        &self.lineage_label
    }

    /// Gets the lineage identifiers.
    pub fn lineage(&self) -> &[NodeId] {
        &self.lineage
    }
}

impl Interval for Record {
    fn start(&self) -> Number {
        self.start
    }

    fn end(&self) -> Number {
        self.end
    }
}

/// A raw measurement value produced by a [`ValueSource`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRecord {
    /// The global index.
    index: Number,

    /// The inclusive start.
    start: Number,

    /// The exclusive end.
    end: Number,

    /// The value, if one was recorded.
    value: Option<f64>,
}

impl ValueRecord {
    /// Creates a new [`ValueRecord`].
    pub fn new(index: Number, start: Number, end: Number, value: Option<f64>) -> Self {
        Self {
            index,
            start,
            end,
            value,
        }
    }

    /// Gets the global index.
    pub fn index(&self) -> Number {
        self.index
    }

    /// Gets the raw value.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Interval for ValueRecord {
    fn start(&self) -> Number {
        self.start
    }

    fn end(&self) -> Number {
        self.end
    }
}

/// A measurement that values may be requested for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The identifier.
    pub id: String,

    /// The display name.
    #[serde(alias = "name", default)]
    pub label: String,

    /// Free-form annotation.
    #[serde(default)]
    pub annotation: BTreeMap<String, serde_json::Value>,
}

/// The extent of a partition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    /// The partition name (absent for data without partitions).
    pub name: Option<Contig>,

    /// The lowest start of any row in the partition.
    pub start: Number,

    /// The highest end of any row in the partition.
    pub end: Number,
}

////////////////////////////////////////////////////////////////////////////////////////
// Sources
////////////////////////////////////////////////////////////////////////////////////////

/// A source of hierarchy nodes.
pub trait HierarchySource {
    /// Gets the nodes with the given identifiers.
    ///
    /// Identifiers that do not exist are silently absent from the result.
    fn nodes(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, Node>>;

    /// Gets every node that shares a parent with one of `ids`, each of `ids`
    /// themselves, and every node sitting at one of `depths`.
    fn siblings(&self, ids: &[NodeId], depths: &[u32]) -> Result<HashMap<NodeId, Node>>;

    /// Gets the node `root` and every descendant of it down to (and including)
    /// `max_depth`.
    fn subtree(&self, root: &NodeId, max_depth: u32) -> Result<Vec<Node>>;

    /// Gets the label of each level of the hierarchy keyed by depth.
    fn levels(&self) -> Result<BTreeMap<u32, String>>;
}

/// A source of raw rows.
pub trait RowSource {
    /// Gets the names of the metadata columns available on each row.
    fn columns(&self) -> Result<Vec<String>>;

    /// Streams the rows matching `query` in ascending index order.
    fn rows(&self, query: &Query) -> Result<Cursor<'_, Record>>;

    /// Gets the extent of each partition.
    fn partitions(&self) -> Result<Vec<Partition>>;
}

/// A source of raw measurement values.
pub trait ValueSource {
    /// Gets the available measurements.
    fn measurements(&self) -> Result<Vec<Measurement>>;

    /// Whether the measurement exists.
    fn contains_measurement(&self, id: &str) -> Result<bool> {
        Ok(self.measurements()?.iter().any(|m| m.id == id))
    }

    /// Streams the values of `measurement` matching `query` in ascending index
    /// order.
    fn values(&self, measurement: &str, query: &Query) -> Result<Cursor<'_, ValueRecord>>;

    /// Gets the lowest and highest value across every measurement.
    fn value_bounds(&self) -> Result<Option<(f64, f64)>>;
}
