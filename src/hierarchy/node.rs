//! Hierarchy nodes.

pub mod builder;

use nonempty::NonEmpty;
use omics::coordinate::Contig;
use omics::coordinate::position::Number;
use serde::Deserialize;
use serde::Serialize;

pub use builder::Builder;

use crate::hierarchy::NodeId;
use crate::interval::Interval;
use crate::interval::Span;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`SelectionType`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The numeric code does not name a selection type.
    InvalidSelectionType(u8),

    /// The value could not be parsed as a selection type.
    Parse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidSelectionType(code) => {
                write!(f, "invalid selection type code: {code}")
            }
            Error::Parse(value) => write!(f, "could not parse selection type: `{value}`"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////
// Selection types
////////////////////////////////////////////////////////////////////////////////////////

/// How the rows beneath a node are presented.
///
/// On the wire, selection types are transmitted as the integers `0`, `1`, and
/// `2` respectively.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SelectionType {
    /// The subtree is hidden entirely.
    None,

    /// The subtree is expanded and all of its leaves are shown.
    #[default]
    Leaves,

    /// The subtree is collapsed into a single aggregate row.
    Node,
}

impl SelectionType {
    /// Gets the integer code for the selection type.
    pub fn code(&self) -> u8 {
        match self {
            SelectionType::None => 0,
            SelectionType::Leaves => 1,
            SelectionType::Node => 2,
        }
    }

    /// Whether the selection type collapses the subtree in any way (either
    /// hiding it or replacing it with an aggregate row).
    pub fn collapses(&self) -> bool {
        !matches!(self, SelectionType::Leaves)
    }
}

impl TryFrom<u8> for SelectionType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        match code {
            0 => Ok(SelectionType::None),
            1 => Ok(SelectionType::Leaves),
            2 => Ok(SelectionType::Node),
            _ => Err(Error::InvalidSelectionType(code)),
        }
    }
}

impl From<SelectionType> for u8 {
    fn from(value: SelectionType) -> Self {
        value.code()
    }
}

impl std::str::FromStr for SelectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "none" => Ok(SelectionType::None),
            "1" | "leaves" => Ok(SelectionType::Leaves),
            "2" | "node" => Ok(SelectionType::Node),
            _ => Err(Error::Parse(s.to_string())),
        }
    }
}

impl std::fmt::Display for SelectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionType::None => write!(f, "none"),
            SelectionType::Leaves => write!(f, "leaves"),
            SelectionType::Node => write!(f, "node"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Nodes
////////////////////////////////////////////////////////////////////////////////////////

/// A node within the hierarchy.
///
/// A node covers the half-open range `[start, end)` on the coordinate axis
/// and, independently, the leaves `[leaf_index, leaf_index + n_leaves)` in the
/// global row ordering. Nodes are immutable once built except for the selection
/// type and the sibling order, which are overlaid per request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// The identifier.
    id: NodeId,

    /// The display label.
    label: String,

    /// The label of the level this node sits at, if known.
    taxonomy: Option<String>,

    /// The identifier of the parent (absent only for the root).
    parent_id: Option<NodeId>,

    /// The identifiers from the root down to (and including) this node.
    lineage: NonEmpty<NodeId>,

    /// The labels from the root down to (and including) this node.
    lineage_label: Vec<String>,

    /// The partition (e.g., chromosome) the node belongs to, if any.
    partition: Option<Contig>,

    /// The inclusive start on the coordinate axis.
    start: Number,

    /// The exclusive end on the coordinate axis.
    end: Number,

    /// The global index of the first leaf beneath the node.
    leaf_index: Number,

    /// The number of leaves beneath the node.
    n_leaves: Number,

    /// The number of direct children.
    n_children: usize,

    /// The ordering key among siblings.
    order: i64,

    /// The selection type overlaid on the node.
    selection_type: SelectionType,
}

impl Node {
    /// Gets the identifier of the node.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Gets the label of the node.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the depth of the node.
    pub fn depth(&self) -> u32 {
        self.id.depth()
    }

    /// Gets the label of the level this node sits at.
    pub fn taxonomy(&self) -> Option<&str> {
        self.taxonomy.as_deref()
    }

    /// Gets the identifier of the parent node.
    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    /// Gets the lineage of the node from the root down to the node itself.
    pub fn lineage(&self) -> &NonEmpty<NodeId> {
        &self.lineage
    }

    /// Gets the lineage labels of the node from the root down to the node
    /// itself.
    pub fn lineage_label(&self) -> &[String] {
        &self.lineage_label
    }

    /// Gets the partition the node belongs to.
    pub fn partition(&self) -> Option<&Contig> {
        self.partition.as_ref()
    }

    /// Gets the global index of the first leaf beneath the node.
    pub fn leaf_index(&self) -> Number {
        self.leaf_index
    }

    /// Gets the number of leaves beneath the node.
    pub fn n_leaves(&self) -> Number {
        self.n_leaves
    }

    /// Gets the span of leaf indices covered by the node.
    pub fn leaves(&self) -> Span {
        Span::clamped(self.leaf_index, self.leaf_index + self.n_leaves)
    }

    /// Gets the number of direct children of the node.
    pub fn n_children(&self) -> usize {
        self.n_children
    }

    /// Gets the ordering key of the node among its siblings.
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Sets the ordering key of the node among its siblings.
    pub fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    /// Gets the selection type overlaid on the node.
    pub fn selection_type(&self) -> SelectionType {
        self.selection_type
    }

    /// Sets the selection type overlaid on the node.
    pub fn set_selection_type(&mut self, selection_type: SelectionType) {
        self.selection_type = selection_type;
    }

    /// Gets the identifier of the ancestor at `depth`.
    ///
    /// Returns [`None`] when `depth` is deeper than the node itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::node::Builder;
    ///
    /// let node = Builder::default()
    ///     .id("2-4".parse()?)
    ///     .label("leaf")
    ///     .lineage(["0-0".parse()?, "1-1".parse()?, "2-4".parse()?])
    ///     .span(0, 1)
    ///     .leaves(0, 1)
    ///     .try_build()?;
    ///
    /// assert_eq!(node.ancestor_id(1).map(|id| id.as_str()), Some("1-1"));
    /// assert_eq!(node.ancestor_id(2), Some(node.id()));
    /// assert_eq!(node.ancestor_id(3), None);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn ancestor_id(&self, depth: u32) -> Option<&NodeId> {
        if depth > self.depth() {
            return None;
        }

        self.lineage.get(depth as usize)
    }

    /// Gets the label of the ancestor at `depth`.
    ///
    /// Returns [`None`] when `depth` is deeper than the node itself or when
    /// the lineage labels are not known.
    pub fn ancestor_label(&self, depth: u32) -> Option<&str> {
        if depth > self.depth() {
            return None;
        }

        self.lineage_label.get(depth as usize).map(|s| s.as_str())
    }

    /// Gets a named attribute of the node rendered as a string.
    ///
    /// This is used to fill metadata columns for the synthetic rows that stand
    /// in for collapsed nodes.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "label" | "name" => Some(self.label.clone()),
            "depth" => Some(self.depth().to_string()),
            "taxonomy" => self.taxonomy.clone(),
            "parentId" => self.parent_id.as_ref().map(|id| id.to_string()),
            "partition" => self.partition.as_ref().map(|p| (**p).to_string()),
            "leafIndex" => Some(self.leaf_index.to_string()),
            "nleaves" => Some(self.n_leaves.to_string()),
            "nchildren" => Some(self.n_children.to_string()),
            "order" => Some(self.order.to_string()),
            _ => None,
        }
    }
}

impl Interval for Node {
    fn start(&self) -> Number {
        self.start
    }

    fn end(&self) -> Number {
        self.end
    }
}
