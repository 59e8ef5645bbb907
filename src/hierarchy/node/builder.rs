//! A builder for a hierarchy node.

use nonempty::NonEmpty;
use omics::coordinate::Contig;
use omics::coordinate::position::Number;

use crate::hierarchy::Node;
use crate::hierarchy::NodeId;
use crate::hierarchy::SelectionType;
use crate::interval;
use crate::interval::Span;

/// An error that occurs when a required field was never provided to the
/// [`Builder`].
#[derive(Debug)]
pub enum MissingError {
    /// No identifier was provided to the [`Builder`].
    Id,

    /// No label was provided to the [`Builder`].
    Label,

    /// No span was provided to the [`Builder`].
    Span,

    /// No leaf range was provided to the [`Builder`].
    Leaves,
}

impl std::fmt::Display for MissingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingError::Id => write!(f, "id"),
            MissingError::Label => write!(f, "label"),
            MissingError::Span => write!(f, "span"),
            MissingError::Leaves => write!(f, "leaves"),
        }
    }
}

impl std::error::Error for MissingError {}

/// An error that occurs when the fields provided to the [`Builder`] do not
/// agree with one another.
#[derive(Debug)]
pub enum InvalidError {
    /// The span was inverted.
    Span(interval::Error),

    /// The lineage did not end with the node itself.
    Lineage(NodeId),

    /// The lineage does not have one entry per level down to the node.
    LineageLength(NodeId, usize),

    /// The parent does not match the lineage.
    Parent(NodeId),
}

impl std::fmt::Display for InvalidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidError::Span(err) => write!(f, "span: {err}"),
            InvalidError::Lineage(id) => write!(f, "lineage must end with `{id}`"),
            InvalidError::LineageLength(id, len) => write!(
                f,
                "lineage for `{id}` must have {} entries, found {len}",
                id.depth() + 1
            ),
            InvalidError::Parent(id) => {
                write!(f, "parent of `{id}` does not match its lineage")
            }
        }
    }
}

impl std::error::Error for InvalidError {}

/// An error related to a [`Builder`].
#[derive(Debug)]
pub enum Error {
    /// An error where a required field was never provided to the [`Builder`].
    Missing(MissingError),

    /// An error where the fields provided to the [`Builder`] were
    /// inconsistent.
    Invalid(InvalidError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Missing(err) => write!(f, "missing required field: {err}"),
            Error::Invalid(err) => write!(f, "invalid field: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A builder for a [`Node`].
#[derive(Debug, Default)]
pub struct Builder {
    /// The identifier.
    id: Option<NodeId>,

    /// The display label.
    label: Option<String>,

    /// The level label.
    taxonomy: Option<String>,

    /// The parent identifier.
    parent_id: Option<NodeId>,

    /// The lineage identifiers.
    lineage: Option<Vec<NodeId>>,

    /// The lineage labels.
    lineage_label: Vec<String>,

    /// The partition.
    partition: Option<Contig>,

    /// The start and end on the coordinate axis.
    span: Option<(Number, Number)>,

    /// The first leaf index and the number of leaves.
    leaves: Option<(Number, Number)>,

    /// The number of direct children.
    n_children: usize,

    /// The ordering key among siblings.
    order: i64,

    /// The selection type.
    selection_type: SelectionType,
}

impl Builder {
    /// Sets the identifier.
    pub fn id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the display label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the label of the level the node sits at.
    pub fn taxonomy(mut self, taxonomy: impl Into<String>) -> Self {
        self.taxonomy = Some(taxonomy.into());
        self
    }

    /// Sets the parent identifier.
    ///
    /// If no parent is provided, the parent is taken from the lineage.
    pub fn parent_id(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the lineage from the root down to (and including) the node.
    ///
    /// If no lineage is provided, the lineage consists of the node alone.
    pub fn lineage(mut self, lineage: impl IntoIterator<Item = NodeId>) -> Self {
        self.lineage = Some(lineage.into_iter().collect());
        self
    }

    /// Sets the lineage labels from the root down to (and including) the node.
    pub fn lineage_label<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.lineage_label = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the partition.
    pub fn partition(mut self, partition: Contig) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Sets the span on the coordinate axis.
    pub fn span(mut self, start: Number, end: Number) -> Self {
        self.span = Some((start, end));
        self
    }

    /// Sets the first leaf index and the number of leaves.
    pub fn leaves(mut self, leaf_index: Number, n_leaves: Number) -> Self {
        self.leaves = Some((leaf_index, n_leaves));
        self
    }

    /// Sets the number of direct children.
    pub fn n_children(mut self, n_children: usize) -> Self {
        self.n_children = n_children;
        self
    }

    /// Sets the ordering key among siblings.
    pub fn order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    /// Sets the selection type.
    pub fn selection_type(mut self, selection_type: SelectionType) -> Self {
        self.selection_type = selection_type;
        self
    }

    /// Consumes `self` to attempt to build a [`Node`].
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::node::Builder;
    /// use hiertrack::Interval;
    ///
    /// let node = Builder::default()
    ///     .id("1-0".parse()?)
    ///     .label("Firmicutes")
    ///     .lineage(["0-0".parse()?, "1-0".parse()?])
    ///     .span(10, 20)
    ///     .leaves(4, 10)
    ///     .try_build()?;
    ///
    /// assert_eq!(node.depth(), 1);
    /// assert_eq!(node.parent_id().map(|id| id.as_str()), Some("0-0"));
    /// assert_eq!(node.start(), 10);
    /// assert_eq!(node.n_leaves(), 10);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_build(self) -> Result<Node> {
        let id = self.id.ok_or(Error::Missing(MissingError::Id))?;
        let label = self.label.ok_or(Error::Missing(MissingError::Label))?;
        let (start, end) = self.span.ok_or(Error::Missing(MissingError::Span))?;
        let (leaf_index, n_leaves) = self.leaves.ok_or(Error::Missing(MissingError::Leaves))?;

        Span::try_new(start, end).map_err(|err| Error::Invalid(InvalidError::Span(err)))?;

        let lineage = match self.lineage {
            Some(lineage) => NonEmpty::from_vec(lineage)
                .ok_or_else(|| Error::Invalid(InvalidError::Lineage(id.clone())))?,
            None => NonEmpty::new(id.clone()),
        };

        if lineage.last() != &id {
            return Err(Error::Invalid(InvalidError::Lineage(id)));
        }

        // A lineage consisting of the node alone is accepted for any depth
        // so that partial hierarchies can be described.
        if lineage.len() > 1 && lineage.len() != id.depth() as usize + 1 {
            return Err(Error::Invalid(InvalidError::LineageLength(
                id,
                lineage.len(),
            )));
        }

        let parent_from_lineage = lineage
            .len()
            .checked_sub(2)
            .and_then(|i| lineage.get(i))
            .cloned();

        let parent_id = match (self.parent_id, parent_from_lineage) {
            (Some(parent), Some(expected)) if parent != expected => {
                return Err(Error::Invalid(InvalidError::Parent(id)));
            }
            (Some(parent), _) => Some(parent),
            (None, from_lineage) => from_lineage,
        };

        Ok(Node {
            id,
            label,
            taxonomy: self.taxonomy,
            parent_id,
            lineage,
            lineage_label: self.lineage_label,
            partition: self.partition,
            start,
            end,
            leaf_index,
            n_leaves,
            n_children: self.n_children,
            order: self.order,
            selection_type: self.selection_type,
        })
    }
}
