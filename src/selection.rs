//! Resolution of a client selection into canonical collapse nodes.
//!
//! A client selects nodes (and, optionally, whole levels) of the hierarchy as
//! either collapsed ([`SelectionType::Node`]) or hidden
//! ([`SelectionType::None`]). Resolving a selection does three things:
//!
//! 1. The selected nodes are fetched, and nodes whose resolved type is
//!    [`SelectionType::Leaves`] (the default) are dropped.
//! 2. The remaining nodes are canonicalized: any node contained in a kept
//!    ancestor is discarded so that the kept nodes are disjoint and sorted.
//! 3. Each kept node is assigned the output index its synthetic row will take,
//!    and a running count of the raw indices removed so far is kept so that
//!    any raw index can be remapped into the compacted output space.

use std::collections::HashMap;

use omics::coordinate::position::Number;
use tracing::debug;

use crate::hierarchy::Node;
use crate::hierarchy::NodeId;
use crate::hierarchy::SelectionType;
use crate::interval::Interval;
use crate::interval::Span;
use crate::order::Order;
use crate::source;
use crate::source::HierarchySource;

////////////////////////////////////////////////////////////////////////////////////////
// Selections
////////////////////////////////////////////////////////////////////////////////////////

/// A client selection.
///
/// A level selection applies to every node at that depth and takes precedence
/// over a selection of an individual node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Selection {
    /// The selection type of individual nodes.
    by_id: HashMap<NodeId, SelectionType>,

    /// The selection type of every node at a depth.
    by_level: HashMap<u32, SelectionType>,
}

impl Selection {
    /// Creates a selection from individual node selections and level
    /// selections.
    pub fn new(
        by_id: HashMap<NodeId, SelectionType>,
        by_level: HashMap<u32, SelectionType>,
    ) -> Self {
        Self { by_id, by_level }
    }

    /// Selects an individual node.
    pub fn select(mut self, id: NodeId, selection_type: SelectionType) -> Self {
        self.by_id.insert(id, selection_type);
        self
    }

    /// Selects every node at `depth`.
    pub fn select_level(mut self, depth: u32, selection_type: SelectionType) -> Self {
        self.by_level.insert(depth, selection_type);
        self
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_level.is_empty()
    }

    /// Iterates over the individually selected node identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.by_id.keys()
    }

    /// Gets the individual node selections.
    pub fn by_id(&self) -> &HashMap<NodeId, SelectionType> {
        &self.by_id
    }

    /// Gets the level selections.
    pub fn by_level(&self) -> &HashMap<u32, SelectionType> {
        &self.by_level
    }

    /// Gets the depths selected with a type other than
    /// [`SelectionType::Leaves`] in ascending order.
    pub fn collapsed_levels(&self) -> Vec<u32> {
        let mut depths = self
            .by_level
            .iter()
            .filter(|(_, kind)| kind.collapses())
            .map(|(&depth, _)| depth)
            .collect::<Vec<_>>();

        depths.sort_unstable();
        depths
    }

    /// Resolves the selection type of `node`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::node::Builder;
    /// use hiertrack::hierarchy::SelectionType;
    /// use hiertrack::selection::Selection;
    ///
    /// let node = Builder::default()
    ///     .id("2-1".parse()?)
    ///     .label("G")
    ///     .span(0, 4)
    ///     .leaves(0, 4)
    ///     .try_build()?;
    ///
    /// let selection = Selection::default();
    /// assert_eq!(selection.resolve(&node), SelectionType::Leaves);
    ///
    /// let selection = selection.select("2-1".parse()?, SelectionType::Node);
    /// assert_eq!(selection.resolve(&node), SelectionType::Node);
    ///
    /// let selection = selection.select_level(2, SelectionType::None);
    /// assert_eq!(selection.resolve(&node), SelectionType::None);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn resolve(&self, node: &Node) -> SelectionType {
        self.by_level
            .get(&node.depth())
            .or_else(|| self.by_id.get(node.id()))
            .copied()
            .unwrap_or_default()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Canonicalization
////////////////////////////////////////////////////////////////////////////////////////

/// Canonicalizes a set of selected nodes.
///
/// The nodes are sorted by start (shallower nodes first on ties) and every
/// node that ends at or before the end of the previously kept node is
/// discarded. The kept nodes are therefore disjoint with strictly increasing
/// ends. Canonicalizing an already canonical set leaves it unchanged.
pub fn canonicalize(nodes: impl IntoIterator<Item = Node>) -> Vec<Node> {
    let mut nodes = nodes.into_iter().collect::<Vec<_>>();

    nodes.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then_with(|| a.depth().cmp(&b.depth()))
            .then_with(|| a.id().cmp(b.id()))
    });

    let mut kept: Vec<Node> = Vec::with_capacity(nodes.len());

    for node in nodes {
        match kept.last() {
            Some(previous) if node.end() <= previous.end() => {
                debug!(
                    id = %node.id(),
                    ancestor = %previous.id(),
                    "selection contained in a selected ancestor"
                );
            }
            _ => kept.push(node),
        }
    }

    kept
}

////////////////////////////////////////////////////////////////////////////////////////
// Resolution
////////////////////////////////////////////////////////////////////////////////////////

/// A canonical selected node along with its place in the output index space.
#[derive(Clone, Debug, PartialEq)]
pub struct Selected {
    /// The node, with its resolved selection type overlaid.
    node: Node,

    /// The output index of the synthetic row for the node.
    index: Number,

    /// The number of raw indices removed before the node.
    collapse_before: Number,

    /// The number of raw indices removed up to and including the node.
    collapse_after: Number,
}

impl Selected {
    /// Gets the node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Gets the resolved selection type.
    pub fn kind(&self) -> SelectionType {
        self.node.selection_type()
    }

    /// Gets the output index of the synthetic row for the node.
    ///
    /// Only meaningful for [`SelectionType::Node`] selections.
    pub fn index(&self) -> Number {
        self.index
    }

    /// Gets the number of raw indices removed before the node.
    pub fn collapse_before(&self) -> Number {
        self.collapse_before
    }

    /// Gets the number of raw indices removed up to and including the node.
    pub fn collapse_after(&self) -> Number {
        self.collapse_after
    }
}

impl Interval for Selected {
    fn start(&self) -> Number {
        self.node.start()
    }

    fn end(&self) -> Number {
        self.node.end()
    }
}

/// A resolved selection for a query range.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// The canonical selected nodes in ascending order.
    selected: Vec<Selected>,

    /// The query range.
    range: Span,

    /// The number of raw indices removed before the first selected node that
    /// ends after the start of the range.
    start_collapse: Number,

    /// Every node fetched while resolving.
    nodes: HashMap<NodeId, Node>,
}

impl Resolution {
    /// Resolves `selection` over the already fetched `nodes`.
    pub fn new(selection: &Selection, nodes: HashMap<NodeId, Node>, range: Span) -> Self {
        let chosen = nodes.values().filter_map(|node| {
            let kind = selection.resolve(node);

            kind.collapses().then(|| {
                let mut node = node.clone();
                node.set_selection_type(kind);
                node
            })
        });

        let mut collapse: Number = 0;

        let selected = canonicalize(chosen)
            .into_iter()
            .map(|node| {
                let collapse_before = collapse;
                let index = node.leaf_index().saturating_sub(collapse_before);

                collapse += node.n_leaves();

                if node.selection_type() == SelectionType::Node {
                    collapse = collapse.saturating_sub(1);
                }

                Selected {
                    node,
                    index,
                    collapse_before,
                    collapse_after: collapse,
                }
            })
            .collect::<Vec<_>>();

        Self {
            selected,
            range,
            start_collapse: 0,
            nodes,
        }
        .with_range(range)
    }

    /// Moves the resolution to a different query range.
    pub fn with_range(mut self, range: Span) -> Self {
        self.range = range;

        let first = self.first_pending();
        self.start_collapse = match self.selected.get(first) {
            Some(selected) => selected.collapse_before,
            None => self
                .selected
                .last()
                .map(|selected| selected.collapse_after)
                .unwrap_or_default(),
        };

        self
    }

    /// Gets the query range.
    pub fn range(&self) -> Span {
        self.range
    }

    /// Gets every canonical selected node, including those outside the range.
    pub fn selected(&self) -> &[Selected] {
        &self.selected
    }

    /// Gets the canonical selected nodes that end after the start of the
    /// range.
    pub fn pending(&self) -> &[Selected] {
        &self.selected[self.first_pending()..]
    }

    /// Iterates over the canonical selected nodes that overlap the range.
    pub fn collapse_nodes(&self) -> impl Iterator<Item = &Selected> {
        let range = self.range;

        self.pending()
            .iter()
            .take_while(move |selected| selected.start() < range.end())
    }

    /// Gets the number of raw indices removed before the range.
    pub fn start_collapse(&self) -> Number {
        self.start_collapse
    }

    /// Gets every node fetched while resolving.
    pub fn nodes(&self) -> &HashMap<NodeId, Node> {
        &self.nodes
    }

    /// Remaps a raw index into the compacted output index space.
    ///
    /// Returns [`None`] for a raw index beneath a hidden node. Every raw index
    /// beneath a collapsed node maps to the index of its synthetic row.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    ///
    /// use hiertrack::hierarchy::node::Builder;
    /// use hiertrack::hierarchy::SelectionType;
    /// use hiertrack::selection::Resolution;
    /// use hiertrack::selection::Selection;
    /// use hiertrack::Span;
    ///
    /// let node = Builder::default()
    ///     .id("2-26".parse()?)
    ///     .label("G")
    ///     .span(100, 105)
    ///     .leaves(10, 5)
    ///     .try_build()?;
    ///
    /// let selection = Selection::default().select(node.id().clone(), SelectionType::Node);
    /// let nodes = HashMap::from([(node.id().clone(), node)]);
    /// let resolution = Resolution::new(&selection, nodes, Span::try_new(90, 120)?);
    ///
    /// assert_eq!(resolution.remap(9), Some(9));
    /// assert_eq!(resolution.remap(10), Some(10));
    /// assert_eq!(resolution.remap(14), Some(10));
    /// assert_eq!(resolution.remap(15), Some(11));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn remap(&self, raw: Number) -> Option<Number> {
        let after = self
            .selected
            .partition_point(|selected| selected.node.leaf_index() <= raw);

        let Some(selected) = after.checked_sub(1).map(|i| &self.selected[i]) else {
            return Some(raw);
        };

        if raw < selected.node.leaves().end() {
            return match selected.kind() {
                SelectionType::Node => Some(selected.index),
                _ => None,
            };
        }

        Some(raw.saturating_sub(selected.collapse_after))
    }

    /// Computes the windows of the range not covered by an excluded selected
    /// node.
    ///
    /// Raw rows need only be read from these windows, as everything else is
    /// either hidden or replaced by a synthetic row.
    pub fn windows(&self, exclude: impl Fn(SelectionType) -> bool) -> Vec<Span> {
        let mut windows = Vec::new();
        let mut cursor = self.range.start();

        for selected in self.collapse_nodes().filter(|s| exclude(s.kind())) {
            let window = Span::clamped(cursor, selected.start());

            if !window.is_empty() {
                windows.push(window);
            }

            cursor = cursor.max(selected.end());
        }

        let window = Span::clamped(cursor, self.range.end());

        if !window.is_empty() {
            windows.push(window);
        }

        windows
    }

    /// Computes the range widened to cover every collapsed node overlapping
    /// it.
    pub fn widened(&self) -> Span {
        self.collapse_nodes()
            .filter(|selected| selected.kind() == SelectionType::Node)
            .fold(self.range, |range, selected| {
                Span::clamped(
                    range.start().min(selected.start()),
                    range.end().max(selected.end()),
                )
            })
    }

    /// Gets the position of the first selected node that ends after the start
    /// of the range.
    fn first_pending(&self) -> usize {
        let start = self.range.start();
        self.selected
            .partition_point(|selected| selected.end() <= start)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Resolver
////////////////////////////////////////////////////////////////////////////////////////

/// Resolves selections against a hierarchy source.
#[derive(Debug)]
pub struct Resolver<'a, L: ?Sized> {
    /// The hierarchy source.
    lookup: &'a L,
}

impl<'a, L: HierarchySource + ?Sized> Resolver<'a, L> {
    /// Creates a new [`Resolver`].
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Resolves `selection` (and fetches the nodes `order` will need) over
    /// `range`.
    ///
    /// Every selected and ordered node is fetched along with its siblings and,
    /// for level selections, every node at the selected depths. Identifiers the
    /// source does not know are dropped.
    pub fn resolve(
        &self,
        selection: &Selection,
        order: &Order,
        range: Span,
    ) -> source::Result<Resolution> {
        let mut ids = selection
            .ids()
            .chain(order.keys())
            .cloned()
            .collect::<Vec<_>>();

        ids.sort();
        ids.dedup();

        let depths = selection.collapsed_levels();

        let nodes = match ids.is_empty() && depths.is_empty() {
            true => HashMap::new(),
            false => self.lookup.siblings(&ids, &depths)?,
        };

        for id in ids.iter().filter(|id| !nodes.contains_key(*id)) {
            debug!(id = %id, "selected node not found; dropping it");
        }

        Ok(Resolution::new(selection, nodes, range))
    }
}
