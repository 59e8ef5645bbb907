//! An interval tree whose children can be reordered.
//!
//! The tree partitions the leaf axis. Its internal entries are the nodes whose
//! sibling order may change, nested the way the hierarchy nests them. Every
//! stretch of the axis not covered by one of those nodes is covered by a
//! filler entry, so that each position of the axis belongs to exactly one
//! childless entry.
//!
//! ```text
//! root [0, ∞)
//! ├── filler [0, 2)
//! ├── P [2, 6)
//! │   ├── C1 [2, 4)    order 1
//! │   └── C2 [4, 6)    order 0
//! └── filler [6, ∞)
//! ```
//!
//! Reordering the tree above swaps `C1` and `C2` while every other stretch
//! stays where it was.

use std::collections::HashMap;

use omics::coordinate::position::Number;
use tracing::debug;

use crate::collection::Reorder;
use crate::hierarchy::Node;
use crate::hierarchy::NodeId;
use crate::interval::Interval;
use crate::interval::Span;
use crate::order::Error;
use crate::order::Permutation;
use crate::order::Result;

/// The position of the root entry within the arena.
const ROOT: usize = 0;

////////////////////////////////////////////////////////////////////////////////////////
// Extents
////////////////////////////////////////////////////////////////////////////////////////

/// A stretch of the leaf axis that may be unbounded above.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extent {
    /// The inclusive start.
    start: Number,

    /// The exclusive end, or [`None`] if the extent is unbounded.
    end: Option<Number>,
}

impl Extent {
    /// The extent covering the entire axis.
    const EVERYTHING: Extent = Extent {
        start: 0,
        end: None,
    };

    /// Gets the inclusive start.
    pub fn start(&self) -> Number {
        self.start
    }

    /// Gets the exclusive end, if the extent is bounded.
    pub fn end(&self) -> Option<Number> {
        self.end
    }

    /// Gets the length, if the extent is bounded.
    pub fn len(&self) -> Option<Number> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    /// Whether the extent is bounded and covers no positions.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Whether the extent fully contains `span`.
    fn contains(&self, span: &Span) -> bool {
        self.start <= span.start() && self.end.map_or(true, |end| span.end() <= end)
    }

    /// Whether the extent lies entirely before `span`.
    fn before(&self, span: &Span) -> bool {
        self.end.is_some_and(|end| end <= span.start())
    }

    /// Whether the extent lies entirely after `span`.
    fn after(&self, span: &Span) -> bool {
        self.start >= span.end()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Boundaries
////////////////////////////////////////////////////////////////////////////////////////

/// The kind of a boundary.
///
/// Ends sort before starts so that a node ending exactly where its sibling
/// starts is closed before the sibling is opened.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Kind {
    /// The exclusive end of a node.
    End,

    /// The inclusive start of a node.
    Start,
}

/// One side of the extent of a node.
#[derive(Clone, Copy, Debug)]
struct Boundary {
    /// The position on the leaf axis.
    position: Number,

    /// Which side of the node this is.
    kind: Kind,

    /// The depth of the node.
    depth: u32,

    /// The arena entry for the node.
    entry: usize,
}

////////////////////////////////////////////////////////////////////////////////////////
// Tree
////////////////////////////////////////////////////////////////////////////////////////

/// An entry within the tree.
#[derive(Clone, Debug)]
struct Entry {
    /// The node, or [`None`] for the root and for fillers.
    node: Option<Node>,

    /// The extent in original coordinates.
    extent: Extent,

    /// The parent entry.
    parent: Option<usize>,

    /// The child entries in original order.
    children: Vec<usize>,
}

impl Entry {
    /// Creates an entry without a node.
    fn filler(extent: Extent) -> Self {
        Self {
            node: None,
            extent,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// An interval tree whose children are reordered by their sibling order.
#[derive(Clone, Debug)]
pub struct OrderedIntervalTree {
    /// The entries, with the root first.
    entries: Vec<Entry>,

    /// The child entries of each entry in sibling order.
    ordered: Vec<Vec<usize>>,

    /// The extent of each entry after reordering.
    placements: Vec<Extent>,
}

impl OrderedIntervalTree {
    /// Builds the tree over `nodes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::node::Builder;
    /// use hiertrack::order::OrderedIntervalTree;
    /// use hiertrack::Span;
    ///
    /// let a = Builder::default()
    ///     .id("1-0".parse()?)
    ///     .label("A")
    ///     .parent_id("0-0".parse()?)
    ///     .span(0, 2)
    ///     .leaves(0, 2)
    ///     .order(1)
    ///     .try_build()?;
    ///
    /// let b = Builder::default()
    ///     .id("1-1".parse()?)
    ///     .label("B")
    ///     .parent_id("0-0".parse()?)
    ///     .span(2, 4)
    ///     .leaves(2, 2)
    ///     .order(0)
    ///     .try_build()?;
    ///
    /// let tree = OrderedIntervalTree::new(vec![a, b]);
    /// let rows = (0..4).map(Span::unit).collect::<Vec<_>>();
    ///
    /// assert_eq!(tree.permutation(&rows).as_slice(), &[2, 3, 0, 1]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut entries = vec![Entry::filler(Extent::EVERYTHING)];
        let mut boundaries = Vec::with_capacity(nodes.len() * 2);

        for node in nodes {
            if node.n_leaves() == 0 {
                debug!(id = %node.id(), "node without leaves cannot be ordered");
                continue;
            }

            let leaves = node.leaves();
            let depth = node.depth();
            let entry = entries.len();

            entries.push(Entry {
                node: Some(node),
                extent: Extent {
                    start: leaves.start(),
                    end: Some(leaves.end()),
                },
                parent: None,
                children: Vec::new(),
            });

            boundaries.push(Boundary {
                position: leaves.start(),
                kind: Kind::Start,
                depth,
                entry,
            });

            boundaries.push(Boundary {
                position: leaves.end(),
                kind: Kind::End,
                depth,
                entry,
            });
        }

        boundaries.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| match a.kind {
                    // Outer nodes open first and close last.
                    Kind::Start => a.depth.cmp(&b.depth),
                    Kind::End => b.depth.cmp(&a.depth),
                })
        });

        // (1) Sweep the boundaries, nesting nodes and filling the gaps.
        let mut stack = vec![ROOT];
        let mut last: Option<Number> = None;

        for (i, boundary) in boundaries.iter().enumerate() {
            let top = stack.last().copied().unwrap_or(ROOT);

            match last {
                None => {
                    let filler = Extent {
                        start: 0,
                        end: Some(boundary.position),
                    };

                    attach_filler(&mut entries, top, filler);
                }
                Some(end) if boundary.position > end => {
                    // The stretch between the two sides of a childless node
                    // belongs to the node itself.
                    let own = i > 0 && boundaries[i - 1].entry == boundary.entry;

                    if !own {
                        let filler = Extent {
                            start: end,
                            end: Some(boundary.position),
                        };

                        attach_filler(&mut entries, top, filler);
                    }
                }
                _ => {}
            }

            last = Some(boundary.position);

            match boundary.kind {
                Kind::Start => {
                    attach(&mut entries, top, boundary.entry);
                    stack.push(boundary.entry);
                }
                Kind::End => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
            }
        }

        // (2) Cover the remainder of the axis.
        let tail = Extent {
            start: last.unwrap_or_default(),
            end: None,
        };

        attach_filler(&mut entries, ROOT, tail);

        // (3) Sort the children of each entry by their sibling order.
        let ordered = (0..entries.len())
            .map(|at| order_children(&entries, at))
            .collect::<Vec<_>>();

        // (4) Lay out the children of each entry in their new order.
        let mut placements = vec![Extent::EVERYTHING; entries.len()];
        place(&entries, &ordered, ROOT, &mut placements);

        Self {
            entries,
            ordered,
            placements,
        }
    }

    /// Gets the extent of the node `id` after reordering.
    pub fn placement(&self, id: &NodeId) -> Option<Extent> {
        self.entries
            .iter()
            .position(|entry| entry.node.as_ref().is_some_and(|node| node.id() == id))
            .map(|at| self.placements[at])
    }

    /// Computes the permutation that reorders `intervals`.
    ///
    /// Each interval is attached to the deepest entry that fully contains it.
    /// An interval straddling several children of an entry is attached to the
    /// first of those children. The tree is then walked in sibling order,
    /// producing the intervals attached to each entry ahead of those attached
    /// to its children.
    pub fn permutation<I: Interval>(&self, intervals: &[I]) -> Permutation {
        let mut attached = vec![Vec::new(); self.entries.len()];
        let mut last = ROOT;

        for (i, interval) in intervals.iter().enumerate() {
            let span = Span::clamped(interval.start(), interval.end().max(interval.start() + 1));

            // Search from the most recently found entry, climbing out until
            // the interval is contained.
            let mut at = last;

            while !self.entries[at].extent.contains(&span) {
                match self.entries[at].parent {
                    Some(parent) => at = parent,
                    None => break,
                }
            }

            let found = self.locate(at, &span);
            attached[found].push(i);
            last = found;
        }

        let mut result = Vec::with_capacity(intervals.len());
        self.flatten(ROOT, &attached, &mut result);

        Permutation(result)
    }

    /// Reorders `collection`.
    pub fn reorder<C: Reorder>(&self, collection: &C) -> Result<C> {
        let permutation = self.permutation(collection.leaves());
        collection.reorder(&permutation).map_err(Error::Collection)
    }

    /// Descends from `at` to the deepest entry containing `span`.
    fn locate(&self, at: usize, span: &Span) -> usize {
        let children = &self.entries[at].children;

        let found = children.binary_search_by(|&child| {
            let extent = &self.entries[child].extent;

            if extent.after(span) {
                std::cmp::Ordering::Greater
            } else if extent.before(span) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        });

        let Ok(mut i) = found else {
            return at;
        };

        let child = children[i];

        if self.entries[child].extent.contains(span) {
            return self.locate(child, span);
        }

        while i > 0 && !self.entries[children[i - 1]].extent.before(span) {
            i -= 1;
        }

        children[i]
    }

    /// Appends the intervals attached beneath `at` in sibling order.
    fn flatten(&self, at: usize, attached: &[Vec<usize>], result: &mut Vec<usize>) {
        result.extend_from_slice(&attached[at]);

        for &child in &self.ordered[at] {
            self.flatten(child, attached, result);
        }
    }
}

/// Attaches the existing entry `child` beneath `parent`.
fn attach(entries: &mut [Entry], parent: usize, child: usize) {
    entries[child].parent = Some(parent);
    entries[parent].children.push(child);
}

/// Creates a filler entry covering `extent` beneath `parent`.
fn attach_filler(entries: &mut Vec<Entry>, parent: usize, extent: Extent) {
    let child = entries.len();
    entries.push(Entry::filler(extent));
    attach(entries, parent, child);
}

/// Sorts the children of `at` by their sibling order.
///
/// Children are only sorted against children that share the same hierarchy
/// parent. The sorted members of each such group take over the slots the group
/// occupied, so fillers and unrelated nodes keep their original slots. The sort
/// is stable, so equal orders keep their original relative position.
fn order_children(entries: &[Entry], at: usize) -> Vec<usize> {
    let children = &entries[at].children;
    let mut ordered = children.clone();
    let mut groups = HashMap::<&NodeId, Vec<usize>>::new();

    for (slot, &child) in children.iter().enumerate() {
        if let Some(parent) = entries[child].node.as_ref().and_then(|node| node.parent_id()) {
            groups.entry(parent).or_default().push(slot);
        }
    }

    for slots in groups.values() {
        let mut members = slots.iter().map(|&slot| children[slot]).collect::<Vec<_>>();
        members.sort_by_key(|&member| {
            entries[member]
                .node
                .as_ref()
                .map(|node| node.order())
                .unwrap_or_default()
        });

        for (&slot, member) in slots.iter().zip(members) {
            ordered[slot] = member;
        }
    }

    ordered
}

/// Lays out the children of `at` contiguously from the placement of `at`.
fn place(entries: &[Entry], ordered: &[Vec<usize>], at: usize, placements: &mut [Extent]) {
    let mut cursor = placements[at].start;

    for &child in &ordered[at] {
        let end = entries[child].extent.len().map(|len| cursor + len);

        placements[child] = Extent { start: cursor, end };
        place(entries, ordered, child, placements);

        cursor = end.unwrap_or(cursor);
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    use crate::hierarchy::node::Builder;

    use super::*;

    fn node(id: &str, parent: &str, leaf_index: u64, n_leaves: u64, order: i64) -> Node {
        Builder::default()
            .id(id.parse().unwrap())
            .label(id)
            .parent_id(parent.parse().unwrap())
            .span(leaf_index * 10, (leaf_index + n_leaves) * 10)
            .leaves(leaf_index, n_leaves)
            .order(order)
            .try_build()
            .unwrap()
    }

    fn units(n: u64) -> Vec<Span> {
        (0..n).map(Span::unit).collect()
    }

    #[test]
    fn it_swaps_two_siblings() {
        let tree = OrderedIntervalTree::new(vec![
            node("1-0", "0-0", 0, 2, 2),
            node("1-1", "0-0", 2, 2, 1),
        ]);

        assert_eq!(tree.permutation(&units(4)).as_slice(), &[2, 3, 0, 1]);

        let a = tree.placement(&"1-0".parse().unwrap()).unwrap();
        assert_eq!((a.start(), a.end()), (2, Some(4)));

        let b = tree.placement(&"1-1".parse().unwrap()).unwrap();
        assert_eq!((b.start(), b.end()), (0, Some(2)));
    }

    #[test]
    fn it_keeps_sorted_siblings_in_place() {
        let tree = OrderedIntervalTree::new(vec![
            node("1-0", "0-0", 0, 2, -1),
            node("1-1", "0-0", 2, 2, 0),
        ]);

        assert!(tree.permutation(&units(4)).is_identity());
    }

    #[test]
    fn it_fills_the_gaps_around_ordered_nodes() {
        let tree = OrderedIntervalTree::new(vec![
            node("2-0", "1-0", 2, 2, 1),
            node("2-1", "1-0", 4, 2, 0),
        ]);

        assert_eq!(
            tree.permutation(&units(8)).as_slice(),
            &[0, 1, 4, 5, 2, 3, 6, 7]
        );
    }

    #[test]
    fn it_fills_gaps_between_non_adjacent_siblings() {
        let tree = OrderedIntervalTree::new(vec![
            node("2-0", "1-0", 0, 2, 1),
            node("2-1", "1-0", 4, 2, 0),
        ]);

        // The filler covering leaves 2 and 3 stays between the two swapped
        // siblings.
        assert_eq!(
            tree.permutation(&units(6)).as_slice(),
            &[4, 5, 2, 3, 0, 1]
        );
    }

    #[test]
    fn it_reorders_nested_groups_independently() {
        let tree = OrderedIntervalTree::new(vec![
            node("1-0", "0-0", 0, 4, 1),
            node("1-1", "0-0", 4, 2, 0),
            node("2-0", "1-0", 0, 2, 1),
            node("2-1", "1-0", 2, 2, 0),
        ]);

        assert_eq!(
            tree.permutation(&units(6)).as_slice(),
            &[4, 5, 2, 3, 0, 1]
        );
    }

    #[test]
    fn it_moves_collapsed_rows_with_their_node() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let tree = OrderedIntervalTree::new(vec![
            node("1-0", "0-0", 0, 2, 1),
            node("1-1", "0-0", 2, 3, 0),
        ]);

        // Leaves 0 and 1 are raw rows, leaves 2 through 4 are a single
        // collapsed row.
        let rows = vec![Span::unit(0), Span::unit(1), Span::try_new(2, 5)?];
        assert_eq!(tree.permutation(&rows).as_slice(), &[2, 0, 1]);

        Ok(())
    }

    #[test]
    fn it_attaches_straddling_intervals_to_their_first_child()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let tree = OrderedIntervalTree::new(vec![
            node("2-0", "1-0", 0, 2, 1),
            node("2-1", "1-0", 2, 2, 0),
            node("2-2", "1-9", 4, 2, 0),
        ]);

        // The first interval spans the whole of `1-0` (a collapsed parent),
        // which straddles both ordered children.
        let rows = vec![Span::try_new(0, 4)?, Span::unit(4), Span::unit(5)];
        assert_eq!(tree.permutation(&rows).as_slice(), &[0, 1, 2]);

        Ok(())
    }

    #[test]
    fn it_ignores_nodes_without_leaves() {
        let tree = OrderedIntervalTree::new(vec![
            node("1-0", "0-0", 0, 0, 5),
            node("1-1", "0-0", 0, 2, 1),
            node("1-2", "0-0", 2, 1, 0),
        ]);

        assert_eq!(tree.permutation(&units(3)).as_slice(), &[2, 0, 1]);
    }

    #[test]
    fn it_always_produces_a_permutation() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..100 {
            // A root with a random number of children, each with a random
            // number of children of its own.
            let mut nodes = Vec::new();
            let mut leaf = rng.gen_range(0..3);

            for i in 0..rng.gen_range(1..5) {
                let id = format!("1-{i:x}");
                let start = leaf;

                for j in 0..rng.gen_range(1..4) {
                    let n = rng.gen_range(1..4);
                    nodes.push(node(
                        &format!("2-{i:x}{j:x}"),
                        &id,
                        leaf,
                        n,
                        rng.gen_range(-3..3),
                    ));
                    leaf += n;
                }

                nodes.push(node(&id, "0-0", start, leaf - start, rng.gen_range(-3..3)));
            }

            nodes.shuffle(&mut rng);

            let total = leaf + rng.gen_range(0..3);
            let tree = OrderedIntervalTree::new(nodes.clone());
            let permutation = tree.permutation(&units(total));

            let mut sorted = permutation.as_slice().to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..total as usize).collect::<Vec<_>>());

            // Applying the inverse recovers the original sequence.
            let original = (0..total).collect::<Vec<_>>();
            let moved = permutation
                .iter()
                .map(|&i| original[i])
                .collect::<Vec<_>>();
            let restored = permutation
                .inverse()
                .iter()
                .map(|&k| moved[k])
                .collect::<Vec<_>>();
            assert_eq!(restored, original);

            // The leaves of every node remain contiguous.
            for node in &nodes {
                let leaves = node.leaves();
                let positions = permutation
                    .iter()
                    .enumerate()
                    .filter(|(_, &i)| leaves.contains(&Span::unit(i as u64)))
                    .map(|(k, _)| k)
                    .collect::<Vec<_>>();

                let first = positions[0];
                assert_eq!(
                    positions,
                    (first..first + positions.len()).collect::<Vec<_>>()
                );
            }
        }
    }
}
