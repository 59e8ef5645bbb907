//! Reordering of emitted rows according to per-branch order overrides.
//!
//! A request may override the order of any set of nodes among their siblings.
//! Reordering happens in three steps:
//!
//! 1. The nodes whose order may change are gathered with [`order_nodes()`]:
//!    every node sharing a parent with an overridden node, carrying its
//!    overridden order (or its stored order otherwise).
//! 2. An [`OrderedIntervalTree`] is built over those nodes, covering the
//!    entire leaf axis with fillers wherever no node sits.
//! 3. Each emitted entry is located in the tree by the leaves it stands in
//!    for, and the tree is walked in sibling order to produce a
//!    [`Permutation`] of the entries.

pub mod tree;

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::debug;

pub use tree::OrderedIntervalTree;

use crate::collection;
use crate::collection::Reorder;
use crate::hierarchy::Node;
use crate::hierarchy::NodeId;

/// Order overrides keyed by node.
pub type Order = HashMap<NodeId, i64>;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to ordering.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The values do not form a permutation of `0..n`.
    NotAPermutation(Vec<usize>),

    /// A permutation could not be applied to a collection.
    Collection(collection::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotAPermutation(values) => write!(f, "not a permutation: {values:?}"),
            Error::Collection(err) => write!(f, "collection error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Permutations
////////////////////////////////////////////////////////////////////////////////////////

/// A permutation of `0..n`.
///
/// Position `k` of the permutation holds the original position of the entry
/// that moves to `k`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Creates the identity permutation of `0..n`.
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Attempts to create a [`Permutation`] from its values.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::order::Permutation;
    ///
    /// let permutation = Permutation::try_new(vec![2, 0, 1])?;
    /// assert_eq!(permutation.len(), 3);
    ///
    /// assert!(Permutation::try_new(vec![0, 0, 1]).is_err());
    /// assert!(Permutation::try_new(vec![0, 3]).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(values: Vec<usize>) -> Result<Self> {
        let mut seen = vec![false; values.len()];

        let valid = values.iter().all(|&value| match seen.get_mut(value) {
            Some(seen) if !*seen => {
                *seen = true;
                true
            }
            _ => false,
        });

        match valid {
            true => Ok(Self(values)),
            false => Err(Error::NotAPermutation(values)),
        }
    }

    /// Gets the number of entries permuted.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the permutation is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the permutation leaves every entry in place.
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(k, &i)| k == i)
    }

    /// Iterates over the original positions in their new order.
    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    /// Gets the values of the permutation.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Gets the permutation that undoes this one.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::order::Permutation;
    ///
    /// let permutation = Permutation::try_new(vec![2, 0, 1])?;
    /// assert_eq!(permutation.inverse().as_slice(), &[1, 2, 0]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.0.len()];

        for (k, &i) in self.0.iter().enumerate() {
            inverse[i] = k;
        }

        Self(inverse)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Ordering
////////////////////////////////////////////////////////////////////////////////////////

/// Gathers the nodes whose order may change under `order`.
///
/// These are every node in `nodes` whose parent is also the parent of an
/// overridden node. Each carries its overridden order, or its stored order if
/// it was not overridden. Overrides for nodes missing from `nodes`, and for
/// the root, are ignored.
pub fn order_nodes(order: &Order, nodes: &HashMap<NodeId, Node>) -> Vec<Node> {
    let parents = order
        .keys()
        .filter_map(|id| match nodes.get(id) {
            Some(node) => node.parent_id(),
            None => {
                debug!(id = %id, "order override for unknown node ignored");
                None
            }
        })
        .collect::<HashSet<_>>();

    let mut result = nodes
        .values()
        .filter(|node| node.parent_id().is_some_and(|p| parents.contains(p)))
        .cloned()
        .map(|mut node| {
            if let Some(&value) = order.get(node.id()) {
                node.set_order(value);
            }

            node
        })
        .collect::<Vec<_>>();

    result.sort_by(|a, b| a.id().cmp(b.id()));
    result
}

/// Reorders `collection` according to `nodes` (as gathered by
/// [`order_nodes()`]).
///
/// When there are no nodes to order, the collection is returned unchanged.
pub fn reorder<C: Reorder + Clone>(collection: &C, nodes: Vec<Node>) -> Result<C> {
    if nodes.is_empty() {
        return Ok(collection.clone());
    }

    OrderedIntervalTree::new(nodes).reorder(collection)
}

#[cfg(test)]
mod tests {
    use crate::hierarchy::node::Builder;

    use super::*;

    fn node(id: &str, parent: &str, leaf_index: u64, n_leaves: u64, order: i64) -> Node {
        Builder::default()
            .id(id.parse().unwrap())
            .label(id)
            .parent_id(parent.parse().unwrap())
            .span(leaf_index, leaf_index + n_leaves)
            .leaves(leaf_index, n_leaves)
            .order(order)
            .try_build()
            .unwrap()
    }

    #[test]
    fn it_gathers_the_siblings_of_overridden_nodes() {
        let nodes = [
            node("1-0", "0-0", 0, 2, 0),
            node("1-1", "0-0", 2, 2, 1),
            node("2-0", "1-0", 0, 1, 0),
            node("2-1", "1-0", 1, 1, 1),
        ]
        .into_iter()
        .map(|n| (n.id().clone(), n))
        .collect::<HashMap<_, _>>();

        let order = Order::from([("1-0".parse().unwrap(), 5), ("9-9".parse().unwrap(), 1)]);

        let result = order_nodes(&order, &nodes);
        let summary = result
            .iter()
            .map(|n| (n.id().as_str(), n.order()))
            .collect::<Vec<_>>();

        assert_eq!(summary, vec![("1-0", 5), ("1-1", 1)]);
    }

    #[test]
    fn it_validates_permutations() {
        assert!(Permutation::try_new(vec![]).is_ok());
        assert!(Permutation::identity(4).is_identity());
        assert!(!Permutation::try_new(vec![1, 0]).unwrap().is_identity());
        assert_eq!(
            Permutation::try_new(vec![1, 1]),
            Err(Error::NotAPermutation(vec![1, 1]))
        );
    }
}
