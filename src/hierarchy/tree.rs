//! Nested subtrees of the hierarchy.

use std::collections::HashMap;

use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;

use crate::hierarchy::Node;
use crate::hierarchy::NodeId;
use crate::interval::Interval;
use crate::order::Order;
use crate::selection::Selection;

/// A node of the hierarchy along with its (ordered) children.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subtree {
    /// The node.
    node: Node,

    /// The children in ascending order.
    children: Vec<Subtree>,
}

impl Subtree {
    /// Assembles the subtree rooted at `root` from a flat list of nodes.
    ///
    /// Each node has its selection type resolved through `selection` and its
    /// order replaced by any override in `order`. Siblings are sorted by order
    /// (stably, so ties keep the order in which the nodes were given). Returns
    /// [`None`] when `root` is not among `nodes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::node::Builder;
    /// use hiertrack::hierarchy::SelectionType;
    /// use hiertrack::hierarchy::Subtree;
    /// use hiertrack::order::Order;
    /// use hiertrack::selection::Selection;
    ///
    /// let root = Builder::default()
    ///     .id("0-0".parse()?)
    ///     .label("root")
    ///     .span(0, 2)
    ///     .leaves(0, 2)
    ///     .try_build()?;
    ///
    /// let a = Builder::default()
    ///     .id("1-0".parse()?)
    ///     .label("A")
    ///     .parent_id("0-0".parse()?)
    ///     .span(0, 1)
    ///     .leaves(0, 1)
    ///     .try_build()?;
    ///
    /// let b = Builder::default()
    ///     .id("1-1".parse()?)
    ///     .label("B")
    ///     .parent_id("0-0".parse()?)
    ///     .span(1, 2)
    ///     .leaves(1, 1)
    ///     .order(1)
    ///     .try_build()?;
    ///
    /// let selection = Selection::default().select("1-1".parse()?, SelectionType::Node);
    /// let order = Order::from([("1-1".parse()?, -1)]);
    ///
    /// let tree = Subtree::build(vec![root, a, b], &"0-0".parse()?, &selection, &order).unwrap();
    /// let labels = tree
    ///     .children()
    ///     .iter()
    ///     .map(|child| child.node().label())
    ///     .collect::<Vec<_>>();
    ///
    /// assert_eq!(labels, vec!["B", "A"]);
    /// assert_eq!(tree.children()[0].node().selection_type(), SelectionType::Node);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn build(
        nodes: Vec<Node>,
        root: &NodeId,
        selection: &Selection,
        order: &Order,
    ) -> Option<Self> {
        let mut arena = nodes;

        for node in arena.iter_mut() {
            node.set_selection_type(selection.resolve(node));

            if let Some(&value) = order.get(node.id()) {
                node.set_order(value);
            }
        }

        let root = arena.iter().position(|node| node.id() == root)?;

        let mut children = HashMap::<NodeId, Vec<usize>>::new();

        for (i, node) in arena.iter().enumerate() {
            if let Some(parent) = node.parent_id() {
                children.entry(parent.clone()).or_default().push(i);
            }
        }

        for siblings in children.values_mut() {
            siblings.sort_by_key(|&i| arena[i].order());
        }

        let mut slots = arena.into_iter().map(Some).collect::<Vec<_>>();
        assemble(root, &children, &mut slots)
    }

    /// Wraps the subtree in `parent`, making it the only child.
    pub fn wrap(self, parent: Node) -> Self {
        Self {
            node: parent,
            children: vec![self],
        }
    }

    /// Gets the node at the root of the subtree.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Gets the children.
    pub fn children(&self) -> &[Subtree] {
        &self.children
    }

    /// Gets the number of nodes in the subtree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Subtree::len).sum::<usize>()
    }

    /// Whether the subtree holds no nodes. A subtree always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Assembles the subtree rooted at the node in `slots[index]`.
///
/// Each slot is taken as it is visited, so a malformed parent relationship
/// can never visit a node twice.
fn assemble(
    index: usize,
    children: &HashMap<NodeId, Vec<usize>>,
    slots: &mut [Option<Node>],
) -> Option<Subtree> {
    let node = slots.get_mut(index)?.take()?;

    let children = children
        .get(node.id())
        .map(|indices| {
            indices
                .iter()
                .filter_map(|&i| assemble(i, children, slots))
                .collect()
        })
        .unwrap_or_default();

    Some(Subtree { node, children })
}

impl Serialize for Subtree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let node = &self.node;
        let lineage = node
            .lineage()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", node.id())?;
        map.serialize_entry("label", node.label())?;
        map.serialize_entry("name", node.label())?;
        map.serialize_entry("taxonomy", &node.taxonomy())?;
        map.serialize_entry("depth", &node.depth())?;
        map.serialize_entry("parentId", &node.parent_id())?;
        map.serialize_entry("lineage", &lineage)?;
        map.serialize_entry("lineageLabel", &node.lineage_label().join(","))?;
        map.serialize_entry("partition", &node.partition().map(|p| &**p))?;
        map.serialize_entry("start", &node.start())?;
        map.serialize_entry("end", &node.end())?;
        map.serialize_entry("leafIndex", &node.leaf_index())?;
        map.serialize_entry("nleaves", &node.n_leaves())?;
        map.serialize_entry("nchildren", &node.n_children())?;
        map.serialize_entry("order", &node.order())?;
        map.serialize_entry("selectionType", &node.selection_type())?;
        map.serialize_entry("children", &self.children)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use omics::coordinate::position::Number;

    use crate::hierarchy::SelectionType;
    use crate::hierarchy::node::Builder;

    use super::*;

    fn node(id: &str, parent: Option<&str>, start: Number, end: Number, order: i64) -> Node {
        let mut builder = Builder::default()
            .id(id.parse().unwrap())
            .label(id)
            .span(start, end)
            .leaves(start, end - start)
            .order(order);

        if let Some(parent) = parent {
            builder = builder.parent_id(parent.parse().unwrap());
        }

        builder.try_build().unwrap()
    }

    fn nodes() -> Vec<Node> {
        vec![
            node("0-0", None, 0, 4, 0),
            node("1-0", Some("0-0"), 0, 2, 0),
            node("1-1", Some("0-0"), 2, 4, 1),
            node("2-0", Some("1-0"), 0, 1, 0),
            node("2-1", Some("1-0"), 1, 2, 1),
            node("2-2", Some("1-1"), 2, 4, 0),
        ]
    }

    fn labels(tree: &Subtree) -> Vec<&str> {
        tree.children().iter().map(|c| c.node().label()).collect()
    }

    #[test]
    fn it_assembles_a_subtree() -> Result<(), Box<dyn std::error::Error>> {
        let tree = Subtree::build(nodes(), &"0-0".parse()?, &Selection::default(), &Order::new())
            .unwrap();

        assert_eq!(tree.len(), 6);
        assert_eq!(labels(&tree), vec!["1-0", "1-1"]);
        assert_eq!(labels(&tree.children()[0]), vec!["2-0", "2-1"]);
        assert_eq!(labels(&tree.children()[1]), vec!["2-2"]);

        Ok(())
    }

    #[test]
    fn it_assembles_from_an_inner_root() -> Result<(), Box<dyn std::error::Error>> {
        let tree = Subtree::build(nodes(), &"1-0".parse()?, &Selection::default(), &Order::new())
            .unwrap();

        assert_eq!(tree.len(), 3);
        assert!(
            Subtree::build(nodes(), &"3-0".parse()?, &Selection::default(), &Order::new())
                .is_none()
        );

        let parent = node("0-0", None, 0, 4, 0);
        let wrapped = tree.wrap(parent);
        assert_eq!(wrapped.len(), 4);
        assert_eq!(wrapped.node().id().as_str(), "0-0");

        Ok(())
    }

    #[test]
    fn it_overlays_selection_and_order() -> Result<(), Box<dyn std::error::Error>> {
        let selection = Selection::default().select_level(2, SelectionType::None);
        let order = Order::from([("2-1".parse()?, -5)]);

        let tree = Subtree::build(nodes(), &"0-0".parse()?, &selection, &order).unwrap();
        let first = &tree.children()[0];

        assert_eq!(labels(first), vec!["2-1", "2-0"]);
        assert_eq!(first.children()[0].node().order(), -5);
        assert_eq!(first.children()[0].node().selection_type(), SelectionType::None);
        assert_eq!(first.node().selection_type(), SelectionType::Leaves);

        Ok(())
    }

    #[test]
    fn it_serializes_nested_children() -> Result<(), Box<dyn std::error::Error>> {
        let tree = Subtree::build(nodes(), &"1-1".parse()?, &Selection::default(), &Order::new())
            .unwrap();

        let value = serde_json::to_value(&tree)?;
        assert_eq!(value["id"], "1-1");
        assert_eq!(value["parentId"], "0-0");
        assert_eq!(value["selectionType"], 1);
        assert_eq!(value["children"][0]["id"], "2-2");
        assert_eq!(value["children"][0]["children"], serde_json::json!([]));

        Ok(())
    }
}
