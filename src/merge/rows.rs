//! Merging of raw rows.

use tracing::trace;

use crate::collection::RowCollection;
use crate::collection::row::Options;
use crate::hierarchy::SelectionType;
use crate::interval::Interval;
use crate::merge::Boundaries;
use crate::selection::Resolution;
use crate::source;
use crate::source::Record;

/// Merges a stream of raw rows with a resolved selection.
///
/// Each collapsed node produces one synthetic row at its remapped index,
/// emitted before any raw row that starts at or past the end of the node.
/// Raw rows beneath a selected node are skipped, and every other raw row is
/// shifted down by the number of raw indices removed before it.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use hiertrack::collection::row::Options;
/// use hiertrack::hierarchy::node::Builder;
/// use hiertrack::hierarchy::SelectionType;
/// use hiertrack::merge::merge_rows;
/// use hiertrack::selection::Resolution;
/// use hiertrack::selection::Selection;
/// use hiertrack::source::Record;
/// use hiertrack::Span;
///
/// let node = Builder::default()
///     .id("1-0".parse()?)
///     .label("A")
///     .span(1, 3)
///     .leaves(1, 2)
///     .try_build()?;
///
/// let selection = Selection::default().select(node.id().clone(), SelectionType::Node);
/// let nodes = HashMap::from([(node.id().clone(), node)]);
/// let resolution = Resolution::new(&selection, nodes, Span::try_new(0, 4)?);
///
/// let records = [Record::new(0, 0, 1), Record::new(3, 3, 4)].map(Ok);
/// let rows = merge_rows(records, &resolution, Options::default())?;
///
/// assert_eq!(rows.indices(), Some(&[0, 1, 2][..]));
/// assert_eq!(rows.starts(), &[0, 1, 3]);
/// assert_eq!(rows.ends(), Some(&[1, 3, 4][..]));
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn merge_rows<I>(
    records: I,
    resolution: &Resolution,
    options: Options,
) -> source::Result<RowCollection>
where
    I: IntoIterator<Item = source::Result<Record>>,
{
    let mut rows = RowCollection::new(options);
    let mut boundaries = Boundaries::new(resolution);

    for record in records {
        let record = record?;

        while let Some(selected) = boundaries.passed(record.start()) {
            if selected.kind() == SelectionType::Node {
                rows.push_node(selected.index(), selected.node());
            }
        }

        if let Some(selected) = boundaries.containing(&record) {
            trace!(
                index = record.index(),
                node = %selected.node().id(),
                "skipping row beneath a selected node"
            );
            continue;
        }

        let index = record.index().saturating_sub(boundaries.collapse());
        rows.push_record(index, &record);
    }

    while let Some(selected) = boundaries.remaining() {
        if selected.kind() == SelectionType::Node {
            rows.push_node(selected.index(), selected.node());
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use omics::coordinate::position::Number;

    use crate::hierarchy::Node;
    use crate::hierarchy::node::Builder;
    use crate::interval::Span;
    use crate::selection::Selection;

    use super::*;

    fn node(id: &str, start: Number, end: Number, leaf_index: Number) -> Node {
        Builder::default()
            .id(id.parse().unwrap())
            .label(id)
            .span(start, end)
            .leaves(leaf_index, end - start)
            .try_build()
            .unwrap()
    }

    /// One raw row per unit position, with indices equal to positions.
    fn records(start: Number, end: Number) -> Vec<source::Result<Record>> {
        (start..end).map(|i| Ok(Record::new(i, i, i + 1))).collect()
    }

    fn resolve(
        nodes: Vec<Node>,
        selection: &Selection,
        start: Number,
        end: Number,
    ) -> Resolution {
        let nodes = nodes
            .into_iter()
            .map(|node| (node.id().clone(), node))
            .collect::<HashMap<_, _>>();

        Resolution::new(selection, nodes, Span::try_new(start, end).unwrap())
    }

    #[test]
    fn it_emits_a_synthetic_row_for_a_collapsed_node()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        // Raw rows sit at positions 90..120 with raw indices 0..30, and the
        // node covers raw indices 10..15 at positions 100..105.
        let selection = Selection::default().select("2-26".parse()?, SelectionType::Node);
        let resolution = resolve(vec![node("2-26", 100, 105, 10)], &selection, 90, 120);

        let records = (90..120)
            .filter(|position| !(100..105).contains(position))
            .map(|position| Ok(Record::new(position - 90, position, position + 1)))
            .collect::<Vec<_>>();

        let rows = merge_rows(records, &resolution, Options::default())?;
        assert_eq!(rows.len(), 26);

        let indices = rows.indices().unwrap();
        assert_eq!(&indices[..11], &(0..11).collect::<Vec<_>>()[..]);
        assert_eq!(indices[11], 11);
        assert_eq!(indices[25], 25);

        // (1) The synthetic row takes index 10 and spans the node.
        assert_eq!(rows.starts()[10], 100);
        assert_eq!(rows.ends().unwrap()[10], 105);
        assert_eq!(rows.get(10).unwrap().leaves(), Span::try_new(10, 15)?);

        // (2) The rows after the node are shifted down by four.
        assert_eq!(rows.starts()[11], 105);
        assert_eq!(rows.get(11).unwrap().leaves(), Span::unit(15));

        Ok(())
    }

    #[test]
    fn it_ignores_leaves_selections() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let selection = Selection::default().select("1-0".parse()?, SelectionType::Leaves);
        let resolution = resolve(vec![node("1-0", 2, 5, 2)], &selection, 0, 8);

        let rows = merge_rows(records(0, 8), &resolution, Options::default())?;
        assert_eq!(rows.indices(), Some(&[0, 1, 2, 3, 4, 5, 6, 7][..]));

        Ok(())
    }

    #[test]
    fn it_hides_rows_beneath_hidden_nodes() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let selection = Selection::default().select("1-0".parse()?, SelectionType::None);
        let resolution = resolve(vec![node("1-0", 2, 5, 2)], &selection, 0, 8);

        // Rows beneath the node are skipped even when the source returns them.
        let rows = merge_rows(records(0, 8), &resolution, Options::default())?;
        assert_eq!(rows.indices(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(rows.starts(), &[0, 1, 5, 6, 7]);

        Ok(())
    }

    #[test]
    fn it_flushes_collapsed_nodes_at_the_tail() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let selection = Selection::default()
            .select("1-0".parse()?, SelectionType::Node)
            .select("1-1".parse()?, SelectionType::Node);

        let resolution = resolve(
            vec![node("1-0", 4, 6, 4), node("1-1", 10, 12, 10)],
            &selection,
            0,
            8,
        );

        let rows = merge_rows(records(0, 4), &resolution, Options::default())?;
        assert_eq!(rows.indices(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(rows.starts(), &[0, 1, 2, 3, 4]);
        assert_eq!(rows.ends(), Some(&[1, 2, 3, 4, 6][..]));

        Ok(())
    }

    #[test]
    fn it_carries_collapse_from_before_the_range()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let selection = Selection::default().select("1-0".parse()?, SelectionType::Node);
        let resolution = resolve(vec![node("1-0", 0, 4, 0)], &selection, 6, 9);

        let rows = merge_rows(records(6, 9), &resolution, Options::default())?;
        assert_eq!(rows.global_start_index(), Some(3));
        assert_eq!(rows.indices(), Some(&[3, 4, 5][..]));

        Ok(())
    }

    #[test]
    fn it_propagates_source_errors() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let resolution = resolve(Vec::new(), &Selection::default(), 0, 2);
        let records = vec![
            Ok(Record::new(0, 0, 1)),
            Err(source::Error::InvalidRow(1, String::from("bad"))),
        ];

        let err = merge_rows(records, &resolution, Options::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid row at index 1: bad");

        Ok(())
    }
}
