//! Merging of raw measurement values.

use tracing::debug;

use crate::aggregate::Aggregator;
use crate::collection::ValueCollection;
use crate::collection::value::normalize;
use crate::hierarchy::SelectionType;
use crate::interval::Interval;
use crate::interval::Span;
use crate::merge::Boundaries;
use crate::selection::Resolution;
use crate::selection::Selected;
use crate::source;
use crate::source::ValueRecord;

/// Merges a stream of raw values with a resolved selection.
///
/// This follows the shape of [`merge_rows()`](super::merge_rows), except that
/// every raw value lying beneath a collapsed node is buffered and reduced by
/// `aggregator` into the single value emitted for that node. Values are
/// normalized (see [`normalize()`]) before they are buffered or emitted.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use hiertrack::aggregate::Average;
/// use hiertrack::hierarchy::node::Builder;
/// use hiertrack::hierarchy::SelectionType;
/// use hiertrack::merge::merge_values;
/// use hiertrack::selection::Resolution;
/// use hiertrack::selection::Selection;
/// use hiertrack::source::ValueRecord;
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
/// let records = [
///     ValueRecord::new(0, 0, 1, Some(1.0)),
///     ValueRecord::new(1, 1, 2, Some(2.0)),
///     ValueRecord::new(2, 2, 3, None),
///     ValueRecord::new(3, 3, 4, Some(4.0)),
/// ]
/// .map(Ok);
///
/// let values = merge_values(records, &resolution, &Average)?;
/// assert_eq!(values.values(), &[1.0, 1.0, 4.0]);
/// assert_eq!(values.indices(), &[0, 1, 2]);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn merge_values<I>(
    records: I,
    resolution: &Resolution,
    aggregator: &dyn Aggregator,
) -> source::Result<ValueCollection>
where
    I: IntoIterator<Item = source::Result<ValueRecord>>,
{
    let mut values = ValueCollection::default();
    let mut boundaries = Boundaries::new(resolution);
    let mut buffer = Vec::new();

    for record in records {
        let record = record?;

        while let Some(selected) = boundaries.passed(record.start()) {
            flush(&mut values, selected, &mut buffer, aggregator);
        }

        if let Some(selected) = boundaries.containing(&record) {
            if selected.kind() == SelectionType::Node {
                buffer.push(normalize(record.value()));
            }

            continue;
        }

        values.push(
            normalize(record.value()),
            record.index().saturating_sub(boundaries.collapse()),
            Span::clamped(record.start(), record.end()),
            Span::unit(record.index()),
        );
    }

    while let Some(selected) = boundaries.remaining() {
        flush(&mut values, selected, &mut buffer, aggregator);
    }

    Ok(values)
}

/// Emits the aggregated value for a passed node (if it is collapsed) and
/// clears the buffer.
fn flush(
    values: &mut ValueCollection,
    selected: &Selected,
    buffer: &mut Vec<f64>,
    aggregator: &dyn Aggregator,
) {
    if selected.kind() == SelectionType::Node {
        let node = selected.node();

        if buffer.is_empty() {
            debug!(
                node = %node.id(),
                aggregator = aggregator.id(),
                "no values beneath collapsed node"
            );
        }

        values.push(
            normalize(Some(aggregator.aggregate(buffer))),
            selected.index(),
            Span::clamped(node.start(), node.end()),
            node.leaves(),
        );
    }

    buffer.clear();
}
