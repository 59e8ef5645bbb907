//! A columnar collection of emitted rows.

use omics::coordinate::position::Number;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;

use crate::collection::Reorder;
use crate::collection::Result;
use crate::collection::check;
use crate::collection::lay_out;
use crate::hierarchy::Node;
use crate::interval::Interval;
use crate::interval::Span;
use crate::order::Permutation;
use crate::source::Record;

/// The name of the column holding the lineage of each row.
pub const LINEAGE_COLUMN: &str = "lineage";

/// The separator between identifiers in the lineage column.
pub const LINEAGE_SEPARATOR: &str = ",";

////////////////////////////////////////////////////////////////////////////////////////
// Options
////////////////////////////////////////////////////////////////////////////////////////

/// The layout of a [`RowCollection`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    /// The metadata columns to carry.
    metadata: Vec<String>,

    /// The level labels in order of depth. Each level becomes a column holding
    /// the ancestor label at that depth.
    levels: Vec<String>,

    /// Whether indices are sent over the wire.
    store_index: bool,

    /// Whether ends are sent over the wire.
    store_end: bool,

    /// Whether starts and ends are sent as deltas.
    use_offset: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            metadata: Vec::new(),
            levels: Vec::new(),
            store_index: true,
            store_end: true,
            use_offset: false,
        }
    }
}

impl Options {
    /// Creates new [`Options`] carrying the given metadata columns and level
    /// labels.
    pub fn new(metadata: Vec<String>, levels: Vec<String>) -> Self {
        Self {
            metadata,
            levels,
            ..Default::default()
        }
    }

    /// Sets whether indices are sent over the wire.
    pub fn store_index(mut self, value: bool) -> Self {
        self.store_index = value;
        self
    }

    /// Sets whether ends are sent over the wire.
    pub fn store_end(mut self, value: bool) -> Self {
        self.store_end = value;
        self
    }

    /// Sets whether starts and ends are sent as deltas from the previous row.
    pub fn use_offset(mut self, value: bool) -> Self {
        self.use_offset = value;
        self
    }

    /// Gets the metadata columns.
    pub fn metadata(&self) -> &[String] {
        &self.metadata
    }

    /// Gets the level labels.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Rows
////////////////////////////////////////////////////////////////////////////////////////

/// A view of a single row within a [`RowCollection`].
#[derive(Debug)]
pub struct Row<'a> {
    /// The collection.
    collection: &'a RowCollection,

    /// The position of the row within the collection.
    position: usize,
}

impl Row<'_> {
    /// Gets the index of the row.
    pub fn index(&self) -> Number {
        self.collection.index[self.position]
    }

    /// Gets the value of a metadata column (or a level column) for the row.
    pub fn metadata(&self, column: &str) -> Option<&str> {
        self.collection
            .column(column)
            .and_then(|values| values[self.position].as_deref())
    }

    /// Gets the span of raw leaf indices the row stands in for.
    pub fn leaves(&self) -> Span {
        self.collection.leaves[self.position]
    }
}

impl Interval for Row<'_> {
    fn start(&self) -> Number {
        self.collection.start[self.position]
    }

    fn end(&self) -> Number {
        self.collection.end[self.position]
    }
}

/// A columnar collection of rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowCollection {
    /// The layout.
    options: Options,

    /// The index of the first row.
    global_start_index: Option<Number>,

    /// The index of each row.
    index: Vec<Number>,

    /// The start of each row.
    start: Vec<Number>,

    /// The end of each row.
    end: Vec<Number>,

    /// The values of each metadata column.
    metadata: Vec<Vec<Option<String>>>,

    /// The values of each level column.
    levels: Vec<Vec<Option<String>>>,

    /// The lineage of each row.
    lineage: Vec<Option<String>>,

    /// The span of raw leaf indices each row stands in for.
    leaves: Vec<Span>,
}

impl RowCollection {
    /// Creates a new, empty [`RowCollection`].
    pub fn new(options: Options) -> Self {
        let metadata = vec![Vec::new(); options.metadata.len()];
        let levels = vec![Vec::new(); options.levels.len()];

        Self {
            options,
            metadata,
            levels,
            ..Default::default()
        }
    }

    /// Gets the layout of the collection.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Gets the number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the collection holds no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Gets the index of the first row.
    pub fn global_start_index(&self) -> Option<Number> {
        self.global_start_index
    }

    /// Gets the index of each row, if indices are stored.
    pub fn indices(&self) -> Option<&[Number]> {
        self.options.store_index.then_some(&self.index[..])
    }

    /// Gets the start of each row.
    pub fn starts(&self) -> &[Number] {
        &self.start
    }

    /// Gets the end of each row, if ends are stored.
    pub fn ends(&self) -> Option<&[Number]> {
        self.options.store_end.then_some(&self.end[..])
    }

    /// Gets the values of a metadata column, a level column, or the lineage
    /// column.
    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        if let Some(i) = self.options.metadata.iter().position(|c| c == name) {
            return Some(self.metadata[i].as_slice());
        }

        if let Some(i) = self.options.levels.iter().position(|c| c == name) {
            return Some(self.levels[i].as_slice());
        }

        (name == LINEAGE_COLUMN && !self.options.levels.is_empty()).then_some(&self.lineage[..])
    }

    /// Gets a view of the row at `position`.
    pub fn get(&self, position: usize) -> Option<Row<'_>> {
        (position < self.len()).then_some(Row {
            collection: self,
            position,
        })
    }

    /// Iterates over the rows.
    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.len()).map(move |position| Row {
            collection: self,
            position,
        })
    }

    /// Pushes a raw row into the collection at `index`.
    pub fn push_record(&mut self, index: Number, record: &Record) {
        let lineage = record
            .lineage()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>();

        self.push(
            index,
            record.start(),
            record.end(),
            Span::unit(record.index()),
            |column| record.metadata(column).map(String::from),
            |depth| record.lineage_label().get(depth).cloned(),
            (!lineage.is_empty()).then(|| lineage.join(LINEAGE_SEPARATOR)),
        );
    }

    /// Pushes a synthetic row standing in for a collapsed node into the
    /// collection at `index`.
    pub fn push_node(&mut self, index: Number, node: &Node) {
        let lineage = node
            .lineage()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(LINEAGE_SEPARATOR);

        self.push(
            index,
            node.start(),
            node.end(),
            node.leaves(),
            |column| node.attribute(column),
            |depth| {
                u32::try_from(depth)
                    .ok()
                    .and_then(|depth| node.ancestor_label(depth))
                    .map(String::from)
            },
            Some(lineage),
        );
    }

    /// Pushes a row into every column of the collection.
    #[allow(clippy::too_many_arguments)]
    fn push<M, L>(
        &mut self,
        index: Number,
        start: Number,
        end: Number,
        leaves: Span,
        metadata: M,
        level: L,
        lineage: Option<String>,
    ) where
        M: Fn(&str) -> Option<String>,
        L: Fn(usize) -> Option<String>,
    {
        if self.global_start_index.is_none() {
            self.global_start_index = Some(index);
        }

        self.index.push(index);
        self.start.push(start);
        self.end.push(end);
        self.leaves.push(leaves);

        for (column, values) in self.options.metadata.iter().zip(self.metadata.iter_mut()) {
            values.push(metadata(column));
        }

        for (depth, values) in self.levels.iter_mut().enumerate() {
            values.push(level(depth));
        }

        if !self.options.levels.is_empty() {
            self.lineage.push(lineage);
        }
    }

    /// Gets the starts as they are sent over the wire.
    pub fn encoded_starts(&self) -> Vec<i64> {
        encode(&self.start, self.options.use_offset)
    }

    /// Gets the ends as they are sent over the wire, if ends are stored.
    pub fn encoded_ends(&self) -> Option<Vec<i64>> {
        self.options
            .store_end
            .then(|| encode(&self.end, self.options.use_offset))
    }
}

impl Reorder for RowCollection {
    fn leaves(&self) -> &[Span] {
        &self.leaves
    }

    fn reorder(&self, permutation: &Permutation) -> Result<Self> {
        check(permutation, self.len())?;

        let Some(global_start_index) = self.global_start_index else {
            return Ok(self.clone());
        };

        let origin = self.start.first().copied().unwrap_or_default();
        let widths = permutation.iter().map(|&i| match self.options.store_end {
            true => self.end[i].saturating_sub(self.start[i]),
            false => 1,
        });

        let (start, end) = lay_out(origin, widths);
        let pick = |values: &Vec<Option<String>>| {
            permutation
                .iter()
                .map(|&i| values[i].clone())
                .collect::<Vec<_>>()
        };

        Ok(Self {
            options: self.options.clone(),
            global_start_index: Some(global_start_index),
            index: (0..self.len() as Number)
                .map(|k| global_start_index + k)
                .collect(),
            start,
            end,
            metadata: self.metadata.iter().map(pick).collect(),
            levels: self.levels.iter().map(pick).collect(),
            lineage: match self.lineage.is_empty() {
                true => Vec::new(),
                false => pick(&self.lineage),
            },
            leaves: permutation.iter().map(|&i| self.leaves[i]).collect(),
        })
    }
}

/// Encodes positions for the wire, optionally as deltas from the previous
/// position.
fn encode(values: &[Number], use_offset: bool) -> Vec<i64> {
    let mut previous = 0i64;

    values
        .iter()
        .map(|&value| {
            let value = value as i64;

            match use_offset {
                true => {
                    let delta = value - previous;
                    previous = value;
                    delta
                }
                false => value,
            }
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////////////
// Serialization
////////////////////////////////////////////////////////////////////////////////////////

/// The `values` object of a serialized [`RowCollection`].
struct Values<'a>(&'a RowCollection);

/// The `metadata` object of a serialized [`RowCollection`].
struct Metadata<'a>(&'a RowCollection);

impl Serialize for RowCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("globalStartIndex", &self.global_start_index)?;
        map.serialize_entry("useOffset", &self.options.use_offset)?;
        map.serialize_entry("values", &Values(self))?;
        map.end()
    }
}

impl Serialize for Values<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let collection = self.0;
        let mut map = serializer.serialize_map(None)?;

        if let Some(indices) = collection.indices() {
            map.serialize_entry("index", indices)?;
        }

        map.serialize_entry("start", &collection.encoded_starts())?;

        if let Some(ends) = collection.encoded_ends() {
            map.serialize_entry("end", &ends)?;
        }

        map.serialize_entry("metadata", &Metadata(collection))?;
        map.end()
    }
}

impl Serialize for Metadata<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let collection = self.0;
        let mut map = serializer.serialize_map(None)?;

        for (column, values) in collection
            .options
            .metadata
            .iter()
            .zip(collection.metadata.iter())
        {
            map.serialize_entry(column, values)?;
        }

        for (label, values) in collection.options.levels.iter().zip(collection.levels.iter()) {
            map.serialize_entry(label, values)?;
        }

        if !collection.options.levels.is_empty() {
            map.serialize_entry(LINEAGE_COLUMN, &collection.lineage)?;
        }

        map.end()
    }
}

#[cfg(test)]
mod tests {
    use crate::hierarchy::node::Builder;

    use super::*;

    fn record(index: Number, label: &str) -> Record {
        Record::new(index, index * 10, index * 10 + 10)
            .with_metadata("label", label)
            .with_lineage(
                vec!["0-0".parse().unwrap(), "1-0".parse().unwrap()],
                vec![String::from("root"), String::from("A")],
            )
    }

    fn node() -> Node {
        Builder::default()
            .id("1-1".parse().unwrap())
            .label("B")
            .lineage(["0-0".parse().unwrap(), "1-1".parse().unwrap()])
            .lineage_label(["root", "B"])
            .span(20, 40)
            .leaves(2, 2)
            .try_build()
            .unwrap()
    }

    fn collection() -> RowCollection {
        let options = Options::new(
            vec![String::from("id"), String::from("label")],
            vec![String::from("kingdom"), String::from("phylum")],
        );

        let mut rows = RowCollection::new(options);
        rows.push_record(5, &record(0, "a"));
        rows.push_record(6, &record(1, "b"));
        rows.push_node(7, &node());
        rows
    }

    #[test]
    fn it_collects_rows_column_wise() {
        let rows = collection();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows.global_start_index(), Some(5));
        assert_eq!(rows.indices(), Some(&[5, 6, 7][..]));
        assert_eq!(rows.starts(), &[0, 10, 20]);
        assert_eq!(rows.ends(), Some(&[10, 20, 40][..]));

        assert_eq!(
            rows.column("label"),
            Some(&[Some("a".into()), Some("b".into()), Some("B".into())][..])
        );
        assert_eq!(
            rows.column("id"),
            Some(&[None, None, Some("1-1".into())][..])
        );
        assert_eq!(
            rows.column("phylum"),
            Some(&[Some("A".into()), Some("A".into()), Some("B".into())][..])
        );
        assert_eq!(
            rows.column(LINEAGE_COLUMN),
            Some(&[Some("0-0,1-0".into()), Some("0-0,1-0".into()), Some("0-0,1-1".into())][..])
        );
        assert_eq!(rows.column("missing"), None);

        let row = rows.get(2).unwrap();
        assert_eq!(row.index(), 7);
        assert_eq!(row.metadata("kingdom"), Some("root"));
        assert_eq!(row.leaves(), Span::try_new(2, 4).unwrap());
        assert!(rows.get(3).is_none());
    }

    #[test]
    fn it_encodes_offsets() {
        assert_eq!(encode(&[5, 7, 7, 12], true), vec![5, 2, 0, 5]);
        assert_eq!(encode(&[5, 7, 7, 12], false), vec![5, 7, 7, 12]);
    }

    #[test]
    fn it_serializes_to_the_wire_format() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let options = Options::new(vec![String::from("label")], Vec::new())
            .store_end(false)
            .use_offset(true);

        let mut rows = RowCollection::new(options);
        rows.push_record(3, &record(3, "a"));
        rows.push_record(4, &record(4, "b"));

        let value = serde_json::to_value(&rows)?;
        assert_eq!(
            value,
            serde_json::json!({
                "globalStartIndex": 3,
                "useOffset": true,
                "values": {
                    "index": [3, 4],
                    "start": [30, 10],
                    "metadata": { "label": ["a", "b"] }
                }
            })
        );

        let empty = serde_json::to_value(RowCollection::new(Options::default()))?;
        assert_eq!(empty["globalStartIndex"], serde_json::Value::Null);
        assert_eq!(empty["values"]["start"], serde_json::json!([]));

        Ok(())
    }

    #[test]
    fn it_reorders_rows() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let rows = collection();
        let permutation = Permutation::try_new(vec![2, 0, 1])?;

        let reordered = rows.reorder(&permutation)?;
        assert_eq!(reordered.indices(), Some(&[5, 6, 7][..]));
        assert_eq!(reordered.starts(), &[0, 20, 30]);
        assert_eq!(reordered.ends(), Some(&[20, 30, 40][..]));
        assert_eq!(
            reordered.column("label"),
            Some(&[Some("B".into()), Some("a".into()), Some("b".into())][..])
        );
        assert_eq!(reordered.leaves()[0], Span::try_new(2, 4)?);

        assert!(rows.reorder(&Permutation::identity(2)).is_err());

        Ok(())
    }
}
