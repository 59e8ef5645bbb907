//! An in-memory dataset read from a JSON document.
//!
//! The document has the following shape (every top-level key other than
//! `nodes` is optional):
//!
//! ```json
//! {
//!   "name": "my-dataset",
//!   "levels": ["root", "phylum", "genus"],
//!   "nodes": [
//!     { "id": "0-0", "label": "root", "start": 0, "end": 10, "leafIndex": 0, "nleaves": 10 }
//!   ],
//!   "rows": [
//!     { "index": 0, "partition": "chr1", "start": 0, "end": 1, "metadata": { "id": "2-0" } }
//!   ],
//!   "measurements": [{ "id": "sample1", "label": "Sample 1" }],
//!   "values": { "sample1": [[0, 1.25], [1, null]] }
//! }
//! ```
//!
//! Rows are joined to the hierarchy through their `id` metadata column, which
//! names the leaf node the row belongs to. Documents may be gzipped when read
//! with [`Dataset::from_path()`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use omics::coordinate::Contig;
use omics::coordinate::position::Number;
use rust_lapper as lapper;
use serde::Deserialize;
use tracing::debug;

use crate::hierarchy::Node;
use crate::hierarchy::NodeId;
use crate::hierarchy::node;
use crate::interval::Interval;
use crate::source::Cursor;
use crate::source::Error;
use crate::source::HierarchySource;
use crate::source::Measurement;
use crate::source::Partition;
use crate::source::Query;
use crate::source::Record;
use crate::source::Result;
use crate::source::RowSource;
use crate::source::ValueRecord;
use crate::source::ValueSource;

/// The name given to a dataset that does not name itself.
pub const DEFAULT_NAME: &str = "dataset";

/// The inner value of the row lookup data structure.
type Iv = lapper::Interval<Number, usize>;

////////////////////////////////////////////////////////////////////////////////////////
// Document
////////////////////////////////////////////////////////////////////////////////////////

/// A hierarchy node as it appears in the document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeEntry {
    /// The identifier.
    id: NodeId,

    /// The display label.
    label: String,

    /// The level label.
    #[serde(default)]
    taxonomy: Option<String>,

    /// The parent identifier.
    #[serde(default)]
    parent_id: Option<NodeId>,

    /// The lineage identifiers.
    #[serde(default)]
    lineage: Option<Vec<NodeId>>,

    /// The lineage labels.
    #[serde(default)]
    lineage_label: Vec<String>,

    /// The partition.
    #[serde(default)]
    partition: Option<String>,

    /// The inclusive start.
    start: Number,

    /// The exclusive end.
    end: Number,

    /// The first leaf index.
    leaf_index: Number,

    /// The number of leaves.
    #[serde(rename = "nleaves")]
    n_leaves: Number,

    /// The number of direct children.
    #[serde(rename = "nchildren", default)]
    n_children: usize,

    /// The ordering key among siblings.
    #[serde(default)]
    order: i64,
}

/// A row as it appears in the document.
#[derive(Debug, Deserialize)]
struct RowEntry {
    /// The global index.
    index: Number,

    /// The partition.
    #[serde(default)]
    partition: Option<String>,

    /// The inclusive start.
    start: Number,

    /// The exclusive end. A row without an end covers a single position.
    #[serde(default)]
    end: Option<Number>,

    /// The metadata values.
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

/// The document a [`Dataset`] is read from.
#[derive(Debug, Deserialize)]
struct Document {
    /// The dataset name.
    #[serde(default)]
    name: Option<String>,

    /// The level labels in order of depth.
    #[serde(default)]
    levels: Vec<String>,

    /// The hierarchy nodes.
    nodes: Vec<NodeEntry>,

    /// The rows.
    #[serde(default)]
    rows: Vec<RowEntry>,

    /// The measurements.
    #[serde(default)]
    measurements: Vec<Measurement>,

    /// The values of each measurement as `[index, value]` pairs.
    #[serde(default)]
    values: HashMap<String, Vec<(Number, Option<f64>)>>,
}

////////////////////////////////////////////////////////////////////////////////////////
// Dataset
////////////////////////////////////////////////////////////////////////////////////////

/// An in-memory dataset.
#[derive(Debug)]
pub struct Dataset {
    /// The dataset name.
    name: String,

    /// The level labels in order of depth.
    levels: Vec<String>,

    /// The hierarchy nodes.
    nodes: Vec<Node>,

    /// The position of each node in `nodes` by identifier.
    by_id: HashMap<NodeId, usize>,

    /// The positions of the children of each node in `nodes`.
    children: HashMap<NodeId, Vec<usize>>,

    /// The rows in ascending index order.
    rows: Vec<Record>,

    /// The partition of each row.
    partitions: Vec<Option<Contig>>,

    /// The interval lookup over every row.
    everything: lapper::Lapper<Number, usize>,

    /// The interval lookup over the rows of each partition.
    by_partition: HashMap<Contig, lapper::Lapper<Number, usize>>,

    /// The metadata columns available on the rows.
    columns: Vec<String>,

    /// The measurements.
    measurements: Vec<Measurement>,

    /// The values of each measurement keyed by row index.
    values: HashMap<String, HashMap<Number, Option<f64>>>,
}

impl Dataset {
    /// Reads a dataset from a JSON string.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::source::Dataset;
    /// use hiertrack::source::HierarchySource;
    ///
    /// let dataset = Dataset::from_json(
    ///     r#"{"nodes": [{"id": "0-0", "label": "root", "start": 0, "end": 1, "leafIndex": 0, "nleaves": 1}]}"#,
    /// )?;
    ///
    /// assert_eq!(dataset.name(), "dataset");
    /// assert_eq!(dataset.nodes(&["0-0".parse()?])?.len(), 1);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_json(data: &str) -> Result<Self> {
        let document = serde_json::from_str::<Document>(data).map_err(Error::Json)?;
        Self::try_from_document(document)
    }

    /// Reads a dataset from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document = serde_json::from_reader::<_, Document>(reader).map_err(Error::Json)?;
        Self::try_from_document(document)
    }

    /// Reads a dataset from a JSON file, decompressing it first if the file
    /// name ends in `.gz`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(Error::Io)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::from_reader(BufReader::new(GzDecoder::new(file))),
            _ => Self::from_reader(BufReader::new(file)),
        }
    }

    /// Gets the name of the dataset.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the dataset and its lookup structures from a document.
    fn try_from_document(document: Document) -> Result<Self> {
        let levels = document.levels;

        // (1) Build the hierarchy.
        let mut nodes = Vec::with_capacity(document.nodes.len());

        for entry in document.nodes {
            let depth = entry.id.depth() as usize;

            let mut builder = node::Builder::default()
                .id(entry.id)
                .label(entry.label)
                .lineage_label(entry.lineage_label)
                .span(entry.start, entry.end)
                .leaves(entry.leaf_index, entry.n_leaves)
                .n_children(entry.n_children)
                .order(entry.order);

            if let Some(taxonomy) = entry.taxonomy.or_else(|| levels.get(depth).cloned()) {
                builder = builder.taxonomy(taxonomy);
            }

            if let Some(parent_id) = entry.parent_id {
                builder = builder.parent_id(parent_id);
            }

            if let Some(lineage) = entry.lineage {
                builder = builder.lineage(lineage);
            }

            if let Some(partition) = entry.partition {
                let contig: Contig = partition.as_str().into();
                builder = builder.partition(contig);
            }

            nodes.push(builder.try_build().map_err(Error::InvalidNode)?);
        }

        let mut by_id = HashMap::with_capacity(nodes.len());
        let mut children = HashMap::<NodeId, Vec<usize>>::new();

        for (i, node) in nodes.iter().enumerate() {
            by_id.insert(node.id().clone(), i);

            if let Some(parent_id) = node.parent_id() {
                children.entry(parent_id.clone()).or_default().push(i);
            }
        }

        // (2) Build the rows, joining each one to its leaf node.
        let mut entries = document.rows;
        entries.sort_by_key(|entry| entry.index);

        let mut rows = Vec::with_capacity(entries.len());
        let mut partitions = Vec::with_capacity(entries.len());
        let mut columns = HashSet::new();

        for entry in entries {
            let end = entry.end.unwrap_or(entry.start + 1);

            if entry.start > end {
                return Err(Error::InvalidRow(
                    entry.index,
                    format!("start ({}) is greater than end ({end})", entry.start),
                ));
            }

            let mut record = Record::new(entry.index, entry.start, end);

            for (column, value) in entry.metadata {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => continue,
                    other => other.to_string(),
                };

                columns.insert(column.clone());
                record = record.with_metadata(column, value);
            }

            let leaf = record
                .metadata("id")
                .and_then(|id| id.parse::<NodeId>().ok())
                .and_then(|id| by_id.get(&id))
                .map(|&i| &nodes[i]);

            if let Some(leaf) = leaf {
                record = record.with_lineage(
                    leaf.lineage().iter().cloned().collect(),
                    leaf.lineage_label().to_vec(),
                );
            }

            rows.push(record);
            partitions.push(entry.partition.map(|p| -> Contig { p.as_str().into() }));
        }

        // (3) Index the rows by their extent on the coordinate axis.
        let mut grouped = HashMap::<Contig, Vec<Iv>>::new();
        let mut all = Vec::with_capacity(rows.len());

        for (i, (record, partition)) in rows.iter().zip(partitions.iter()).enumerate() {
            let iv = Iv {
                start: record.start(),
                stop: record.end(),
                val: i,
            };

            if let Some(partition) = partition {
                grouped.entry(partition.clone()).or_default().push(iv.clone());
            }

            all.push(iv);
        }

        let by_partition = grouped
            .into_iter()
            .map(|(k, v)| (k, lapper::Lapper::new(v)))
            .collect::<HashMap<_, _>>();

        let mut columns = columns.into_iter().collect::<Vec<_>>();
        columns.sort();

        let values = document
            .values
            .into_iter()
            .map(|(measurement, pairs)| (measurement, pairs.into_iter().collect()))
            .collect();

        debug!(
            nodes = nodes.len(),
            rows = rows.len(),
            measurements = document.measurements.len(),
            "loaded dataset"
        );

        Ok(Self {
            name: document.name.unwrap_or_else(|| String::from(DEFAULT_NAME)),
            levels,
            nodes,
            by_id,
            children,
            rows,
            partitions,
            everything: lapper::Lapper::new(all),
            by_partition,
            columns,
            measurements: document.measurements,
            values,
        })
    }

    /// Computes the runs of row positions matching `query`.
    ///
    /// Each window contributes the run from the lowest to the highest row
    /// position overlapping it. Overlapping runs are merged so that every row
    /// is produced at most once and in ascending index order.
    fn runs(&self, query: &Query) -> Vec<(usize, usize)> {
        let lookup = match query.partition() {
            Some(partition) => match self.by_partition.get(partition) {
                Some(lookup) => lookup,
                None => return Vec::new(),
            },
            None => &self.everything,
        };

        let mut runs = query
            .windows()
            .iter()
            .filter(|window| !window.is_empty())
            .filter_map(|window| {
                lookup
                    .find(window.start(), window.end())
                    .map(|iv| iv.val)
                    .fold(None, |acc: Option<(usize, usize)>, i| match acc {
                        Some((lo, hi)) => Some((lo.min(i), hi.max(i))),
                        None => Some((i, i)),
                    })
            })
            .collect::<Vec<_>>();

        runs.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(runs.len());

        for (lo, hi) in runs {
            match merged.last_mut() {
                Some(last) if lo <= last.1 + 1 => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }

        merged
    }

    /// Iterates over the rows matching `query` in ascending index order.
    fn matching<'a>(&'a self, query: &Query) -> impl Iterator<Item = &'a Record> + 'a {
        let partition = query.partition().cloned();

        self.runs(query)
            .into_iter()
            .flat_map(move |(lo, hi)| lo..=hi)
            .filter(move |&i| partition.is_none() || self.partitions[i] == partition)
            .map(move |i| &self.rows[i])
    }

    /// Collects the nodes at the given positions keyed by identifier.
    fn collect<I>(&self, positions: I) -> HashMap<NodeId, Node>
    where
        I: IntoIterator<Item = usize>,
    {
        positions
            .into_iter()
            .map(|i| (self.nodes[i].id().clone(), self.nodes[i].clone()))
            .collect()
    }
}

impl HierarchySource for Dataset {
    fn nodes(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, Node>> {
        Ok(self.collect(ids.iter().filter_map(|id| self.by_id.get(id).copied())))
    }

    fn siblings(&self, ids: &[NodeId], depths: &[u32]) -> Result<HashMap<NodeId, Node>> {
        let wanted = ids.iter().collect::<HashSet<_>>();

        let parents = ids
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter_map(|&i| self.nodes[i].parent_id())
            .collect::<HashSet<_>>();

        Ok(self.collect(self.nodes.iter().enumerate().filter_map(|(i, node)| {
            let keep = wanted.contains(node.id())
                || node.parent_id().is_some_and(|p| parents.contains(p))
                || depths.contains(&node.depth());

            keep.then_some(i)
        })))
    }

    fn subtree(&self, root: &NodeId, max_depth: u32) -> Result<Vec<Node>> {
        let Some(&start) = self.by_id.get(root) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(i) = queue.pop_front() {
            let node = &self.nodes[i];

            if node.depth() > max_depth {
                continue;
            }

            result.push(node.clone());

            if let Some(children) = self.children.get(node.id()) {
                queue.extend(children.iter().copied());
            }
        }

        result.sort_by(|a, b| {
            a.depth()
                .cmp(&b.depth())
                .then_with(|| {
                    let a = a.partition().map(|p| &**p);
                    let b = b.partition().map(|p| &**p);
                    a.cmp(&b)
                })
                .then_with(|| a.start().cmp(&b.start()))
                .then_with(|| a.end().cmp(&b.end()))
        });

        Ok(result)
    }

    fn levels(&self) -> Result<BTreeMap<u32, String>> {
        Ok(self
            .levels
            .iter()
            .enumerate()
            .map(|(depth, label)| (depth as u32, label.clone()))
            .collect())
    }
}

impl RowSource for Dataset {
    fn columns(&self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn rows(&self, query: &Query) -> Result<Cursor<'_, Record>> {
        Ok(Box::new(self.matching(query).cloned().map(Ok)))
    }

    fn partitions(&self) -> Result<Vec<Partition>> {
        let mut extents = BTreeMap::<Option<&str>, (Number, Number)>::new();

        for (record, partition) in self.rows.iter().zip(self.partitions.iter()) {
            let key = partition.as_ref().map(|p| -> &str { p.as_str() });

            extents
                .entry(key)
                .and_modify(|(start, end)| {
                    *start = (*start).min(record.start());
                    *end = (*end).max(record.end());
                })
                .or_insert((record.start(), record.end()));
        }

        Ok(extents
            .into_iter()
            .map(|(name, (start, end))| Partition {
                name: name.map(|n| -> Contig { n.into() }),
                start,
                end,
            })
            .collect())
    }
}

impl ValueSource for Dataset {
    fn measurements(&self) -> Result<Vec<Measurement>> {
        Ok(self.measurements.clone())
    }

    fn contains_measurement(&self, id: &str) -> Result<bool> {
        Ok(self.measurements.iter().any(|m| m.id == id) || self.values.contains_key(id))
    }

    fn values(&self, measurement: &str, query: &Query) -> Result<Cursor<'_, ValueRecord>> {
        let values = self.values.get(measurement);

        Ok(Box::new(self.matching(query).map(move |record| {
            let value = values
                .and_then(|values| values.get(&record.index()))
                .copied()
                .flatten();

            Ok(ValueRecord::new(
                record.index(),
                record.start(),
                record.end(),
                value,
            ))
        })))
    }

    fn value_bounds(&self) -> Result<Option<(f64, f64)>> {
        Ok(self
            .values
            .values()
            .flat_map(|values| values.values())
            .filter_map(|value| *value)
            .fold(None, |acc, v| match acc {
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
                None => Some((v, v)),
            }))
    }
}

#[cfg(test)]
mod tests {
    use crate::interval::Span;

    use super::*;

    /// A small dataset with two partitions and a three-level hierarchy.
    const DATA: &str = r#"{
        "name": "tiny",
        "levels": ["root", "phylum", "genus"],
        "nodes": [
            {"id": "0-0", "label": "root", "start": 0, "end": 6, "leafIndex": 0, "nleaves": 6, "nchildren": 2},
            {"id": "1-0", "label": "P1", "parentId": "0-0", "lineage": ["0-0", "1-0"],
             "lineageLabel": ["root", "P1"], "start": 0, "end": 4, "leafIndex": 0, "nleaves": 4, "nchildren": 2},
            {"id": "1-1", "label": "P2", "parentId": "0-0", "lineage": ["0-0", "1-1"],
             "lineageLabel": ["root", "P2"], "start": 4, "end": 6, "leafIndex": 4, "nleaves": 2, "order": 1},
            {"id": "2-0", "label": "G1", "lineage": ["0-0", "1-0", "2-0"],
             "lineageLabel": ["root", "P1", "G1"], "start": 0, "end": 2, "leafIndex": 0, "nleaves": 2},
            {"id": "2-1", "label": "G2", "lineage": ["0-0", "1-0", "2-1"],
             "lineageLabel": ["root", "P1", "G2"], "start": 2, "end": 4, "leafIndex": 2, "nleaves": 2, "order": 1}
        ],
        "rows": [
            {"index": 3, "partition": "chr1", "start": 3, "end": 4, "metadata": {"id": "2-1", "gene": "d"}},
            {"index": 0, "partition": "chr1", "start": 0, "end": 1, "metadata": {"id": "2-0", "gene": "a"}},
            {"index": 1, "partition": "chr1", "start": 1, "end": 2, "metadata": {"id": "2-0", "gene": "b"}},
            {"index": 2, "partition": "chr2", "start": 2, "end": 3, "metadata": {"id": "2-1", "gene": "c"}},
            {"index": 4, "partition": "chr2", "start": 4, "end": 5, "metadata": {"id": "1-1", "gene": 5}},
            {"index": 5, "partition": "chr2", "start": 5, "end": 6, "metadata": {"id": "1-1"}}
        ],
        "measurements": [{"id": "s1", "label": "Sample 1"}],
        "values": {"s1": [[0, 1.0], [1, 2.0], [2, null], [3, 4.5], [5, -1.0]]}
    }"#;

    #[test]
    fn it_reads_the_hierarchy() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(DATA)?;

        assert_eq!(dataset.name(), "tiny");

        let nodes = dataset.nodes(&["2-1".parse()?, "9-9".parse()?])?;
        assert_eq!(nodes.len(), 1);

        let node = &nodes[&"2-1".parse::<NodeId>()?];
        assert_eq!(node.parent_id().map(|p| p.as_str()), Some("1-0"));
        assert_eq!(node.taxonomy(), Some("genus"));
        assert_eq!(node.order(), 1);

        let levels = dataset.levels()?;
        assert_eq!(levels.get(&1).map(|s| s.as_str()), Some("phylum"));

        Ok(())
    }

    #[test]
    fn it_finds_siblings() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(DATA)?;

        let nodes = dataset.siblings(&["2-0".parse()?], &[])?;
        let mut ids = nodes.keys().map(|id| id.as_str()).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec!["2-0", "2-1"]);

        let nodes = dataset.siblings(&["0-0".parse()?], &[1])?;
        let mut ids = nodes.keys().map(|id| id.as_str()).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec!["0-0", "1-0", "1-1"]);

        Ok(())
    }

    #[test]
    fn it_collects_subtrees_by_depth() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(DATA)?;

        let nodes = dataset.subtree(&"1-0".parse()?, 2)?;
        let ids = nodes.iter().map(|n| n.id().as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["1-0", "2-0", "2-1"]);

        let nodes = dataset.subtree(&"0-0".parse()?, 1)?;
        let ids = nodes.iter().map(|n| n.id().as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["0-0", "1-0", "1-1"]);

        assert!(dataset.subtree(&"5-5".parse()?, 9)?.is_empty());

        Ok(())
    }

    #[test]
    fn it_streams_rows_in_index_order() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(DATA)?;

        let query = Query::new(None, vec![Span::clamped(0, 6)]);
        let indices = dataset
            .rows(&query)?
            .map(|r| r.map(|r| r.index()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);

        let first = dataset.rows(&query)?.next().transpose()?;
        let first = first.ok_or("no rows")?;
        assert_eq!(first.metadata("gene"), Some("a"));
        assert_eq!(first.lineage_label(), &["root", "P1", "G1"]);

        let row = dataset.rows(&Query::new(None, vec![Span::clamped(4, 5)]))?.next().transpose()?;
        assert_eq!(row.and_then(|r| r.metadata("gene").map(String::from)).as_deref(), Some("5"));

        Ok(())
    }

    #[test]
    fn it_filters_rows_by_partition_and_window() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let dataset = Dataset::from_json(DATA)?;

        let chr1: Contig = "chr1".into();
        let query = Query::new(Some(chr1), vec![Span::clamped(0, 2), Span::clamped(3, 6)]);
        let indices = dataset
            .rows(&query)?
            .map(|r| r.map(|r| r.index()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(indices, vec![0, 1, 3]);

        let query = Query::new(None, vec![Span::clamped(1, 1), Span::clamped(2, 2)]);
        assert_eq!(dataset.rows(&query)?.count(), 0);

        let missing: Contig = "chrX".into();
        assert_eq!(
            dataset.rows(&Query::new(Some(missing), vec![Span::clamped(0, 6)]))?.count(),
            0
        );

        Ok(())
    }

    #[test]
    fn it_reports_partitions_and_columns() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(DATA)?;

        let partitions = dataset.partitions()?;
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].name.as_ref().map(|p| -> &str { p.as_str() }), Some("chr1"));
        assert_eq!((partitions[0].start, partitions[0].end), (0, 4));
        assert_eq!((partitions[1].start, partitions[1].end), (2, 6));

        assert_eq!(dataset.columns()?, vec!["gene", "id"]);

        Ok(())
    }

    #[test]
    fn it_streams_values() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(DATA)?;

        assert!(dataset.contains_measurement("s1")?);
        assert!(!dataset.contains_measurement("s2")?);

        let values = dataset
            .values("s1", &Query::new(None, vec![Span::clamped(0, 6)]))?
            .map(|r| r.map(|r| r.value()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            values,
            vec![Some(1.0), Some(2.0), None, Some(4.5), None, Some(-1.0)]
        );

        assert_eq!(dataset.value_bounds()?, Some((-1.0, 4.5)));

        Ok(())
    }

    #[test]
    fn it_rejects_inverted_rows() {
        let err = Dataset::from_json(
            r#"{"nodes": [], "rows": [{"index": 0, "start": 2, "end": 1}]}"#,
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid row at index 0: start (2) is greater than end (1)"
        );
    }

    #[test]
    fn it_defaults_missing_ends_to_a_single_position()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dataset = Dataset::from_json(r#"{"nodes": [], "rows": [{"index": 0, "start": 7}]}"#)?;

        let row = dataset
            .rows(&Query::new(None, vec![Span::clamped(0, 10)]))?
            .next()
            .transpose()?
            .ok_or("no rows")?;

        assert_eq!((row.start(), row.end()), (7, 8));

        Ok(())
    }
}
