//! The request-level operations of the engine.
//!
//! An [`Engine`] wraps a host data source and answers the requests a track
//! viewer makes: the hierarchy, its levels, the partitions, the available
//! measurements and aggregators, and (most importantly) the rows and values
//! of a range with a selection and ordering applied.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use omics::coordinate::Contig;
use omics::coordinate::position::Number;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::aggregate;
use crate::aggregate::Aggregator;
use crate::aggregate::Registry;
use crate::collection::RowCollection;
use crate::collection::ValueCollection;
use crate::collection::row::LINEAGE_COLUMN;
use crate::collection::row::Options;
use crate::hierarchy::NodeId;
use crate::hierarchy::SelectionType;
use crate::hierarchy::Subtree;
use crate::hierarchy::id;
use crate::interval;
use crate::interval::Span;
use crate::merge::merge_rows;
use crate::merge::merge_values;
use crate::order;
use crate::order::Order;
use crate::order::order_nodes;
use crate::order::reorder;
use crate::selection::Resolver;
use crate::selection::Selection;
use crate::source;
use crate::source::HierarchySource;
use crate::source::Measurement;
use crate::source::Partition;
use crate::source::Query;
use crate::source::RowSource;
use crate::source::ValueSource;

/// The columns that locate a row and are never carried as metadata.
pub const LOCATION_COLUMNS: &[&str] = &["index", "partition", "start", "end"];

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a request.
#[derive(Debug)]
pub enum Error {
    /// The data source failed.
    Source(source::Error),

    /// The requested aggregator is not registered.
    Aggregate(aggregate::Error),

    /// A node identifier in the request was malformed.
    NodeId(id::Error),

    /// The requested range was invalid.
    Range(interval::Error),

    /// The merged sequence could not be reordered.
    Order(order::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Source(err) => write!(f, "source error: {err}"),
            Error::Aggregate(err) => write!(f, "aggregate error: {err}"),
            Error::NodeId(err) => write!(f, "node id error: {err}"),
            Error::Range(err) => write!(f, "range error: {err}"),
            Error::Order(err) => write!(f, "order error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Requests
////////////////////////////////////////////////////////////////////////////////////////

/// The parts shared by every request for a range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Request {
    /// The partition to restrict to, if any.
    partition: Option<Contig>,

    /// The range.
    range: Span,

    /// The selection.
    selection: Selection,

    /// The order overrides.
    order: Order,
}

impl Request {
    /// Attempts to create a new [`Request`] for the range `[start, end)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::api::Request;
    /// use hiertrack::hierarchy::SelectionType;
    ///
    /// let request = Request::try_new(10, 20)?
    ///     .try_select("1-0", SelectionType::Node)?
    ///     .try_order("1-1", -1)?;
    ///
    /// assert_eq!(request.range().to_string(), "[10, 20)");
    /// assert!(Request::try_new(20, 10).is_err());
    /// assert!(request.try_select("one", SelectionType::Node).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(start: Number, end: Number) -> Result<Self> {
        let range = Span::try_new(start, end).map_err(Error::Range)?;

        Ok(Self {
            range,
            ..Default::default()
        })
    }

    /// Restricts the request to a partition.
    pub fn with_partition(mut self, partition: Contig) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Replaces the selection.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Replaces the order overrides.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Attempts to select the node identified by `id`.
    pub fn try_select(mut self, id: &str, selection_type: SelectionType) -> Result<Self> {
        let id = id.parse::<NodeId>().map_err(Error::NodeId)?;
        self.selection = self.selection.select(id, selection_type);
        Ok(self)
    }

    /// Attempts to override the order of the node identified by `id`.
    pub fn try_order(mut self, id: &str, value: i64) -> Result<Self> {
        let id = id.parse::<NodeId>().map_err(Error::NodeId)?;
        self.order.insert(id, value);
        Ok(self)
    }

    /// Gets the partition.
    pub fn partition(&self) -> Option<&Contig> {
        self.partition.as_ref()
    }

    /// Gets the range.
    pub fn range(&self) -> Span {
        self.range
    }

    /// Gets the selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Gets the order overrides.
    pub fn order(&self) -> &Order {
        &self.order
    }
}

/// A request for rows.
#[derive(Clone, Debug, PartialEq)]
pub struct RowsRequest {
    /// The range, selection, and ordering.
    request: Request,

    /// The metadata columns to carry. Every known column when absent.
    metadata: Option<Vec<String>>,

    /// Whether indices are returned.
    retrieve_index: bool,

    /// Whether ends are returned.
    retrieve_end: bool,

    /// Whether starts and ends are returned as deltas.
    use_offset: bool,
}

impl RowsRequest {
    /// Creates a new [`RowsRequest`] returning indices and ends as absolute
    /// positions.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            metadata: None,
            retrieve_index: true,
            retrieve_end: true,
            use_offset: false,
        }
    }

    /// Sets the metadata columns to carry.
    pub fn metadata(mut self, columns: Vec<String>) -> Self {
        self.metadata = Some(columns);
        self
    }

    /// Sets whether indices are returned.
    pub fn retrieve_index(mut self, value: bool) -> Self {
        self.retrieve_index = value;
        self
    }

    /// Sets whether ends are returned.
    pub fn retrieve_end(mut self, value: bool) -> Self {
        self.retrieve_end = value;
        self
    }

    /// Sets whether starts and ends are returned as deltas.
    pub fn use_offset(mut self, value: bool) -> Self {
        self.use_offset = value;
        self
    }

    /// Gets the inner request.
    pub fn request(&self) -> &Request {
        &self.request
    }
}

/// A request for the values of a measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct ValuesRequest {
    /// The range, selection, and ordering.
    request: Request,

    /// The measurement.
    measurement: String,

    /// The aggregator name. The default aggregator when absent.
    aggregator: Option<String>,
}

impl ValuesRequest {
    /// Creates a new [`ValuesRequest`] using the default aggregator.
    pub fn new(request: Request, measurement: impl Into<String>) -> Self {
        Self {
            request,
            measurement: measurement.into(),
            aggregator: None,
        }
    }

    /// Sets the aggregator by name.
    pub fn aggregator(mut self, name: impl Into<String>) -> Self {
        self.aggregator = Some(name.into());
        self
    }

    /// Gets the inner request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Gets the measurement.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }
}

/// A request for a subtree of the hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyRequest {
    /// The root of the subtree.
    root: NodeId,

    /// The number of levels beneath the root to include.
    depth: u32,

    /// The selection to overlay.
    selection: Selection,

    /// The order overrides to overlay.
    order: Order,
}

impl HierarchyRequest {
    /// Creates a new [`HierarchyRequest`] for `depth` levels beneath the root
    /// of the hierarchy.
    pub fn new(depth: u32) -> Self {
        Self {
            root: NodeId::root(),
            depth,
            selection: Selection::default(),
            order: Order::new(),
        }
    }

    /// Sets the root of the subtree.
    pub fn root(mut self, root: NodeId) -> Self {
        self.root = root;
        self
    }

    /// Sets the selection to overlay.
    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the order overrides to overlay.
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Responses
////////////////////////////////////////////////////////////////////////////////////////

/// The measurements available for a dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Measurements {
    /// The measurements.
    pub measurements: Vec<Measurement>,

    /// The lowest value across every measurement.
    pub min: Option<f64>,

    /// The highest value across every measurement.
    pub max: Option<f64>,

    /// The metadata columns available on each row.
    pub metadata: Vec<String>,
}

////////////////////////////////////////////////////////////////////////////////////////
// Engine
////////////////////////////////////////////////////////////////////////////////////////

/// Values computed once for the lifetime of an [`Engine`].
#[derive(Debug, Default)]
struct Memo {
    /// The lowest and highest value across every measurement.
    bounds: OnceLock<Option<(f64, f64)>>,
}

/// Answers requests over a host data source.
#[derive(Debug)]
pub struct Engine<S> {
    /// The data source.
    source: S,

    /// The registered aggregators.
    aggregators: Registry,

    /// The memoized values.
    memo: Memo,
}

impl<S> Engine<S>
where
    S: HierarchySource + RowSource + ValueSource,
{
    /// Creates a new [`Engine`] with the built-in aggregators.
    pub fn new(source: S) -> Self {
        Self {
            source,
            aggregators: Registry::default(),
            memo: Memo::default(),
        }
    }

    /// Registers an additional aggregator.
    pub fn register(&mut self, aggregator: Arc<dyn Aggregator>) {
        self.aggregators.register(aggregator);
    }

    /// Gets the data source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Gets the label of each level of the hierarchy keyed by depth.
    pub fn levels(&self) -> Result<BTreeMap<u32, String>> {
        self.source.levels().map_err(Error::Source)
    }

    /// Gets the extent of each partition.
    pub fn partitions(&self) -> Result<Vec<Partition>> {
        self.source.partitions().map_err(Error::Source)
    }

    /// Gets the names of the registered aggregators.
    pub fn aggregating_functions(&self) -> Vec<&str> {
        self.aggregators.names()
    }

    /// Gets the available measurements.
    ///
    /// The value bounds are computed on the first call and reused afterwards.
    pub fn measurements(&self) -> Result<Measurements> {
        let bounds = match self.memo.bounds.get() {
            Some(bounds) => *bounds,
            None => {
                let bounds = self.source.value_bounds().map_err(Error::Source)?;
                *self.memo.bounds.get_or_init(|| bounds)
            }
        };

        let mut metadata = self.source.columns().map_err(Error::Source)?;
        let levels = self.levels()?;

        metadata.extend(levels.into_values());
        metadata.push(String::from(LINEAGE_COLUMN));

        Ok(Measurements {
            measurements: self.source.measurements().map_err(Error::Source)?,
            min: bounds.map(|(min, _)| min),
            max: bounds.map(|(_, max)| max),
            metadata,
        })
    }

    /// Gets a subtree of the hierarchy.
    ///
    /// When the root of the subtree is not the root of the hierarchy, the
    /// subtree is wrapped in the parent of its root. Returns [`None`] when the
    /// root does not exist.
    pub fn hierarchy(&self, request: &HierarchyRequest) -> Result<Option<Subtree>> {
        let max_depth = request.root.depth().saturating_add(request.depth);
        let nodes = self
            .source
            .subtree(&request.root, max_depth)
            .map_err(Error::Source)?;

        let Some(tree) = Subtree::build(nodes, &request.root, &request.selection, &request.order)
        else {
            debug!(root = %request.root, "hierarchy root not found");
            return Ok(None);
        };

        let Some(parent_id) = tree.node().parent_id().cloned() else {
            return Ok(Some(tree));
        };

        let parent = self
            .source
            .nodes(std::slice::from_ref(&parent_id))
            .map_err(Error::Source)?
            .remove(&parent_id);

        Ok(Some(match parent {
            Some(mut parent) => {
                parent.set_selection_type(request.selection.resolve(&parent));

                if let Some(&value) = request.order.get(parent.id()) {
                    parent.set_order(value);
                }

                tree.wrap(parent)
            }
            None => tree,
        }))
    }

    /// Gets the rows of a range with the selection and ordering applied.
    pub fn rows(&self, request: &RowsRequest) -> Result<RowCollection> {
        let inner = &request.request;

        let options = Options::new(
            self.metadata_columns(request.metadata.as_deref())?,
            self.levels()?.into_values().collect(),
        )
        .store_index(request.retrieve_index)
        .store_end(request.retrieve_end)
        .use_offset(request.use_offset);

        let resolution = Resolver::new(&self.source)
            .resolve(&inner.selection, &inner.order, inner.range)
            .map_err(Error::Source)?;

        let query = Query::new(
            inner.partition.clone(),
            resolution.windows(|kind| kind.collapses()),
        );

        let cursor = self.source.rows(&query).map_err(Error::Source)?;
        let rows = merge_rows(cursor, &resolution, options).map_err(Error::Source)?;
        let rows = reorder(&rows, order_nodes(&inner.order, resolution.nodes()))
            .map_err(Error::Order)?;

        debug!(
            range = %inner.range,
            collapsed = resolution.collapse_nodes().count(),
            rows = rows.len(),
            "answered rows request"
        );

        Ok(rows)
    }

    /// Gets the values of a measurement over a range with the selection and
    /// ordering applied.
    ///
    /// The range is widened to cover every collapsed node overlapping it so
    /// that each aggregate sees all of the values beneath its node. A request
    /// for an unknown measurement returns no values.
    pub fn values(&self, request: &ValuesRequest) -> Result<ValueCollection> {
        let inner = &request.request;

        let name = request.aggregator.as_deref().unwrap_or(aggregate::DEFAULT);
        let aggregator = self.aggregators.get(name).map_err(Error::Aggregate)?;

        if !self
            .source
            .contains_measurement(&request.measurement)
            .map_err(Error::Source)?
        {
            warn!(measurement = %request.measurement, "unknown measurement");
            return Ok(ValueCollection::default());
        }

        let resolution = Resolver::new(&self.source)
            .resolve(&inner.selection, &inner.order, inner.range)
            .map_err(Error::Source)?;

        let widened = resolution.widened();
        let resolution = resolution.with_range(widened);

        let query = Query::new(
            inner.partition.clone(),
            resolution.windows(|kind| kind == SelectionType::None),
        );

        let cursor = self
            .source
            .values(&request.measurement, &query)
            .map_err(Error::Source)?;

        let values = merge_values(cursor, &resolution, aggregator).map_err(Error::Source)?;
        let values = reorder(&values, order_nodes(&inner.order, resolution.nodes()))
            .map_err(Error::Order)?;

        debug!(
            measurement = %request.measurement,
            aggregator = name,
            range = %widened,
            values = values.len(),
            "answered values request"
        );

        Ok(values)
    }

    /// Resolves the metadata columns of a rows request.
    ///
    /// Location columns are never carried, and requested columns the source
    /// does not know are dropped. When no columns are requested, every known
    /// column is carried.
    fn metadata_columns(&self, requested: Option<&[String]>) -> Result<Vec<String>> {
        let known = self
            .source
            .columns()
            .map_err(Error::Source)?
            .into_iter()
            .filter(|column| !LOCATION_COLUMNS.contains(&column.as_str()))
            .collect::<Vec<_>>();

        let Some(requested) = requested else {
            return Ok(known);
        };

        Ok(requested
            .iter()
            .filter(|column| !LOCATION_COLUMNS.contains(&column.as_str()))
            .filter(|column| match known.contains(column) {
                true => true,
                false => {
                    debug!(column = %column, "unknown metadata column dropped");
                    false
                }
            })
            .cloned()
            .collect())
    }
}

/// Parses a selection map keyed by node identifier from JSON.
///
/// # Examples
///
/// ```
/// use hiertrack::api::parse_selection;
/// use hiertrack::hierarchy::SelectionType;
///
/// let selection = parse_selection(r#"{"1-0": 2, "2-a": 0}"#, r#"{"3": 2}"#)?;
/// assert_eq!(selection.by_id().len(), 2);
/// assert_eq!(selection.by_level().get(&3), Some(&SelectionType::Node));
///
/// assert!(parse_selection(r#"{"x": 2}"#, "{}").is_err());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_selection(
    by_id: &str,
    by_level: &str,
) -> std::result::Result<Selection, serde_json::Error> {
    let by_id = serde_json::from_str::<HashMap<NodeId, SelectionType>>(by_id)?;
    let by_level = serde_json::from_str::<HashMap<u32, SelectionType>>(by_level)?;
    Ok(Selection::new(by_id, by_level))
}

/// Parses order overrides keyed by node identifier from JSON.
pub fn parse_order(order: &str) -> std::result::Result<Order, serde_json::Error> {
    serde_json::from_str::<Order>(order)
}

#[cfg(test)]
mod tests {
    use crate::collection::Reorder;
    use crate::interval::Interval;
    use crate::source::Dataset;

    use super::*;

    /// A single level of three genera beneath the root, one row per leaf.
    const DATA: &str = r#"{
        "levels": ["root", "genus"],
        "nodes": [
            {"id": "0-0", "label": "root", "start": 0, "end": 6, "leafIndex": 0, "nleaves": 6,
             "lineageLabel": ["root"], "nchildren": 3},
            {"id": "1-0", "label": "A", "lineage": ["0-0", "1-0"], "lineageLabel": ["root", "A"],
             "start": 0, "end": 2, "leafIndex": 0, "nleaves": 2, "order": 0},
            {"id": "1-1", "label": "B", "lineage": ["0-0", "1-1"], "lineageLabel": ["root", "B"],
             "start": 2, "end": 5, "leafIndex": 2, "nleaves": 3, "order": 1},
            {"id": "1-2", "label": "C", "lineage": ["0-0", "1-2"], "lineageLabel": ["root", "C"],
             "start": 5, "end": 6, "leafIndex": 5, "nleaves": 1, "order": 2}
        ],
        "rows": [
            {"index": 0, "start": 0, "end": 1, "metadata": {"id": "1-0", "label": "r0"}},
            {"index": 1, "start": 1, "end": 2, "metadata": {"id": "1-0", "label": "r1"}},
            {"index": 2, "start": 2, "end": 3, "metadata": {"id": "1-1", "label": "r2"}},
            {"index": 3, "start": 3, "end": 4, "metadata": {"id": "1-1", "label": "r3"}},
            {"index": 4, "start": 4, "end": 5, "metadata": {"id": "1-1", "label": "r4"}},
            {"index": 5, "start": 5, "end": 6, "metadata": {"id": "1-2", "label": "r5"}}
        ],
        "measurements": [{"id": "m", "label": "M"}],
        "values": {"m": [[0, 0.0], [1, 1.0], [2, 2.0], [3, 3.0], [4, 4.0], [5, 5.0]]}
    }"#;

    fn engine() -> Engine<Dataset> {
        Engine::new(Dataset::from_json(DATA).unwrap())
    }

    fn labels(rows: &RowCollection) -> Vec<&str> {
        rows.column("label")
            .unwrap()
            .iter()
            .map(|value| value.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn it_returns_every_row_without_a_selection() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let rows = engine().rows(&RowsRequest::new(Request::try_new(0, 6)?))?;

        assert_eq!(rows.indices(), Some(&[0, 1, 2, 3, 4, 5][..]));
        assert_eq!(labels(&rows), vec!["r0", "r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(
            rows.column("genus").unwrap()[2].as_deref(),
            Some("B")
        );
        assert_eq!(
            rows.column(LINEAGE_COLUMN).unwrap()[5].as_deref(),
            Some("0-0,1-2")
        );

        Ok(())
    }

    #[test]
    fn it_collapses_and_hides_nodes() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = Request::try_new(0, 6)?
            .try_select("1-0", SelectionType::None)?
            .try_select("1-1", SelectionType::Node)?;

        let rows = engine().rows(&RowsRequest::new(request))?;

        assert_eq!(rows.indices(), Some(&[0, 1][..]));
        assert_eq!(labels(&rows), vec!["B", "r5"]);
        assert_eq!(rows.starts(), &[2, 5]);
        assert_eq!(rows.ends(), Some(&[5, 6][..]));
        assert_eq!(rows.column("id").unwrap()[0].as_deref(), Some("1-1"));

        Ok(())
    }

    #[test]
    fn it_keeps_sibling_order_when_already_ordered()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = Request::try_new(0, 6)?
            .try_order("1-0", -1)?
            .try_order("1-1", 0)?;

        let rows = engine().rows(&RowsRequest::new(request))?;
        assert_eq!(labels(&rows), vec!["r0", "r1", "r2", "r3", "r4", "r5"]);

        Ok(())
    }

    #[test]
    fn it_reorders_siblings() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = Request::try_new(0, 6)?.try_order("1-0", 10)?;
        let rows = engine().rows(&RowsRequest::new(request))?;

        assert_eq!(labels(&rows), vec!["r2", "r3", "r4", "r5", "r0", "r1"]);
        assert_eq!(rows.indices(), Some(&[0, 1, 2, 3, 4, 5][..]));
        assert_eq!(rows.starts(), &[0, 1, 2, 3, 4, 5]);

        for row in rows.iter() {
            assert_eq!(row.end() - row.start(), 1);
        }

        // A collapsed node moves as a single row.
        let request = Request::try_new(0, 6)?
            .try_order("1-0", 10)?
            .try_select("1-1", SelectionType::Node)?;

        let rows = engine().rows(&RowsRequest::new(request))?;
        assert_eq!(labels(&rows), vec!["B", "r5", "r0", "r1"]);
        assert_eq!(rows.starts(), &[0, 3, 4, 5]);
        assert_eq!(rows.ends(), Some(&[3, 4, 5, 6][..]));
        assert_eq!(rows.leaves()[0], Span::try_new(2, 5)?);

        Ok(())
    }

    #[test]
    fn it_selects_metadata_columns() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = RowsRequest::new(Request::try_new(0, 2)?)
            .metadata(vec![String::from("label"), String::from("start")])
            .retrieve_index(false)
            .retrieve_end(false)
            .use_offset(true);

        let rows = engine().rows(&request)?;
        assert!(rows.column("id").is_none());
        assert!(rows.indices().is_none());
        assert!(rows.ends().is_none());
        assert_eq!(rows.encoded_starts(), vec![0, 1]);

        Ok(())
    }

    #[test]
    fn it_drops_unknown_metadata_columns() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let request = RowsRequest::new(Request::try_new(0, 2)?)
            .metadata(vec![String::from("x"), String::from("label")]);

        let rows = engine().rows(&request)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.options().metadata(), &[String::from("label")]);
        assert!(rows.column("x").is_none());

        let request = RowsRequest::new(Request::try_new(0, 2)?).metadata(vec![String::from("x")]);
        let rows = engine().rows(&request)?;
        assert_eq!(rows.len(), 2);
        assert!(rows.options().metadata().is_empty());

        Ok(())
    }

    #[test]
    fn it_aggregates_values() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = Request::try_new(0, 6)?.try_select("1-1", SelectionType::Node)?;
        let values = engine().values(&ValuesRequest::new(request, "m"))?;

        assert_eq!(values.values(), &[0.0, 1.0, 3.0, 5.0]);
        assert_eq!(values.indices(), &[0, 1, 2, 3]);

        // The range is widened to cover the whole collapsed node.
        let request = Request::try_new(3, 6)?.try_select("1-1", SelectionType::Node)?;
        let values = engine().values(&ValuesRequest::new(request, "m"))?;

        assert_eq!(values.global_start_index(), Some(2));
        assert_eq!(values.values(), &[3.0, 5.0]);

        Ok(())
    }

    #[test]
    fn it_handles_unknown_measurements_and_aggregators()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let values = engine().values(&ValuesRequest::new(Request::try_new(0, 6)?, "missing"))?;
        assert!(values.is_empty());

        let request = ValuesRequest::new(Request::try_new(0, 6)?, "m").aggregator("median");
        let err = engine().values(&request).unwrap_err();
        assert_eq!(err.to_string(), "aggregate error: unknown aggregator: `median`");

        Ok(())
    }

    #[test]
    fn it_ignores_unknown_selections() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let request = Request::try_new(0, 6)?
            .try_select("5-5", SelectionType::Node)?
            .try_order("6-6", 1)?;

        let rows = engine().rows(&RowsRequest::new(request))?;
        assert_eq!(rows.len(), 6);

        Ok(())
    }

    #[test]
    fn it_answers_hierarchy_requests() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let engine = engine();

        let tree = engine.hierarchy(&HierarchyRequest::new(1))?.ok_or("no tree")?;
        assert_eq!(tree.len(), 4);

        let tree = engine
            .hierarchy(&HierarchyRequest::new(0).root("1-1".parse()?))?
            .ok_or("no tree")?;
        assert_eq!(tree.node().id().as_str(), "0-0");
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].node().label(), "B");

        assert!(engine
            .hierarchy(&HierarchyRequest::new(1).root("7-7".parse()?))?
            .is_none());

        Ok(())
    }

    #[test]
    fn it_describes_the_dataset() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let engine = engine();

        let measurements = engine.measurements()?;
        assert_eq!(measurements.measurements.len(), 1);
        assert_eq!((measurements.min, measurements.max), (Some(0.0), Some(5.0)));
        assert_eq!(
            measurements.metadata,
            vec!["id", "label", "root", "genus", "lineage"]
        );

        // The bounds are memoized.
        assert_eq!(engine.measurements()?.max, Some(5.0));

        assert_eq!(engine.levels()?.len(), 2);
        assert_eq!(engine.partitions()?.len(), 1);
        assert_eq!(engine.aggregating_functions(), vec!["average"]);

        Ok(())
    }
}
