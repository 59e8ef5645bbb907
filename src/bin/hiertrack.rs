//! A binary to answer track requests against a dataset on disk.
//!
//! ```shell
//! cargo run --release --bin=hiertrack --features=binaries -- \
//!     dataset.json.gz rows 0 1000 --selection '{"2-1a": 2}'
//! ```
//!
//! The dataset is a JSON document (optionally gzipped) in the shape read by
//! [`Dataset`]. Each subcommand answers one request and prints the response as
//! JSON or, with `--table`, as a table.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use hiertrack::Interval as _;
use hiertrack::api;
use hiertrack::api::Engine;
use hiertrack::api::HierarchyRequest;
use hiertrack::api::Request;
use hiertrack::api::RowsRequest;
use hiertrack::api::ValuesRequest;
use hiertrack::collection::RowCollection;
use hiertrack::collection::ValueCollection;
use hiertrack::hierarchy::NodeId;
use hiertrack::source::Dataset;
use omics::coordinate::Contig;
use omics::coordinate::position::Number;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Rows;
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

////////////////////////////////////////////////////////////////////////////////////////
// Arguments
////////////////////////////////////////////////////////////////////////////////////////

/// The parts of a request shared by rows and values.
#[derive(clap::Args, Debug)]
struct RangeArgs {
    /// The inclusive start of the range.
    start: Number,

    /// The exclusive end of the range.
    end: Number,

    /// The partition to restrict to.
    #[arg(short, long)]
    partition: Option<String>,

    /// The selection as a JSON object of node ids to selection types
    /// (0 = none, 1 = leaves, 2 = node).
    #[arg(short, long, default_value = "{}")]
    selection: String,

    /// The level selection as a JSON object of depths to selection types.
    #[arg(short = 'l', long, default_value = "{}")]
    selected_levels: String,

    /// The order overrides as a JSON object of node ids to orders.
    #[arg(short, long, default_value = "{}")]
    order: String,
}

impl RangeArgs {
    /// Converts the arguments into a [`Request`].
    fn request(&self) -> Result<Request> {
        let selection = api::parse_selection(&self.selection, &self.selected_levels)
            .context("parsing the selection")?;
        let order = api::parse_order(&self.order).context("parsing the order")?;

        let mut request = Request::try_new(self.start, self.end)?
            .with_selection(selection)
            .with_order(order);

        if let Some(partition) = &self.partition {
            let partition: Contig = partition.as_str().into();
            request = request.with_partition(partition);
        }

        Ok(request)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints the label of each level of the hierarchy.
    Levels,

    /// Prints the extent of each partition.
    Partitions,

    /// Prints the available measurements.
    Measurements,

    /// Prints the names of the registered aggregators.
    Aggregators,

    /// Prints a subtree of the hierarchy.
    Hierarchy {
        /// The root of the subtree.
        #[arg(short, long, default_value = "0-0")]
        node: String,

        /// The number of levels beneath the root to include.
        #[arg(short, long, default_value_t = 1)]
        depth: u32,

        /// The selection to overlay, as for `rows`.
        #[arg(short, long, default_value = "{}")]
        selection: String,

        /// The level selection to overlay, as for `rows`.
        #[arg(short = 'l', long, default_value = "{}")]
        selected_levels: String,

        /// The order overrides to overlay, as for `rows`.
        #[arg(short, long, default_value = "{}")]
        order: String,
    },

    /// Prints the rows of a range.
    Rows {
        #[command(flatten)]
        range: RangeArgs,

        /// The metadata columns to return (every column when omitted).
        #[arg(short, long, value_delimiter = ',')]
        metadata: Vec<String>,

        /// Omits the index of each row.
        #[arg(long, default_value_t = false)]
        no_index: bool,

        /// Omits the end of each row.
        #[arg(long, default_value_t = false)]
        no_end: bool,

        /// Returns starts and ends as deltas from the previous row.
        #[arg(long, default_value_t = false)]
        offset: bool,
    },

    /// Prints the values of a measurement over a range.
    Values {
        /// The measurement.
        measurement: String,

        #[command(flatten)]
        range: RangeArgs,

        /// The aggregator for collapsed nodes.
        #[arg(short, long)]
        aggregator: Option<String>,
    },
}

#[derive(Debug, Parser)]
struct Args {
    /// The dataset (JSON, optionally gzipped).
    dataset: PathBuf,

    /// Whether to print a table rather than JSON.
    #[arg(short, long, default_value_t = false, global = true)]
    table: bool,

    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity,
}

////////////////////////////////////////////////////////////////////////////////////////
// Output
////////////////////////////////////////////////////////////////////////////////////////

/// Prints a value as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serializing the response")?
    );
    Ok(())
}

/// Prints a table with a header row.
fn print_table(builder: Builder) {
    let table = builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string();

    println!("{}", table);
}

/// Renders rows as a table.
fn rows_table(rows: &RowCollection) -> Builder {
    let columns = rows
        .options()
        .metadata()
        .iter()
        .chain(rows.options().levels().iter())
        .cloned()
        .collect::<Vec<_>>();

    let mut builder = Builder::default();
    builder.push_record(
        ["Index", "Start", "End"]
            .into_iter()
            .map(String::from)
            .chain(columns.iter().cloned()),
    );

    for row in rows.iter() {
        builder.push_record(
            [
                row.index().to_string(),
                row.start().to_string(),
                row.end().to_string(),
            ]
            .into_iter()
            .chain(
                columns
                    .iter()
                    .map(|column| row.metadata(column).unwrap_or("<None>").to_string()),
            ),
        );
    }

    builder
}

/// Renders values as a table.
fn values_table(values: &ValueCollection) -> Builder {
    let mut builder = Builder::default();
    builder.push_record(["Index", "Start", "End", "Value"]);

    for (i, value) in values.values().iter().enumerate() {
        builder.push_record([
            values.indices()[i].to_string(),
            values.starts()[i].to_string(),
            values.ends()[i].to_string(),
            value.to_string(),
        ]);
    }

    builder
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

fn run(args: Args) -> Result<()> {
    let dataset = Dataset::from_path(&args.dataset)
        .with_context(|| format!("reading dataset from `{}`", args.dataset.display()))?;

    info!(name = dataset.name(), "loaded dataset");
    let engine = Engine::new(dataset);

    match args.command {
        Command::Levels => {
            let levels = engine.levels()?;

            match args.table {
                true => {
                    let mut builder = Builder::default();
                    builder.push_record(["Depth", "Label"]);

                    for (depth, label) in levels {
                        builder.push_record([depth.to_string(), label]);
                    }

                    print_table(builder);
                }
                false => print_json(&levels)?,
            }
        }
        Command::Partitions => {
            let partitions = engine.partitions()?;

            let mut builder = Builder::default();
            builder.push_record(["Partition", "Start", "End"]);

            let mut json = serde_json::Map::new();

            for partition in partitions {
                let name = partition
                    .name
                    .as_ref()
                    .map(|name| (**name).to_string())
                    .unwrap_or_default();

                builder.push_record([
                    name.clone(),
                    partition.start.to_string(),
                    partition.end.to_string(),
                ]);
                json.insert(name, serde_json::json!([partition.start, partition.end]));
            }

            match args.table {
                true => print_table(builder),
                false => print_json(&json)?,
            }
        }
        Command::Measurements => print_json(&engine.measurements()?)?,
        Command::Aggregators => print_json(&engine.aggregating_functions())?,
        Command::Hierarchy {
            node,
            depth,
            selection,
            selected_levels,
            order,
        } => {
            let root = node
                .parse::<NodeId>()
                .with_context(|| format!("parsing node id `{node}`"))?;
            let selection = api::parse_selection(&selection, &selected_levels)
                .context("parsing the selection")?;
            let order = api::parse_order(&order).context("parsing the order")?;

            let request = HierarchyRequest::new(depth)
                .root(root)
                .selection(selection)
                .order(order);

            match engine.hierarchy(&request)? {
                Some(tree) => print_json(&tree)?,
                None => bail!("node `{node}` does not exist"),
            }
        }
        Command::Rows {
            range,
            metadata,
            no_index,
            no_end,
            offset,
        } => {
            let mut request = RowsRequest::new(range.request()?)
                .retrieve_index(!no_index)
                .retrieve_end(!no_end)
                .use_offset(offset);

            if !metadata.is_empty() {
                request = request.metadata(metadata);
            }

            let rows = engine.rows(&request)?;

            match args.table {
                true => print_table(rows_table(&rows)),
                false => print_json(&rows)?,
            }
        }
        Command::Values {
            measurement,
            range,
            aggregator,
        } => {
            let mut request = ValuesRequest::new(range.request()?, measurement);

            if let Some(aggregator) = aggregator {
                request = request.aggregator(aggregator);
            }

            let values = engine.values(&request)?;

            match args.table {
                true => print_table(values_table(&values)),
                false => print_json(&values)?,
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .with_writer(std::io::stderr)
            .init(),
    };

    run(args)
}
