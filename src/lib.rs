//! `hiertrack` is a crate for serving hierarchical genomic track data.
//!
//! Track data is a flat sequence of rows, each with a global index, that sits
//! underneath a taxonomic hierarchy. A client may collapse any subtree of the
//! hierarchy into a single aggregate row, hide a subtree entirely, or reorder
//! the children of a branch. The facilities in this crate take those requests
//! and turn a sorted stream of raw rows into the compacted, reordered sequence
//! the client asked for.
//!
//! The crate provides three main points of entry:
//!
//! - Resolving a selection into a canonical set of collapse nodes and an index
//!   remapping ([`selection::Resolver`] and [`selection::Resolution`]).
//! - Merging a sorted cursor of raw rows or values with those collapse nodes
//!   ([`merge::merge_rows()`] and [`merge::merge_values()`]).
//! - Reordering the merged sequence according to per-branch order overrides
//!   ([`order::OrderedIntervalTree`]).
//!
//! Most users will want the [`api::Engine`], which strings all three together
//! over a host data source (anything implementing the traits in [`source`]).
//! An in-memory [`source::Dataset`] is provided for tests and small datasets.
//!
//! ```
//! use hiertrack::api::Engine;
//! use hiertrack::api::Request;
//! use hiertrack::api::RowsRequest;
//! use hiertrack::hierarchy::SelectionType;
//! use hiertrack::source::Dataset;
//!
//! let data = r#"{
//!     "levels": ["root", "genus"],
//!     "nodes": [
//!         {"id": "0-0", "label": "root", "start": 0, "end": 4, "leafIndex": 0, "nleaves": 4,
//!          "lineage": ["0-0"], "lineageLabel": ["root"], "nchildren": 2},
//!         {"id": "1-0", "label": "A", "parentId": "0-0", "start": 0, "end": 2, "leafIndex": 0,
//!          "nleaves": 2, "lineage": ["0-0", "1-0"], "lineageLabel": ["root", "A"], "order": 0},
//!         {"id": "1-1", "label": "B", "parentId": "0-0", "start": 2, "end": 4, "leafIndex": 2,
//!          "nleaves": 2, "lineage": ["0-0", "1-1"], "lineageLabel": ["root", "B"], "order": 1}
//!     ],
//!     "rows": [
//!         {"index": 0, "start": 0, "end": 1, "metadata": {"label": "a0"}},
//!         {"index": 1, "start": 1, "end": 2, "metadata": {"label": "a1"}},
//!         {"index": 2, "start": 2, "end": 3, "metadata": {"label": "b0"}},
//!         {"index": 3, "start": 3, "end": 4, "metadata": {"label": "b1"}}
//!     ]
//! }"#;
//!
//! let engine = Engine::new(Dataset::from_json(data)?);
//!
//! let request = Request::try_new(0, 4)?.try_select("1-0", SelectionType::Node)?;
//! let rows = engine.rows(&RowsRequest::new(request))?;
//!
//! // The two rows under `A` collapse into a single row at index zero.
//! assert_eq!(rows.len(), 3);
//! assert_eq!(rows.indices(), Some(&[0, 1, 2][..]));
//! assert_eq!(rows.starts(), &[0, 2, 3]);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod aggregate;
pub mod api;
pub mod collection;
pub mod hierarchy;
pub mod interval;
pub mod merge;
pub mod order;
pub mod selection;
pub mod source;

pub use interval::Interval;
pub use interval::Span;
