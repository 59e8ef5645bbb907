//! Aggregation of the values beneath a collapsed node.

use std::collections::BTreeMap;
use std::sync::Arc;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to aggregation.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// No aggregator is registered under the name.
    UnknownAggregator(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnknownAggregator(name) => write!(f, "unknown aggregator: `{name}`"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Aggregators
////////////////////////////////////////////////////////////////////////////////////////

/// The name of the aggregator used when a request does not name one.
pub const DEFAULT: &str = "average";

/// Reduces the values beneath a collapsed node to a single value.
pub trait Aggregator: std::fmt::Debug + Send + Sync {
    /// The name the aggregator is registered under.
    fn id(&self) -> &str;

    /// Reduces `values` to a single value.
    fn aggregate(&self, values: &[f64]) -> f64;
}

/// The arithmetic mean. The mean of no values is zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct Average;

impl Aggregator for Average {
    fn id(&self) -> &str {
        "average"
    }

    fn aggregate(&self, values: &[f64]) -> f64 {
        match values.len() {
            0 => 0.0,
            n => values.iter().sum::<f64>() / n as f64,
        }
    }
}

/// Creates the built-in [`Average`] aggregator.
fn average() -> Arc<dyn Aggregator> {
    Arc::new(Average)
}

/// The aggregators every [`Registry`] starts with.
const BUILTINS: &[fn() -> Arc<dyn Aggregator>] = &[average];

////////////////////////////////////////////////////////////////////////////////////////
// Registry
////////////////////////////////////////////////////////////////////////////////////////

/// A registry of aggregators keyed by name.
#[derive(Clone, Debug)]
pub struct Registry {
    /// The aggregators.
    inner: BTreeMap<String, Arc<dyn Aggregator>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self {
            inner: BTreeMap::new(),
        };

        for builtin in BUILTINS {
            registry.register(builtin());
        }

        registry
    }
}

impl Registry {
    /// Registers an aggregator, replacing any aggregator with the same name.
    pub fn register(&mut self, aggregator: Arc<dyn Aggregator>) {
        self.inner.insert(aggregator.id().to_string(), aggregator);
    }

    /// Gets the aggregator registered under `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::aggregate::Registry;
    ///
    /// let registry = Registry::default();
    ///
    /// let average = registry.get("average")?;
    /// assert_eq!(average.aggregate(&[1.0, 2.0, 6.0]), 3.0);
    ///
    /// assert!(registry.get("median").is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn get(&self, name: &str) -> Result<&dyn Aggregator> {
        self.inner
            .get(name)
            .map(|aggregator| aggregator.as_ref())
            .ok_or_else(|| Error::UnknownAggregator(name.to_string()))
    }

    /// Gets the names of every registered aggregator in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.inner.keys().map(|name| name.as_str()).collect()
    }
}
