//! Node identifiers.
//!
//! A node identifier takes the form `<depth>-<ordinal>`, where both parts are
//! written in hexadecimal. The depth can therefore always be recovered from
//! the identifier alone, which is how subtree requests determine where the
//! requested node sits without consulting the hierarchy first.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

/// The identifier of the root of every hierarchy.
pub const ROOT: &str = "0-0";

/// The pattern a node identifier must match.
static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-fA-F]+)-([0-9a-fA-F]+)$").unwrap());

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`NodeId`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The identifier did not take the form `<depth>-<ordinal>`.
    Malformed(String),

    /// The depth portion of the identifier does not fit in a depth.
    DepthOutOfRange(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Malformed(value) => write!(f, "malformed node id: `{value}`"),
            Error::DepthOutOfRange(value) => {
                write!(f, "depth in node id is out of range: `{value}`")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Node identifiers
////////////////////////////////////////////////////////////////////////////////////////

/// The identifier of a node within the hierarchy.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    /// The identifier as it was provided.
    inner: String,

    /// The depth encoded in the identifier.
    depth: u32,
}

impl NodeId {
    /// Gets the identifier of the root node.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::NodeId;
    ///
    /// let root = NodeId::root();
    /// assert_eq!(root.as_str(), "0-0");
    /// assert_eq!(root.depth(), 0);
    /// ```
    pub fn root() -> Self {
        Self {
            inner: String::from(ROOT),
            depth: 0,
        }
    }

    /// Gets the depth encoded in the identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use hiertrack::hierarchy::NodeId;
    ///
    /// let id = "a-1f".parse::<NodeId>()?;
    /// assert_eq!(id.depth(), 10);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Gets the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether this is the identifier of the root node.
    pub fn is_root(&self) -> bool {
        self.inner == ROOT
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = PATTERN
            .captures(s)
            .ok_or_else(|| Error::Malformed(s.to_string()))?;

        // SAFETY: the pattern always has a first capture group when it
        // matches.
        let depth = u32::from_str_radix(&captures[1], 16)
            .map_err(|_| Error::DepthOutOfRange(s.to_string()))?;

        Ok(Self {
            inner: s.to_string(),
            depth,
        })
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.inner
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}
