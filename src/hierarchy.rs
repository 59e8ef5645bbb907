//! The taxonomic hierarchy that sits above the rows of a track.

pub mod id;
pub mod node;
pub mod tree;

pub use id::NodeId;
pub use node::Node;
pub use node::SelectionType;
pub use tree::Subtree;
