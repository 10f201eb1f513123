pub mod decode;
pub mod driver_set;
pub mod entropy;
pub mod title;
pub mod tree;

pub use decode::{DecodeError, Decoder, MalformedTree, parse_assignment};
pub use driver_set::{DriverSet, UnknownVariable};
pub use entropy::partition_entropy;
pub use title::{Span, Title, Tone};
pub use tree::{Branch, DecodedTree, NodeKind, TreeEdge, TreeNode};
