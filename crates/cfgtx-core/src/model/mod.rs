//! Data model: qualified paths, normalized nodes and an in-memory tree

pub mod node;
pub mod path;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use node::{Children, DataNode, ListOrdering, NodeKind};
pub use path::{DataPath, KeyPredicates, PathArg, QName, Scalar};
pub use tree::DataTree;

/// Logical datastore addressed by a read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datastore {
    Configuration,
    Operational,
}

impl std::fmt::Display for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datastore::Configuration => write!(f, "configuration"),
            Datastore::Operational => write!(f, "operational"),
        }
    }
}
