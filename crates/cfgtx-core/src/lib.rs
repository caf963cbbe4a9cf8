//! cfgtx Core - transactional semantics over schema-described data trees
//!
//! This crate provides the backend-independent half of cfgtx, including:
//! - The data model: paths, data nodes and an in-memory data tree
//! - The schema interface consumed by the transaction layer (plus a static
//!   schema tree implementation)
//! - The RPC result model shared by every backend
//! - Batched existence checking, ordered-insertion planning and the
//!   config/state merge reader
//! - The `Transaction` contract and its lifecycle bookkeeping
//! - The error and logging facilities used across the workspace

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod rpc;
pub mod schema;
pub mod transaction;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, TxError};
pub use model::{DataNode, DataPath, DataTree, Datastore, ListOrdering, PathArg, QName, Scalar};
pub use ops::edit::{EditOperation, InsertPosition};
pub use rpc::{ErrorSeverity, ErrorTag, RpcError, RpcResult};
pub use schema::{SchemaContext, SchemaNode, SchemaTree};
pub use transaction::{CommitInfo, DataReader, Transaction, TxState};
