//! cfgtx Broker - transactions against a local data broker
//!
//! Provides:
//! - The broker interface (read-only and read-write broker transactions)
//! - An in-memory broker with snapshot isolation and a commit hook
//! - `BrokerTransaction`, the `Transaction` implementation over a broker
//! - Decoding of broker commit failures into transaction errors

pub mod broker;
pub mod errors;
pub mod hook;
pub mod memory;
pub mod transaction;

// Re-export key types
pub use broker::{BrokerReadTx, BrokerReadWriteTx, DataBroker};
pub use errors::{BrokerError, CommitFailure, DocumentedError};
pub use hook::{BrokerCommitHook, NoopCommitHook, RejectingCommitHook};
pub use memory::MemoryBroker;
pub use transaction::BrokerTransaction;
