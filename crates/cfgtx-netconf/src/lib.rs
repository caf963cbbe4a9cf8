//! cfgtx Netconf - transactions against a remote configuration device
//!
//! Provides:
//! - The RPC client interface a device session exposes
//! - `NetconfTransaction`: lock, queued edits, commit or compensate
//! - `LoopbackDevice`: an in-process device with candidate and running
//!   datastores, a call journal and fault injection

pub mod client;
pub mod loopback;
pub mod queue;
pub mod transaction;

// Re-export key types
pub use client::{DeviceReader, RpcClient};
pub use loopback::{Fault, LoopbackDevice, RpcCall};
pub use transaction::NetconfTransaction;
