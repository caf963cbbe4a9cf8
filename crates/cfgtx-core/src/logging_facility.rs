//! Structured logging facility for cfgtx
//!
//! This module provides the canonical logging facility:
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Only the strategy layer owns operation boundaries. Transactions, brokers
//! and RPC clients log at `debug`/`warn` and never emit start/end events.
//!
//! # Usage
//!
//! ```rust
//! use cfgtx_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
