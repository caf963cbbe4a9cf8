//! Command orchestration layer.
//!
//! Each command opens a transaction on the selected backend, applies its
//! edits, and commits. A failing edit cancels the transaction before the
//! error is returned.

pub mod patch;
pub mod read;
pub mod strategy;
pub mod write;
