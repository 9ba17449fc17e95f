//! Fusion of per-source decode results
//!
//! Fixed precedence: the primary source wins, the secondary only fills gaps.

pub mod record_merger;

pub use record_merger::{contributing_source, merge};
