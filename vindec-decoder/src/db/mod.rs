//! Database access for vindec-decoder
//!
//! Schema creation lives in `vindec_common::db`; this module holds the
//! queries.

pub mod decodes;
pub mod settings;
pub mod submissions;
