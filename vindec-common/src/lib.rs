//! # vindec Common Library
//!
//! Shared code for the vindec crates:
//! - Error type
//! - Bootstrap configuration and root folder resolution
//! - SQLite initialization and schema

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
