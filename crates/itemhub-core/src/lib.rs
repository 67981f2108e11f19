//! # itemhub-core
//!
//! Core crate for ItemHub. Contains configuration schemas, typed
//! identifiers, the materialized-path codec, and the unified error system.
//!
//! This crate has **no** internal dependencies on other ItemHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
