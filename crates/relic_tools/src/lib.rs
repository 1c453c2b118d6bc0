//! # Relic Development Tools
//!
//! Command-line tools for content authors:
//! - Config file validation (RON and JSON)
//! - Schema reference output
//! - Content loading into a [`relic_core::data::ContentRegistry`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod loader;
pub mod validate;

pub use error::{ToolsError, ToolsResult};
