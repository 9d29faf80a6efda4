//! Recovers a feature model from feature and mapping metadata attached to
//! source elements.
//!
//! The pipeline is synchronous and single-threaded:
//! [`scanner::scan`] → [`builder::build`] → [`export::export`].

pub mod builder;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod scanner;
pub mod validation;

pub use builder::build;
pub use error::{ExportError, ScanError};
pub use scanner::scan;
