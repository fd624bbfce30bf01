//! Docket Core - shared foundation for the case search engine.
//!
//! Provides the validated natural-key and record types, the central
//! error type, TOML configuration with environment overrides, and the
//! case-type catalog. Higher-level crates (`docket-browser`,
//! `docket-db`, `docket-scraper`) build on these without depending on
//! each other's internals.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod case_types;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserSettings, SearchSettings, StorageSettings};
pub use error::{ConfigError, ConfigResult, DocketError, Result};
pub use types::{CaseKey, CaseRecord, OrderEntry, SearchFailure, SearchRequest};
