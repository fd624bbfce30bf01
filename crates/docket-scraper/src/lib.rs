//! Docket Scraper - search orchestration against the court portal.
//!
//! Ties the other crates together: drives a browser session through
//! the search form, suspends on captcha challenges until a human
//! supplies the code, parses the result page, and records both the
//! case and the attempt outcome in the store.
//!
//! # Example
//!
//! ```ignore
//! use docket_scraper::{CaptchaPanel, ChallengeExchange, SearchOrchestrator};
//!
//! let exchange = Arc::new(ChallengeExchange::new());
//! let panel = CaptchaPanel::new(session.clone(), site.clone());
//! let orchestrator = SearchOrchestrator::new(session, panel, db, exchange, settings);
//! let record = orchestrator.search(&request).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod challenge;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod pdf;
pub mod site;

// Re-export commonly used types
pub use challenge::{
    CaptchaPanel, ChallengeArtifact, ChallengeExchange, ChallengeOutcome, ChallengeResolver,
    PendingChallenge,
};
pub use error::{Result, SearchError};
pub use orchestrator::SearchOrchestrator;
pub use parser::ResultParser;
pub use pdf::fetch_order_pdf;
pub use site::{FormSelectors, SiteProfile};
