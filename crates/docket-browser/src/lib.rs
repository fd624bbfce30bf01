//! Browser session management for the court-records site.
//!
//! Owns the lifecycle of one remote browsing session: launch, navigate
//! with a bounded page-load timeout, and idempotent teardown. Knows
//! nothing about court-specific semantics; the orchestrator drives it
//! through the `SessionActions` seam.

pub mod actions;
pub mod error;
pub mod fingerprint;
pub mod health;
pub mod session;

pub use actions::SessionActions;
pub use error::{BrowserError, Result};
pub use health::backend_available;
pub use session::Session;
