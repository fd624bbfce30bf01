//! Failure taxonomy for search orchestration.
//!
//! Every terminal failure of a search run maps to exactly one variant
//! here, and every variant carries a stable machine-readable `kind`
//! string plus an outcome for the attempt log. Messages describe what
//! happened without quoting remote page content.

use docket_core::types::SearchFailure;
use docket_db::AttemptOutcome;
use thiserror::Error;

/// Terminal failure of a search run.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request was rejected before any network interaction
    #[error("validation failed: {0}")]
    Validation(String),

    /// The court site could not be reached within the retry budget
    #[error("court site unreachable: {0}")]
    SiteUnreachable(String),

    /// A challenge was surfaced and the caller must supply a code
    #[error("captcha code required for attempt {attempt_id}")]
    ChallengeRequired {
        /// Identifier the caller quotes back when supplying the code
        attempt_id: String,
    },

    /// No code arrived within the challenge wait window
    #[error("no captcha code arrived within {waited_secs}s")]
    ChallengeTimeout {
        /// Length of the wait window that elapsed
        waited_secs: u64,
    },

    /// Every submitted code was rejected or expired
    #[error("challenge retry budget exhausted after {attempts} submissions")]
    ChallengeExhausted {
        /// Number of codes submitted before giving up
        attempts: u32,
    },

    /// The result page did not match any recognized shape
    #[error("result page unparseable: {0}")]
    Parse(String),

    /// The persistence layer failed
    #[error("storage failure: {0}")]
    Storage(#[from] docket_db::StorageError),

    /// The run was cancelled by the caller
    #[error("search cancelled")]
    Cancelled,

    /// The overall attempt budget elapsed before a terminal state
    #[error("attempt budget of {budget_secs}s exceeded")]
    DeadlineExceeded {
        /// Overall wall-clock budget that elapsed
        budget_secs: u64,
    },
}

impl SearchError {
    /// Stable discriminator for the external layer and the attempt log.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::SiteUnreachable(_) => "site_unreachable",
            Self::ChallengeRequired { .. } => "captcha_required",
            Self::ChallengeTimeout { .. } => "challenge_timeout",
            Self::ChallengeExhausted { .. } => "challenge_exhausted",
            Self::Parse(_) => "parse_error",
            Self::Storage(_) => "storage_error",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }

    /// Outcome recorded for the attempt row.
    #[must_use]
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::ChallengeRequired { .. } => AttemptOutcome::CaptchaRequired,
            Self::ChallengeTimeout { .. } | Self::DeadlineExceeded { .. } => {
                AttemptOutcome::Timeout
            }
            _ => AttemptOutcome::Failed,
        }
    }

    /// Shape handed to the external layer.
    #[must_use]
    pub fn to_failure(&self) -> SearchFailure {
        SearchFailure {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<docket_browser::BrowserError> for SearchError {
    fn from(err: docket_browser::BrowserError) -> Self {
        // Any session-level fault mid-run means the site (or our link
        // to it) is gone; the retry loops decide how often to try.
        Self::SiteUnreachable(err.to_string())
    }
}

impl From<docket_core::DocketError> for SearchError {
    fn from(err: docket_core::DocketError) -> Self {
        match err {
            docket_core::DocketError::Validation(msg) => Self::Validation(msg),
            other => Self::SiteUnreachable(other.to_string()),
        }
    }
}

/// Result alias used throughout the scraper crate.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(
            SearchError::Validation("x".into()).kind(),
            "validation_error"
        );
        assert_eq!(
            SearchError::SiteUnreachable("x".into()).kind(),
            "site_unreachable"
        );
        assert_eq!(
            SearchError::ChallengeExhausted { attempts: 3 }.kind(),
            "challenge_exhausted"
        );
        assert_eq!(SearchError::Cancelled.kind(), "cancelled");
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            SearchError::ChallengeTimeout { waited_secs: 120 }.outcome(),
            AttemptOutcome::Timeout
        );
        assert_eq!(
            SearchError::DeadlineExceeded { budget_secs: 300 }.outcome(),
            AttemptOutcome::Timeout
        );
        assert_eq!(
            SearchError::ChallengeRequired {
                attempt_id: "a".into()
            }
            .outcome(),
            AttemptOutcome::CaptchaRequired
        );
        assert_eq!(
            SearchError::Parse("bad".into()).outcome(),
            AttemptOutcome::Failed
        );
        assert_eq!(SearchError::Cancelled.outcome(), AttemptOutcome::Failed);
    }

    #[test]
    fn test_failure_shape() {
        let failure = SearchError::ChallengeExhausted { attempts: 3 }.to_failure();
        assert_eq!(failure.kind, "challenge_exhausted");
        assert!(failure.message.contains("3 submissions"));
    }

    #[test]
    fn test_validation_error_carries_message() {
        let err: SearchError =
            docket_core::DocketError::Validation("year out of range".to_string()).into();
        assert!(matches!(err, SearchError::Validation(_)));
        assert!(err.to_string().contains("year out of range"));
    }
}
