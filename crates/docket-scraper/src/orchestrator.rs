//! Search orchestration: one case lookup from request to recorded
//! outcome.
//!
//! The orchestrator walks a fixed phase sequence (validate, navigate,
//! fill, challenge, parse, persist) and guarantees that every run ends
//! with exactly one attempt row, whatever path it took to a terminal
//! state. Cancellation and the overall wall-clock budget wrap the whole
//! run.

use crate::challenge::{ChallengeArtifact, ChallengeExchange, ChallengeOutcome, ChallengeResolver};
use crate::error::{Result, SearchError};
use crate::parser::ResultParser;
use crate::site::SiteProfile;
use chrono::Utc;
use docket_browser::SessionActions;
use docket_core::{case_types, CaseKey, CaseRecord, SearchRequest, SearchSettings};
use docket_db::{cases, search_attempts, AttemptOutcome, Database};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// How long to wait for the result page to render after a submission.
const RESULT_WAIT_MS: u64 = 5000;

/// Phases of a search run, in order. Used for trace output only; the
/// control flow itself is the sequence of calls in `run_attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    FormFilled,
    Submitted,
    ChallengePending,
    ChallengeResolved,
    ResultReady,
}

/// Drives one case search end to end.
pub struct SearchOrchestrator<S, R>
where
    S: SessionActions,
    R: ChallengeResolver,
{
    session: Arc<S>,
    resolver: R,
    db: Arc<Database>,
    exchange: Arc<ChallengeExchange>,
    settings: SearchSettings,
    site: SiteProfile,
    parser: ResultParser,
    cancel: CancellationToken,
}

impl<S, R> SearchOrchestrator<S, R>
where
    S: SessionActions,
    R: ChallengeResolver,
{
    /// Create an orchestrator over a live session and resolver.
    #[must_use]
    pub fn new(
        session: Arc<S>,
        resolver: R,
        db: Arc<Database>,
        exchange: Arc<ChallengeExchange>,
        settings: SearchSettings,
    ) -> Self {
        let site = SiteProfile::delhi_high_court(settings.base_url.clone());
        let parser = ResultParser::new(site.base_url.clone());
        Self {
            session,
            resolver,
            db,
            exchange,
            settings,
            site,
            parser,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the site profile (selectors and markers).
    #[must_use]
    pub fn with_site(mut self, site: SiteProfile) -> Self {
        self.parser = ResultParser::new(site.base_url.clone());
        self.site = site;
        self
    }

    /// Attach a cancellation token; cancelling it aborts the run and
    /// records a `cancelled` attempt.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one search to a terminal state.
    ///
    /// Always logs exactly one attempt row before returning, stamped
    /// with the run's start time. If the row itself cannot be written,
    /// a successful fetch degrades to a storage failure so the caller
    /// never sees a success the log does not know about.
    ///
    /// # Errors
    /// Returns a [`SearchError`] describing the terminal failure.
    pub async fn search(&self, request: &SearchRequest) -> Result<CaseRecord> {
        let submitted_at = Utc::now();
        let attempt_id = Uuid::new_v4().to_string();
        let budget = Duration::from_secs(self.settings.attempt_budget_secs);

        tracing::info!(
            %attempt_id,
            case_type = %request.case_type,
            case_number = %request.case_number,
            year = request.year,
            "starting search"
        );

        let result = tokio::select! {
            () = self.cancel.cancelled() => Err(SearchError::Cancelled),
            run = tokio::time::timeout(budget, self.run_attempt(&attempt_id, request)) => {
                match run {
                    Ok(outcome) => outcome,
                    Err(_) => Err(SearchError::DeadlineExceeded {
                        budget_secs: self.settings.attempt_budget_secs,
                    }),
                }
            }
        };

        if matches!(result, Err(SearchError::Cancelled)) {
            if let Err(e) = self.session.close().await {
                tracing::warn!(error = %e, "session teardown after cancel failed");
            }
        }

        let (outcome, error_detail) = match &result {
            Ok(_) => (AttemptOutcome::Success, None),
            Err(e) => (e.outcome(), Some(format!("{}: {e}", e.kind()))),
        };

        let logged = search_attempts::log_attempt(
            self.db.pool(),
            request.case_type.trim(),
            request.case_number.trim(),
            request.year,
            submitted_at,
            outcome,
            error_detail,
        )
        .await;

        match (result, logged) {
            (Ok(record), Ok(_)) => Ok(record),
            // A success the log does not know about must not be
            // reported as a success.
            (Ok(_), Err(log_err)) => Err(SearchError::Storage(log_err)),
            (Err(run_err), Ok(_)) => Err(run_err),
            (Err(run_err), Err(log_err)) => {
                tracing::error!(error = %log_err, "failed to log attempt outcome");
                Err(run_err)
            }
        }
    }

    async fn run_attempt(&self, attempt_id: &str, request: &SearchRequest) -> Result<CaseRecord> {
        let mut phase = Phase::Init;
        tracing::debug!(%attempt_id, ?phase, "phase entered");

        let key = CaseKey::new(request.case_type.clone(), request.case_number.clone(), request.year)?;
        if !case_types::is_known(key.case_type()) {
            return Err(SearchError::Validation(format!(
                "unknown case type designation '{}'",
                key.case_type()
            )));
        }

        self.navigate_with_retry(&self.site.base_url).await?;
        self.fill_form(&key).await?;
        phase = Phase::FormFilled;
        tracing::debug!(%attempt_id, ?phase, "phase entered");

        match self.resolver.extract_challenge().await? {
            Some(artifact) => {
                self.resolve_challenge(attempt_id, &key, artifact, request.captcha_code.clone())
                    .await?;
            }
            None => {
                self.session.click(&self.site.form.submit_button).await?;
            }
        }
        phase = Phase::Submitted;
        tracing::debug!(%attempt_id, ?phase, "phase entered");

        self.await_result_page().await?;
        phase = Phase::ResultReady;
        tracing::debug!(%attempt_id, ?phase, "phase entered");

        let html = self.session.page_content().await?;
        let record = self.parser.parse(&html, &key)?;

        let case_id = cases::upsert_case(self.db.pool(), &record).await?;
        tracing::info!(%attempt_id, case_id, case = %key, "case persisted");

        Ok(record)
    }

    /// Fill the search form for `key`. The captcha field is left to the
    /// challenge resolver.
    async fn fill_form(&self, key: &CaseKey) -> Result<()> {
        self.session
            .select_option(&self.site.form.case_type_select, key.case_type())
            .await?;
        self.session
            .fill_field(&self.site.form.case_number_input, key.case_number())
            .await?;
        self.session
            .select_option(&self.site.form.year_select, &key.year().to_string())
            .await?;
        Ok(())
    }

    /// Drive the challenge loop until a code is accepted or the budget
    /// runs out.
    ///
    /// The first submission uses the caller's pre-supplied code when
    /// present; later ones always come through the exchange against a
    /// freshly loaded challenge. A code is never submitted twice.
    async fn resolve_challenge(
        &self,
        attempt_id: &str,
        key: &CaseKey,
        mut artifact: ChallengeArtifact,
        presupplied: Option<String>,
    ) -> Result<()> {
        let mut presupplied = presupplied.filter(|code| !code.trim().is_empty());
        let budget = self.settings.challenge_budget.max(1);
        let wait = Duration::from_secs(self.settings.challenge_wait_secs);

        for attempt in 0..budget {
            let code = match presupplied.take() {
                Some(code) => code,
                None => {
                    if wait.is_zero() {
                        // Fail-fast mode: park the image and hand the
                        // attempt back to the caller.
                        self.exchange.park(attempt_id, artifact).await;
                        return Err(SearchError::ChallengeRequired {
                            attempt_id: attempt_id.to_string(),
                        });
                    }
                    tracing::debug!(%attempt_id, phase = ?Phase::ChallengePending, "phase entered");
                    self.exchange
                        .await_code(attempt_id, artifact.clone(), wait)
                        .await?
                }
            };

            match self.resolver.submit_response(&code).await? {
                ChallengeOutcome::Accepted => {
                    tracing::debug!(%attempt_id, phase = ?Phase::ChallengeResolved, "phase entered");
                    return Ok(());
                }
                verdict @ (ChallengeOutcome::Rejected | ChallengeOutcome::Expired) => {
                    tracing::warn!(
                        %attempt_id,
                        ?verdict,
                        submission = attempt + 1,
                        budget,
                        "challenge submission not accepted"
                    );
                    if attempt + 1 < budget {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                        // The portal invalidates the form state after a
                        // bad code; start over with a fresh page and
                        // challenge.
                        self.navigate_with_retry(&self.site.base_url).await?;
                        self.fill_form(key).await?;
                        artifact = self.resolver.refresh().await?;
                    }
                }
            }
        }

        Err(SearchError::ChallengeExhausted { attempts: budget })
    }

    /// Navigate with exponential backoff on transient failures.
    async fn navigate_with_retry(&self, url: &str) -> Result<()> {
        let budget = self.settings.retry_budget.max(1);
        let mut last_error = None;

        for attempt in 0..budget {
            match self.session.navigate(url).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        budget,
                        "navigation failed"
                    );
                    last_error = Some(e);
                    if attempt + 1 < budget {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(SearchError::SiteUnreachable(match last_error {
            Some(e) => format!("navigation retries exhausted: {e}"),
            None => "navigation retries exhausted".to_string(),
        }))
    }

    /// Wait for the result page, retrying through transient blank
    /// states.
    async fn await_result_page(&self) -> Result<()> {
        let budget = self.settings.retry_budget.max(1);

        for attempt in 0..budget {
            match self
                .session
                .wait_for_selector(&self.site.result_marker, RESULT_WAIT_MS)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, attempt = attempt + 1, "result page not ready");
                    if attempt + 1 < budget {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(SearchError::SiteUnreachable(
            "result page did not render".to_string(),
        ))
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.settings.retry_delay_ms.saturating_mul(1 << attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_doubles() {
        // Exercises the arithmetic without constructing a full
        // orchestrator.
        let base: u64 = 2000;
        assert_eq!(base.saturating_mul(1 << 0), 2000);
        assert_eq!(base.saturating_mul(1 << 1), 4000);
        assert_eq!(base.saturating_mul(1 << 2), 8000);
    }

    #[test]
    fn test_phase_order_is_stable() {
        // The trace labels must stay distinguishable.
        let phases = [
            Phase::Init,
            Phase::FormFilled,
            Phase::Submitted,
            Phase::ChallengePending,
            Phase::ChallengeResolved,
            Phase::ResultReady,
        ];
        for window in phases.windows(2) {
            assert_ne!(window[0], window[1]);
        }
    }
}
