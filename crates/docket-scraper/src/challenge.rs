//! Challenge detection, submission, and the caller hand-off point.
//!
//! The portal gates searches behind an image captcha. We never attempt
//! automated solving: the image is captured, parked with an attempt id,
//! and the run suspends until a human supplies the code through the
//! [`ChallengeExchange`] or the wait window lapses.

use crate::error::{Result, SearchError};
use crate::site::SiteProfile;
use docket_browser::{BrowserError, SessionActions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

/// How long the panel waits for the captcha image element to appear
/// before deciding the page has no challenge.
const DETECT_TIMEOUT_MS: u64 = 1500;

/// A challenge captured from the live page.
#[derive(Debug, Clone)]
pub struct ChallengeArtifact {
    /// PNG screenshot of the captcha image element
    pub image_png: Vec<u8>,
}

/// Verdict of the portal after a code was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The code was accepted and the search went through
    Accepted,
    /// The code was wrong
    Rejected,
    /// The challenge lapsed before the code arrived
    Expired,
}

/// Seam between the orchestrator and the captcha mechanics.
///
/// The production implementation is [`CaptchaPanel`]; tests script a
/// fake with a queue of outcomes.
#[async_trait::async_trait]
pub trait ChallengeResolver: Send + Sync {
    /// Capture the current challenge, or `None` if the page shows no
    /// captcha.
    async fn extract_challenge(&self) -> Result<Option<ChallengeArtifact>>;

    /// Type the code, submit the form, and classify the portal's
    /// verdict from the resulting page.
    async fn submit_response(&self, code: &str) -> Result<ChallengeOutcome>;

    /// Load a fresh challenge after a rejection or expiry.
    async fn refresh(&self) -> Result<ChallengeArtifact>;
}

/// Captcha handling against a live browser session.
pub struct CaptchaPanel<S: SessionActions> {
    session: Arc<S>,
    profile: SiteProfile,
}

impl<S: SessionActions> CaptchaPanel<S> {
    /// Create a panel sharing the orchestrator's session.
    pub fn new(session: Arc<S>, profile: SiteProfile) -> Self {
        Self { session, profile }
    }

    async fn capture_image(&self) -> Result<ChallengeArtifact> {
        let image_png = self
            .session
            .screenshot_element(&self.profile.form.captcha_image)
            .await?;
        Ok(ChallengeArtifact { image_png })
    }

    fn classify(&self, page_text: &str) -> ChallengeOutcome {
        let lowered = page_text.to_lowercase();
        if self
            .profile
            .expired_markers
            .iter()
            .any(|m| lowered.contains(m.as_str()))
        {
            ChallengeOutcome::Expired
        } else if self
            .profile
            .rejected_markers
            .iter()
            .any(|m| lowered.contains(m.as_str()))
        {
            ChallengeOutcome::Rejected
        } else {
            ChallengeOutcome::Accepted
        }
    }
}

#[async_trait::async_trait]
impl<S: SessionActions> ChallengeResolver for CaptchaPanel<S> {
    async fn extract_challenge(&self) -> Result<Option<ChallengeArtifact>> {
        match self
            .session
            .wait_for_selector(&self.profile.form.captcha_image, DETECT_TIMEOUT_MS)
            .await
        {
            Ok(()) => {
                let artifact = self.capture_image().await?;
                tracing::debug!(
                    bytes = artifact.image_png.len(),
                    "captured challenge image"
                );
                Ok(Some(artifact))
            }
            Err(BrowserError::Timeout(_) | BrowserError::SelectorNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn submit_response(&self, code: &str) -> Result<ChallengeOutcome> {
        self.session
            .fill_field(&self.profile.form.captcha_input, code)
            .await?;
        self.session
            .click(&self.profile.form.submit_button)
            .await?;

        let page = self.session.page_content().await?;
        let outcome = self.classify(&page);
        tracing::debug!(?outcome, "challenge submission classified");
        Ok(outcome)
    }

    async fn refresh(&self) -> Result<ChallengeArtifact> {
        if let Some(refresh) = &self.profile.form.captcha_refresh {
            // Missing refresh control is not fatal: the caller already
            // re-navigated, which loads a fresh challenge anyway.
            if let Err(e) = self.session.click(refresh).await {
                tracing::debug!(error = %e, "captcha refresh control not clickable");
            }
        }
        self.session
            .wait_for_selector(&self.profile.form.captcha_image, DETECT_TIMEOUT_MS)
            .await?;
        self.capture_image().await
    }
}

struct PendingEntry {
    artifact: ChallengeArtifact,
    waiter: Option<oneshot::Sender<String>>,
}

/// A challenge currently awaiting a code from the caller.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    /// Attempt the challenge belongs to
    pub attempt_id: String,
    /// The captured image to show the caller
    pub artifact: ChallengeArtifact,
}

/// Removes a pending entry when the waiting future goes away, however
/// it goes away: resolved, timed out, or dropped mid-await by the
/// orchestrator's cancellation/budget select.
struct PendingSlot<'a> {
    pending: &'a Mutex<HashMap<String, PendingEntry>>,
    attempt_id: String,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.attempt_id);
    }
}

/// Hand-off point between suspended search runs and the external layer.
///
/// A run parks its challenge here and awaits a code; the layer serving
/// users lists pending challenges and feeds codes back by attempt id.
/// The map uses a synchronous lock (never held across an await) so
/// entry cleanup can run inside `Drop`.
#[derive(Default)]
pub struct ChallengeExchange {
    pending: Mutex<HashMap<String, PendingEntry>>,
}

impl ChallengeExchange {
    /// Create an empty exchange.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, PendingEntry>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Park `artifact` and wait up to `wait` for a code.
    ///
    /// The entry is removed on every exit path — resolution, timeout,
    /// or the whole run being cancelled out from under the wait — so a
    /// late [`supply_code`](Self::supply_code) simply finds nothing.
    pub async fn await_code(
        &self,
        attempt_id: &str,
        artifact: ChallengeArtifact,
        wait: Duration,
    ) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(
            attempt_id.to_string(),
            PendingEntry {
                artifact,
                waiter: Some(tx),
            },
        );
        let _slot = PendingSlot {
            pending: &self.pending,
            attempt_id: attempt_id.to_string(),
        };
        tracing::info!(%attempt_id, "awaiting captcha code");

        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(code)) => Ok(code),
            // Elapsed, or the sender was dropped while the entry was
            // being torn down.
            _ => Err(SearchError::ChallengeTimeout {
                waited_secs: wait.as_secs(),
            }),
        }
    }

    /// Park `artifact` without waiting.
    ///
    /// Used in fail-fast mode: the caller is told a captcha is
    /// required, retrieves the image from here, and issues a fresh
    /// request with the code filled in.
    pub async fn park(&self, attempt_id: &str, artifact: ChallengeArtifact) {
        self.lock_pending().insert(
            attempt_id.to_string(),
            PendingEntry {
                artifact,
                waiter: None,
            },
        );
    }

    /// Supply a code for a parked challenge.
    ///
    /// Returns `true` if a suspended run was woken. A parked (fail
    /// fast) entry has no waiter; supplying a code for it just clears
    /// the entry and returns `false`.
    pub async fn supply_code(&self, attempt_id: &str, code: &str) -> bool {
        let Some(mut entry) = self.lock_pending().remove(attempt_id) else {
            return false;
        };
        match entry.waiter.take() {
            Some(tx) => tx.send(code.to_string()).is_ok(),
            None => false,
        }
    }

    /// Snapshot of challenges currently awaiting codes.
    pub async fn pending(&self) -> Vec<PendingChallenge> {
        self.lock_pending()
            .iter()
            .map(|(id, entry)| PendingChallenge {
                attempt_id: id.clone(),
                artifact: entry.artifact.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ChallengeArtifact {
        ChallengeArtifact {
            image_png: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn test_supply_code_wakes_waiter() {
        let exchange = Arc::new(ChallengeExchange::new());

        let waiter = {
            let exchange = Arc::clone(&exchange);
            tokio::spawn(async move {
                exchange
                    .await_code("attempt-1", artifact(), Duration::from_secs(5))
                    .await
            })
        };

        // Let the waiter park its entry first.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(exchange.pending().await.len(), 1);

        assert!(exchange.supply_code("attempt-1", "AB12").await);
        let code = waiter.await.expect("join").expect("code");
        assert_eq!(code, "AB12");
        assert!(exchange.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_await_code_times_out() {
        let exchange = ChallengeExchange::new();
        let result = exchange
            .await_code("attempt-1", artifact(), Duration::from_millis(30))
            .await;
        assert!(matches!(
            result,
            Err(SearchError::ChallengeTimeout { .. })
        ));
        assert!(exchange.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_wait_clears_pending_entry() {
        let exchange = Arc::new(ChallengeExchange::new());

        let waiter = {
            let exchange = Arc::clone(&exchange);
            tokio::spawn(async move {
                exchange
                    .await_code("attempt-1", artifact(), Duration::from_secs(60))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(exchange.pending().await.len(), 1);

        // The run dies mid-wait (cancellation, budget expiry); its
        // entry must not outlive it.
        waiter.abort();
        let _ = waiter.await;

        assert!(exchange.pending().await.is_empty());
        assert!(!exchange.supply_code("attempt-1", "AB12").await);
    }

    #[tokio::test]
    async fn test_supply_code_unknown_attempt() {
        let exchange = ChallengeExchange::new();
        assert!(!exchange.supply_code("no-such-attempt", "AB12").await);
    }

    #[tokio::test]
    async fn test_parked_challenge_listed_but_has_no_waiter() {
        let exchange = ChallengeExchange::new();
        exchange.park("attempt-1", artifact()).await;

        let pending = exchange.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempt_id, "attempt-1");

        assert!(!exchange.supply_code("attempt-1", "AB12").await);
        assert!(exchange.pending().await.is_empty());
    }
}
