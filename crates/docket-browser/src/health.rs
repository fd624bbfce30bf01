//! Backend liveness probe.

use chromiumoxide::browser::BrowserConfig;

/// Whether the browsing backend can currently be initialized.
///
/// Resolves the chromium executable without launching it, so the probe
/// is cheap enough for a health-check endpoint to call on every
/// request.
#[must_use]
pub fn backend_available() -> bool {
    BrowserConfig::builder().no_sandbox().build().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_does_not_panic() {
        // Whether Chrome is installed varies by machine; the probe must
        // answer either way without panicking.
        let _ = backend_available();
    }
}
