use docket_core::BrowserSettings;
use rand::Rng;

/// Fingerprint configuration for the browsing session.
///
/// Court sites reject obvious automation; a plausible desktop user
/// agent and viewport keep the session indistinguishable from a human
/// visitor.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common desktop user agents
        let user_agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ];

        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

        let ua_idx = rng.gen_range(0..user_agents.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];

        Self {
            user_agent: user_agents[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Derive a fingerprint from settings, randomizing the user agent
    /// when none is pinned.
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        let mut fingerprint = Self::randomized();
        if !settings.user_agent.is_empty() {
            fingerprint.user_agent = settings.user_agent.clone();
        }
        fingerprint.viewport_width = settings.window_width;
        fingerprint.viewport_height = settings.window_height;
        fingerprint
    }
}
