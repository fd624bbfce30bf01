//! Site profile: selectors and page markers for the court portal.
//!
//! Everything the orchestrator and challenge panel know about the
//! remote page's shape lives here, so a portal redesign is a data
//! change rather than a logic change.

use serde::{Deserialize, Serialize};

/// CSS selectors for the search form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSelectors {
    /// `<select>` holding the case type designation
    pub case_type_select: String,
    /// Input for the numeric case number
    pub case_number_input: String,
    /// `<select>` holding the filing year
    pub year_select: String,
    /// Input the captcha code is typed into
    pub captcha_input: String,
    /// The captcha image element
    pub captcha_image: String,
    /// Control that loads a fresh captcha, when the portal offers one
    pub captcha_refresh: Option<String>,
    /// The form submit control
    pub submit_button: String,
}

/// Full description of the remote portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Search page URL
    pub base_url: String,
    /// Form selectors
    pub form: FormSelectors,
    /// Selector that signals the result page has rendered
    pub result_marker: String,
    /// Lowercase page-text fragments meaning the code was wrong
    pub rejected_markers: Vec<String>,
    /// Lowercase page-text fragments meaning the challenge lapsed
    pub expired_markers: Vec<String>,
}

impl SiteProfile {
    /// Profile for the Delhi High Court case-status portal.
    #[must_use]
    pub fn delhi_high_court(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            form: FormSelectors {
                case_type_select: "select[name='case_type']".to_string(),
                case_number_input: "input[name='case_number'], input[name='case_no']".to_string(),
                year_select: "select[name='case_year'], select[name='year']".to_string(),
                captcha_input: "input[name='captcha'], input[name='captchaInput']".to_string(),
                captcha_image: "img#captcha-image, img.captcha-image, img[alt*='captcha' i]"
                    .to_string(),
                captcha_refresh: Some("a#captcha-refresh, button.captcha-refresh".to_string()),
                submit_button: "button[type='submit'], input[type='submit']".to_string(),
            },
            result_marker: "table, .case-details, #case-status".to_string(),
            rejected_markers: vec![
                "invalid captcha".to_string(),
                "captcha mismatch".to_string(),
                "incorrect captcha".to_string(),
            ],
            expired_markers: vec![
                "captcha expired".to_string(),
                "session expired".to_string(),
                "session has timed out".to_string(),
            ],
        }
    }
}
