//! Order PDF retrieval.
//!
//! Order documents are plain HTTP downloads; no browser session is
//! needed once the parser has absolutized their URLs.

use crate::error::{Result, SearchError};

/// Fetch an order PDF by its absolute URL.
///
/// The URL must be http(s) and the response must actually be a PDF;
/// portals serve HTML error pages with a 200 status often enough that
/// the content type has to be checked.
///
/// # Errors
/// Returns `SearchError::Validation` for a malformed or non-http URL,
/// `SearchError::SiteUnreachable` for network or status failures, and
/// `SearchError::Parse` when the response is not a PDF.
pub async fn fetch_order_pdf(url: &str) -> Result<Vec<u8>> {
    let parsed = url::Url::parse(url)
        .map_err(|e| SearchError::Validation(format!("invalid order URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SearchError::Validation(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let response = reqwest::get(parsed.clone())
        .await
        .map_err(|e| SearchError::SiteUnreachable(format!("order download failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::SiteUnreachable(format!(
            "order download returned status {status}"
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if !content_type.contains("pdf") && !content_type.contains("octet-stream") {
        return Err(SearchError::Parse(format!(
            "order URL served '{content_type}' instead of a PDF"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SearchError::SiteUnreachable(format!("order body read failed: {e}")))?;

    tracing::debug!(url = %parsed, bytes = bytes.len(), "fetched order document");
    Ok(bytes.to_vec())
}
