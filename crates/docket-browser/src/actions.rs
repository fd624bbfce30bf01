use crate::error::Result;

/// Operations the search orchestrator performs against a live session.
///
/// The production implementation drives Chrome over CDP; tests script
/// a fake. Every method takes `&self` so one session can be shared with
/// the challenge resolver, which inspects the same page.
#[async_trait::async_trait]
pub trait SessionActions: Send + Sync {
    /// Navigate to a URL, waiting for the load to complete.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Clear and fill a form field by selector.
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Choose an option of a `<select>` element by value.
    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// Click an element by selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Wait for a selector to appear.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Extract text from an element.
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Extract an attribute value from an element.
    async fn extract_attribute(&self, selector: &str, attribute: &str) -> Result<Option<String>>;

    /// Full HTML of the currently loaded page.
    async fn page_content(&self) -> Result<String>;

    /// Screenshot a single element as PNG bytes.
    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>>;

    /// Release the underlying browser. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}
