//! Page capabilities the grid adapter is built on
//!
//! A `PageDriver` is whatever can click, type and wait inside the admin
//! panel: the Playwright bridge in production, [`crate::fake::FakeStockPanel`]
//! in tests. Every wait is bounded by the timeout passed in and fails with
//! [`GridError::SyncTimeout`] when it runs out.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GridError, GridResult};
use crate::locator::Locator;

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL and wait for the load event
    async fn goto(&self, url: &str, timeout: Duration) -> GridResult<()>;

    /// Reload the current page, dropping all client-side state
    async fn reload(&self, timeout: Duration) -> GridResult<()>;

    async fn click(&self, locator: &Locator, timeout: Duration) -> GridResult<()>;

    /// Type into an input, appending to what it already holds
    async fn type_text(&self, locator: &Locator, text: &str, timeout: Duration) -> GridResult<()>;

    /// Replace the value of an input
    async fn set_value(&self, locator: &Locator, value: &str, timeout: Duration) -> GridResult<()>;

    /// Trimmed text content of the first match
    async fn read_text(&self, locator: &Locator, timeout: Duration) -> GridResult<String>;

    /// Number of elements currently matching, without waiting
    async fn count(&self, locator: &Locator) -> GridResult<usize>;

    /// Attribute of the first match, `None` when unset
    async fn attribute(&self, locator: &Locator, name: &str, timeout: Duration) -> GridResult<Option<String>>;

    async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> GridResult<()>;

    /// Succeeds when no match is visible, including when nothing matches at all
    async fn wait_for_hidden(&self, locator: &Locator, timeout: Duration) -> GridResult<()>;

    async fn wait_for_attribute_equals(
        &self,
        locator: &Locator,
        name: &str,
        value: &str,
        timeout: Duration,
    ) -> GridResult<()>;

    /// Read the text of `locator` and parse the integer it holds
    async fn number_from_text(&self, locator: &Locator, timeout: Duration) -> GridResult<i64> {
        let text = self.read_text(locator, timeout).await?;
        parse_leading_integer(&text).ok_or_else(|| GridError::NotANumber {
            locator: locator.to_string(),
            text,
        })
    }
}

/// Digit groups joined by thousands separators, or a plain run of digits
static INTEGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d{1,3}(?:[ ,\u{a0}]\d{3})+\b|-?\d+").expect("valid integer regex")
});

/// First integer in `text`. Thousands separators (space, comma, no-break
/// space) are accepted only between groups of three digits, so `"5 10"` is 5.
pub fn parse_leading_integer(text: &str) -> Option<i64> {
    let found = INTEGER.find(text)?.as_str();
    let digits: String = found
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    digits.parse().ok()
}
