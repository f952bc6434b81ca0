//! CSS locators with `%ROW` / `%CATEGORY` placeholders

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ROW_PLACEHOLDER: &str = "%ROW";
pub const CATEGORY_PLACEHOLDER: &str = "%CATEGORY";

/// A selector understood by the page driver.
///
/// Templates carry placeholders that are filled in with [`Locator::row`] and
/// [`Locator::category`] before being handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the 1-based row index
    pub fn row(&self, row: usize) -> Self {
        Self(self.0.replace(ROW_PLACEHOLDER, &row.to_string()))
    }

    /// Substitute the category label
    pub fn category(&self, category: &str) -> Self {
        Self(self.0.replace(CATEGORY_PLACEHOLDER, category))
    }

    /// Narrow to elements carrying a class
    pub fn with_class(&self, class: &str) -> Self {
        Self(format!("{}.{}", self.0, class))
    }

    /// Select the zero-based `index`-th match
    pub fn nth(&self, index: usize) -> Self {
        Self(format!("{} >> nth={}", self.0, index))
    }

    pub fn first(&self) -> Self {
        self.nth(0)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
