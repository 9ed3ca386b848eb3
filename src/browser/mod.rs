// src/browser/mod.rs

//! Browser capability used by the reload engine.
//!
//! The engine only needs three operations: open a URL, refresh the page, and
//! shut the browser down. Each returns a [`BrowserError`] whose variant tells
//! the engine whether retrying makes sense; any message inspection happens
//! inside the driver implementation, never in the engine.

pub mod webdriver;

use thiserror::Error;

use crate::types::BoxFuture;

pub use webdriver::WebDriverBrowser;

/// Structured failure of a browser operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    /// The browser or its driver binary is not installed.
    #[error("browser binary not found: {0}")]
    BinaryNotFound(String),

    /// The page could not be reached (yet); worth retrying.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// Anything the driver could not classify.
    #[error("browser error: {0}")]
    Other(String),
}

impl BrowserError {
    /// Only navigation failures are expected to clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrowserError::NavigationFailed(_))
    }
}

/// Browser automation capability.
pub trait BrowserDriver: Send + Sync {
    /// Open `url`, launching the browser first if needed.
    fn navigate(&self, url: &str) -> BoxFuture<'_, Result<(), BrowserError>>;

    /// Reload the current page.
    fn refresh(&self) -> BoxFuture<'_, Result<(), BrowserError>>;

    /// Close the browser. Safe to call when it was never launched.
    fn quit(&self) -> BoxFuture<'_, Result<(), BrowserError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_navigation_failures_are_transient() {
        assert!(BrowserError::NavigationFailed("net::ERR_CONNECTION_REFUSED".into()).is_transient());
        assert!(!BrowserError::BinaryNotFound("chromedriver".into()).is_transient());
        assert!(!BrowserError::Other("boom".into()).is_transient());
    }
}
