//! Result and error types for the suite.

use crate::wait::ObservedState;
use thiserror::Error;

/// Result type for suite operations
pub type SuiteResult<T> = Result<T, SuiteError>;

/// Errors that can occur while driving the application under test
#[derive(Debug, Error)]
pub enum SuiteError {
    /// A condition located its element but never reached the wanted state
    #[error("Timed out after {elapsed_ms}ms waiting for {waited_for} (last state: {last_state})")]
    Timeout {
        /// Description of the condition
        waited_for: String,
        /// Time spent waiting in milliseconds
        elapsed_ms: u64,
        /// What the last probe observed
        last_state: ObservedState,
    },

    /// The locator never matched anything within the wait budget
    #[error("No element matched {locator} within {elapsed_ms}ms")]
    ElementNotFound {
        /// Locator description
        locator: String,
        /// Time spent waiting in milliseconds
        elapsed_ms: u64,
    },

    /// No rendered item row contains the requested name
    #[error("Item with name '{name}' not found in the item list")]
    ItemNotFound {
        /// Name that was searched for
        name: String,
    },

    /// Element handle outlived the render it came from
    #[error("Stale element reference: {element}")]
    StaleElement {
        /// Element identifier
        element: String,
    },

    /// Expected vs. actual mismatch at a test boundary
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Driver command failed
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Invalid suite configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Operation on a session that was already closed
    #[error("Session is closed")]
    SessionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SuiteError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Whether a polling wait should keep retrying after this error.
    ///
    /// Stale handles and lookups that race a re-render resolve on their own;
    /// anything else means the session itself is broken.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StaleElement { .. } | Self::ElementNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_condition_and_state() {
        let err = SuiteError::Timeout {
            waited_for: "visibility of By.id: itemList".to_string(),
            elapsed_ms: 10_000,
            last_state: ObservedState::Hidden,
        };
        let msg = err.to_string();
        assert!(msg.contains("10000ms"));
        assert!(msg.contains("By.id: itemList"));
        assert!(msg.contains("hidden"));
    }

    #[test]
    fn test_item_not_found_message() {
        let err = SuiteError::ItemNotFound {
            name: "Widget".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Item with name 'Widget' not found in the item list"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(SuiteError::StaleElement {
            element: "e1".into()
        }
        .is_transient());
        assert!(SuiteError::ElementNotFound {
            locator: "By.id: x".into(),
            elapsed_ms: 0
        }
        .is_transient());
        assert!(!SuiteError::driver("connection reset").is_transient());
        assert!(!SuiteError::SessionClosed.is_transient());
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(
            SuiteError::config("bad"),
            SuiteError::Config { message } if message == "bad"
        ));
        assert!(matches!(
            SuiteError::assertion("x != y"),
            SuiteError::AssertionFailed { .. }
        ));
    }
}
