//! Driver - Abstract Browser Automation Trait
//!
//! The suite only consumes a narrow contract from the browser: query the tree,
//! interact with an element, navigate. Everything above this seam (waits, page
//! objects, scenarios) is written against [`Driver`], so the same scenarios run
//! against Chromium over CDP or against the in-process [`MockApp`].
//!
//! [`MockApp`]: crate::mock::MockApp

use crate::locator::Locator;
use crate::result::SuiteResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a located element at a point in time.
///
/// Handles are not owned nodes: after navigation or a re-render the driver
/// may reject them with [`SuiteError::StaleElement`]. Re-resolve the locator
/// instead of holding on to a handle across actions.
///
/// [`SuiteError::StaleElement`]: crate::result::SuiteError::StaleElement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-scoped identifier
    pub id: String,
    /// Element tag name, lowercase
    pub tag_name: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {}", self.tag_name, self.id)
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `ChromiumDriver` - uses the chromiumoxide crate (feature `browser`)
/// - `MockApp` - in-process simulation of the item app for offline tests
#[async_trait]
pub trait Driver: Send + Sync {
    /// Load a URL and wait for the document to settle
    async fn navigate(&self, url: &str) -> SuiteResult<()>;

    /// All elements matching the locator, in document order
    async fn find_all(&self, locator: &Locator) -> SuiteResult<Vec<ElementHandle>>;

    /// All descendants of `parent` matching the locator, in document order
    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> SuiteResult<Vec<ElementHandle>>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> SuiteResult<()>;

    /// Type text into the element, appending to its current value
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SuiteResult<()>;

    /// Clear an input's value
    async fn clear(&self, element: &ElementHandle) -> SuiteResult<()>;

    /// Rendered text of the element and its descendants
    async fn text(&self, element: &ElementHandle) -> SuiteResult<String>;

    /// Whether the element is rendered and visible
    async fn is_displayed(&self, element: &ElementHandle) -> SuiteResult<bool>;

    /// Whether the element accepts interaction (not `disabled`)
    async fn is_enabled(&self, element: &ElementHandle) -> SuiteResult<bool>;

    /// Whether another element covers the element's center point
    async fn is_obscured(&self, element: &ElementHandle) -> SuiteResult<bool>;

    /// Current document URL
    async fn current_url(&self) -> SuiteResult<String>;

    /// Release the browser
    async fn close(&self) -> SuiteResult<()>;

    /// First element matching the locator, if any (zero-wait)
    async fn find_first(&self, locator: &Locator) -> SuiteResult<Option<ElementHandle>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    /// First descendant of `parent` matching the locator, if any (zero-wait)
    async fn find_first_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> SuiteResult<Option<ElementHandle>> {
        Ok(self.find_all_within(parent, locator).await?.into_iter().next())
    }
}
