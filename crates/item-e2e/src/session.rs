//! Browser session scoped to one test.
//!
//! A [`Session`] owns the driver and the run's [`SuiteConfig`]. Page objects
//! borrow it, so they cannot outlive it. [`Session::scoped`] guarantees the
//! driver is closed whatever the test body does.

use crate::condition::{located_and_clickable, located_and_visible};
use crate::config::SuiteConfig;
use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::result::{SuiteError, SuiteResult};
use crate::wait::PollingWait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// One driver plus the configuration it runs under
pub struct Session {
    driver: Box<dyn Driver>,
    config: SuiteConfig,
    closed: AtomicBool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an already running driver
    #[must_use]
    pub fn new(driver: Box<dyn Driver>, config: SuiteConfig) -> Self {
        Self {
            driver,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Launch Chromium according to `config.browser`
    #[cfg(feature = "browser")]
    pub async fn launch(config: SuiteConfig) -> SuiteResult<Self> {
        config.validate()?;
        let driver = crate::browser::ChromiumDriver::launch(&config.browser).await?;
        tracing::info!(base_url = %config.base_url, headless = config.browser.headless, "session started");
        Ok(Self::new(Box::new(driver), config))
    }

    /// The underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Run configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Wait with the primary timeout
    #[must_use]
    pub fn wait(&self) -> PollingWait<'_> {
        PollingWait::new(self.driver(), self.config.wait_options())
    }

    /// Wait with the advisory timeout
    #[must_use]
    pub fn short_wait(&self) -> PollingWait<'_> {
        self.wait().with_options(self.config.short_wait_options())
    }

    /// Whether [`close`](Self::close) has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Load the application root
    pub async fn navigate_root(&self) -> SuiteResult<()> {
        if self.is_closed() {
            return Err(SuiteError::SessionClosed);
        }
        debug!(url = %self.config.base_url, "navigating");
        self.driver.navigate(&self.config.base_url).await
    }

    /// Wait until `locator` is visible, clear it, then type `text`
    pub async fn fill(&self, locator: &Locator, text: &str) -> SuiteResult<ElementHandle> {
        let input = self.wait().until(&located_and_visible(locator)).await?.into_result()?;
        self.driver.clear(&input).await?;
        self.driver.send_keys(&input, text).await?;
        Ok(input)
    }

    /// Wait until `locator` is visible, then type `text` without clearing
    pub async fn type_into(&self, locator: &Locator, text: &str) -> SuiteResult<ElementHandle> {
        let input = self.wait().until(&located_and_visible(locator)).await?.into_result()?;
        self.driver.send_keys(&input, text).await?;
        Ok(input)
    }

    /// Wait until `locator` is clickable, then click it
    pub async fn click(&self, locator: &Locator) -> SuiteResult<()> {
        let target = self.wait().until(&located_and_clickable(locator)).await?.into_result()?;
        self.driver.click(&target).await
    }

    /// Whether `locator` matches anything right now (zero-wait)
    pub async fn is_present(&self, locator: &Locator) -> SuiteResult<bool> {
        Ok(self.driver.find_first(locator).await?.is_some())
    }

    /// Release the driver. Later calls are no-ops.
    pub async fn close(&self) -> SuiteResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("closing session");
        self.driver.close().await
    }

    /// Run `body` against `session`, then close the session.
    ///
    /// The session is closed whether `body` returns `Ok`, returns `Err`, or
    /// panics. A panic is resumed after the close; an error from `body` wins
    /// over an error from the close.
    ///
    /// ```rust,ignore
    /// Session::scoped(session, |s| {
    ///     async move {
    ///         LoginPage::new(s).login("admin", "admin").await
    ///     }
    ///     .boxed()
    /// })
    /// .await?;
    /// ```
    pub async fn scoped<T, F>(session: Self, body: F) -> SuiteResult<T>
    where
        F: for<'s> FnOnce(&'s Self) -> BoxFuture<'s, SuiteResult<T>>,
    {
        let outcome = AssertUnwindSafe(body(&session)).catch_unwind().await;
        let closed = session.close().await;
        if let Err(err) = &closed {
            warn!(error = %err, "failed to close session");
        }
        match outcome {
            Ok(result) => {
                let value = result?;
                closed?;
                Ok(value)
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Name that is unique per run: `prefix` plus the current time in milliseconds
#[must_use]
pub fn unique_item_name(prefix: &str) -> String {
    format!("{prefix} {}", chrono::Utc::now().timestamp_millis())
}
