//! item-e2e: End-to-end suite for the item-management web app
//!
//! Drives the app's login and item screens through page objects, with every
//! interaction gated on an explicit polling wait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    item-e2e Architecture                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐            │
//! │  │ Scenario   │   │ Page       │   │ Polling    │            │
//! │  │ tests      │──►│ objects    │──►│ wait       │──┐         │
//! │  └────────────┘   └────────────┘   └────────────┘  │         │
//! │                                                    ▼         │
//! │                    ┌──────────────┐   ┌──────────────────┐   │
//! │                    │ MockApp      │◄──│ Driver (trait)   │   │
//! │                    │ (offline)    │   └──────────────────┘   │
//! │                    └──────────────┘            │             │
//! │                    ┌──────────────┐            │             │
//! │                    │ Chromium/CDP │◄───────────┘             │
//! │                    │ (`browser`)  │                          │
//! │                    └──────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::FutureExt;
//! use item_e2e::prelude::*;
//!
//! let app = MockApp::new();
//! let session = Session::new(Box::new(app), SuiteConfig::default());
//! Session::scoped(session, |s| {
//!     async move {
//!         LoginPage::new(s).login("admin", "admin").await?;
//!         let items = ItemPage::new(s);
//!         assert!(items.is_element_visible(items.add_item_button_locator()).await);
//!         Ok(())
//!     }
//!     .boxed()
//! })
//! .await?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[cfg(feature = "browser")]
mod browser;
mod condition;
mod config;
mod driver;
mod locator;
mod logging;
/// In-process simulation of the app under test
pub mod mock;
/// Page objects for the app's screens
pub mod pages;
mod result;
mod session;
mod wait;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use condition::{
    all_located_and_visible, count_equals, invisibility_of, located_and_clickable,
    located_and_visible, text_absent, text_present, AllLocatedAndVisible, Condition, CountEquals,
    InvisibilityOf, LocatedAndClickable, LocatedAndVisible, Probe, TextAbsent, TextPresent,
};
pub use config::{BrowserSettings, SuiteConfig, DEFAULT_BASE_URL};
pub use driver::{Driver, ElementHandle};
pub use locator::Locator;
pub use logging::{init_tracing, DEFAULT_FILTER};
pub use result::{SuiteError, SuiteResult};
pub use session::{unique_item_name, Session};
pub use wait::{
    ObservedState, PollingWait, WaitOptions, WaitOutcome, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS, SHORT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "browser")]
    pub use super::ChromiumDriver;
    pub use super::mock::{MockApp, MockAppConfig};
    pub use super::pages::{
        ItemPage, LoginPage, PageObject, EMPTY_NAME_ERROR, INVALID_CREDENTIALS_ERROR,
    };
    pub use super::{
        init_tracing, unique_item_name, Condition, Driver, ElementHandle, Locator, PollingWait,
        Session, SuiteConfig, SuiteError, SuiteResult, WaitOptions, WaitOutcome,
    };
}
