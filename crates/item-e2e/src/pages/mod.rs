//! Page objects for the item-management app.
//!
//! Each page object borrows a [`Session`] and exposes the app's screens as
//! intention-level operations. Every interaction waits for its element first.
//!
//! [`Session`]: crate::session::Session

mod item;
mod login;

pub use item::ItemPage;
pub use login::LoginPage;

use crate::locator::Locator;
use crate::result::SuiteResult;
use crate::session::Session;
use async_trait::async_trait;

/// Error the client shows for a blank item name
pub const EMPTY_NAME_ERROR: &str = "Item name is required.";

/// Error the server returns for bad credentials
pub const INVALID_CREDENTIALS_ERROR: &str = "Invalid credentials";

/// XPath of the error paragraph both screens render
pub const ERROR_MESSAGE_XPATH: &str = r#"//*[@id="root"]/div/div/div/p"#;

/// Trait for page objects representing a screen of the app.
///
/// # Example
///
/// ```ignore
/// let login = LoginPage::new(&session);
/// assert!(login.is_loaded().await?);
/// ```
#[async_trait]
pub trait PageObject: Sync {
    /// Session the page drives
    fn session(&self) -> &Session;

    /// Elements that are present exactly when this screen is showing
    fn markers(&self) -> Vec<Locator>;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &'static str {
        let path = std::any::type_name::<Self>();
        let path = path.split('<').next().unwrap_or(path);
        path.rsplit("::").next().unwrap_or(path)
    }

    /// Zero-wait check that every marker is present right now
    async fn is_loaded(&self) -> SuiteResult<bool> {
        for marker in self.markers() {
            if !self.session().is_present(&marker).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
