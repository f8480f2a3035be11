//! Login screen.

use super::{PageObject, ERROR_MESSAGE_XPATH};
use crate::condition::located_and_visible;
use crate::locator::Locator;
use crate::result::SuiteResult;
use crate::session::Session;
use tracing::info;

/// Page object for the login form
#[derive(Debug, Clone)]
pub struct LoginPage<'a> {
    session: &'a Session,
    username_input: Locator,
    password_input: Locator,
    login_button: Locator,
    error_message: Locator,
}

impl<'a> LoginPage<'a> {
    /// Bind the login screen to a session
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            username_input: Locator::id("username"),
            password_input: Locator::id("password"),
            login_button: Locator::id("loginButton"),
            error_message: Locator::xpath(ERROR_MESSAGE_XPATH),
        }
    }

    /// Type into the username field
    pub async fn enter_username(&self, username: &str) -> SuiteResult<()> {
        self.session.type_into(&self.username_input, username).await?;
        Ok(())
    }

    /// Type into the password field
    pub async fn enter_password(&self, password: &str) -> SuiteResult<()> {
        self.session.type_into(&self.password_input, password).await?;
        Ok(())
    }

    /// Submit the form
    pub async fn click_login(&self) -> SuiteResult<()> {
        self.session.click(&self.login_button).await
    }

    /// Load the app root and submit the given credentials.
    ///
    /// Does not wait for the outcome; callers probe the screen they expect.
    pub async fn login(&self, username: &str, password: &str) -> SuiteResult<()> {
        info!(username, "logging in");
        self.session.navigate_root().await?;
        self.enter_username(username).await?;
        self.enter_password(password).await?;
        self.click_login().await
    }

    /// Text of the login error. Fails if no error shows up within the wait.
    pub async fn error_message(&self) -> SuiteResult<String> {
        let paragraph = self
            .session
            .wait()
            .until(&located_and_visible(&self.error_message))
            .await?
            .into_result()?;
        self.session.driver().text(&paragraph).await
    }

    /// Whether the login form is showing right now
    pub async fn is_login_page_displayed(&self) -> SuiteResult<bool> {
        self.is_loaded().await
    }
}

impl PageObject for LoginPage<'_> {
    fn session(&self) -> &Session {
        self.session
    }

    fn markers(&self) -> Vec<Locator> {
        vec![self.username_input.clone(), self.login_button.clone()]
    }
}
