//! Item management screen.
//!
//! Mutations go through the backend, so the list re-renders some time after
//! the click that caused them. Operations here return once the click has been
//! delivered; use the `wait_for_*` helpers to synchronize on the refreshed list.

use super::{PageObject, ERROR_MESSAGE_XPATH};
use crate::condition::{
    count_equals, located_and_clickable, located_and_visible, text_absent, text_present,
};
use crate::driver::ElementHandle;
use crate::locator::Locator;
use crate::result::{SuiteError, SuiteResult};
use crate::session::Session;
use tracing::{debug, info, warn};

/// Prefix of the name inside a rendered row
const ROW_NAME_MARKER: &str = " - Name: ";

/// Page object for the item list, its forms and the delete modal
#[derive(Debug, Clone)]
pub struct ItemPage<'a> {
    session: &'a Session,
    add_item_button: Locator,
    new_item_input: Locator,
    edit_item_input: Locator,
    save_item_button: Locator,
    item_list: Locator,
    item_rows: Locator,
    edit_button: Locator,
    delete_button: Locator,
    logout_button: Locator,
    item_error_message: Locator,
    item_empty_error_message: Locator,
    confirm_button: Locator,
    cancel_button: Locator,
}

impl<'a> ItemPage<'a> {
    /// Bind the item screen to a session
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            add_item_button: Locator::id("addItemButton"),
            new_item_input: Locator::id("newItemInput"),
            edit_item_input: Locator::id("editItemInput"),
            save_item_button: Locator::id("saveItemButton"),
            item_list: Locator::id("itemList"),
            item_rows: Locator::css("#itemList li"),
            edit_button: Locator::css(".edit-btn"),
            delete_button: Locator::css(".delete-btn"),
            logout_button: Locator::id("logoutBtn"),
            item_error_message: Locator::xpath(ERROR_MESSAGE_XPATH),
            item_empty_error_message: Locator::css("#root > div > div > div > p"),
            confirm_button: Locator::id("confirmButton"),
            cancel_button: Locator::id("cancelButton"),
        }
    }

    // =========================================================================
    // LOCATORS
    // =========================================================================

    /// Add button; its visibility marks a completed login
    #[must_use]
    pub const fn add_item_button_locator(&self) -> &Locator {
        &self.add_item_button
    }

    /// Save button of the row being edited
    #[must_use]
    pub const fn save_item_button_locator(&self) -> &Locator {
        &self.save_item_button
    }

    /// Cancel button of the delete confirmation
    #[must_use]
    pub const fn cancel_button_locator(&self) -> &Locator {
        &self.cancel_button
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Type `name` into the new-item input and press add
    pub async fn create_item(&self, name: &str) -> SuiteResult<()> {
        info!(name, "creating item");
        self.session.fill(&self.new_item_input, name).await?;
        self.session.click(&self.add_item_button).await
    }

    /// Rename the first row whose text contains `original_name`
    pub async fn edit_item_by_name(&self, original_name: &str, new_name: &str) -> SuiteResult<()> {
        info!(original_name, new_name, "editing item");
        let input = self.open_editor(original_name).await?;
        let driver = self.session.driver();
        driver.clear(&input).await?;
        driver.send_keys(&input, new_name).await?;
        self.session.click(&self.save_item_button).await
    }

    /// Clear the first row whose text contains `original_name` and save
    pub async fn edit_item_to_be_empty(&self, original_name: &str) -> SuiteResult<()> {
        info!(original_name, "editing item to an empty name");
        let input = self.open_editor(original_name).await?;
        self.session.driver().clear(&input).await?;
        self.session.click(&self.save_item_button).await
    }

    /// Delete the first row and confirm in the modal
    pub async fn delete_first_item(&self) -> SuiteResult<()> {
        info!("deleting first item");
        self.session.click(&self.delete_button).await?;
        self.session.click(&self.confirm_button).await
    }

    /// Press logout
    pub async fn logout(&self) -> SuiteResult<()> {
        info!("logging out");
        self.session.click(&self.logout_button).await
    }

    /// Find the row, enter edit mode, return the ready edit input
    async fn open_editor(&self, original_name: &str) -> SuiteResult<ElementHandle> {
        let row = self.find_row(original_name).await?;
        let driver = self.session.driver();
        let edit = driver
            .find_first_within(&row, &self.edit_button)
            .await?
            .ok_or_else(|| SuiteError::ElementNotFound {
                locator: format!("{} within row '{original_name}'", self.edit_button),
                elapsed_ms: 0,
            })?;
        driver.click(&edit).await?;

        let wait = self.session.wait();
        let input = wait
            .until(&located_and_visible(&self.edit_item_input))
            .await?
            .into_result()?;
        wait.until(&located_and_clickable(&self.save_item_button))
            .await?
            .into_result()?;
        Ok(input)
    }

    async fn find_row(&self, name: &str) -> SuiteResult<ElementHandle> {
        self.session
            .wait()
            .until(&located_and_visible(&self.item_list))
            .await?
            .into_result()?;
        let driver = self.session.driver();
        for row in driver.find_all(&self.item_rows).await? {
            if driver.text(&row).await?.contains(name) {
                debug!(row = %row, name, "matched item row");
                return Ok(row);
            }
        }
        Err(SuiteError::ItemNotFound {
            name: name.to_string(),
        })
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Full text of the item list, every row included
    pub async fn item_list_text(&self) -> SuiteResult<String> {
        let list = self
            .session
            .wait()
            .until(&located_and_visible(&self.item_list))
            .await?
            .into_result()?;
        self.session.driver().text(&list).await
    }

    /// Names of the rows currently rendered, in list order (zero-wait).
    ///
    /// Rows in edit mode show an input instead of their name and are skipped.
    pub async fn item_names(&self) -> SuiteResult<Vec<String>> {
        let driver = self.session.driver();
        let mut names = Vec::new();
        for row in driver.find_all(&self.item_rows).await? {
            let text = driver.text(&row).await?;
            let label = text.lines().next().unwrap_or_default();
            if let Some((_, name)) = label.split_once(ROW_NAME_MARKER) {
                names.push(name.trim().to_string());
            }
        }
        Ok(names)
    }

    /// Number of rows currently rendered (zero-wait)
    pub async fn item_row_count(&self) -> SuiteResult<usize> {
        Ok(self.session.driver().find_all(&self.item_rows).await?.len())
    }

    /// Wait until exactly `expected` rows are rendered
    pub async fn wait_for_item_row_count(&self, expected: usize) -> SuiteResult<()> {
        self.session
            .wait()
            .until(&count_equals(&self.item_rows, expected))
            .await?
            .into_result()?;
        Ok(())
    }

    /// Wait until a row shows `name`
    pub async fn wait_for_item_present(&self, name: &str) -> SuiteResult<()> {
        self.session
            .wait()
            .until(&text_present(&self.item_list, format!("{ROW_NAME_MARKER}{name}")))
            .await?
            .into_result()?;
        Ok(())
    }

    /// Wait until no row shows `name`
    pub async fn wait_for_item_absent(&self, name: &str) -> SuiteResult<()> {
        self.session
            .wait()
            .until(&text_absent(&self.item_list, format!("{ROW_NAME_MARKER}{name}")))
            .await?
            .into_result()?;
        Ok(())
    }

    // =========================================================================
    // TOLERANT PROBES
    // =========================================================================

    /// Text of the item error, or `""` if none shows up within the wait
    pub async fn error_message(&self) -> String {
        let outcome = self
            .session
            .wait()
            .until(&located_and_visible(&self.item_empty_error_message))
            .await;
        let paragraph = match outcome {
            Ok(outcome) => outcome.ok(),
            Err(err) => {
                warn!(error = %err, "item error probe failed");
                None
            }
        };
        let Some(paragraph) = paragraph else {
            debug!(locator = %self.item_empty_error_message, "no item error displayed");
            return String::new();
        };
        match self.session.driver().text(&paragraph).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "could not read item error");
                String::new()
            }
        }
    }

    /// Whether an item error shows up within the wait
    pub async fn is_item_error_message_displayed(&self) -> bool {
        self.probe_visible(&self.item_error_message, false).await
    }

    /// Whether `locator` becomes visible within the short wait
    pub async fn is_element_visible(&self, locator: &Locator) -> bool {
        self.probe_visible(locator, true).await
    }

    async fn probe_visible(&self, locator: &Locator, short: bool) -> bool {
        let wait = if short {
            self.session.short_wait()
        } else {
            self.session.wait()
        };
        match wait.until(&located_and_visible(locator)).await {
            Ok(outcome) => {
                if !outcome.is_satisfied() {
                    debug!(locator = %locator, timeout_ms = wait.options().timeout_ms, "not visible");
                }
                outcome.is_satisfied()
            }
            Err(err) => {
                warn!(locator = %locator, error = %err, "visibility probe failed");
                false
            }
        }
    }
}

impl PageObject for ItemPage<'_> {
    fn session(&self) -> &Session {
        self.session
    }

    fn markers(&self) -> Vec<Locator> {
        vec![self.add_item_button.clone(), self.item_list.clone()]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::mock::MockApp;
    use crate::pages::EMPTY_NAME_ERROR;

    fn logged_in_session(app: &MockApp) -> Session {
        app.login_directly("admin", "admin");
        Session::new(
            Box::new(app.clone()),
            SuiteConfig::default()
                .with_wait_timeout(400)
                .with_short_wait_timeout(100)
                .with_poll_interval(10),
        )
    }

    mod read_tests {
        use super::*;

        #[tokio::test]
        async fn test_item_names_parse_rows() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            assert_eq!(
                page.item_names().await.unwrap(),
                vec!["Sample Item 1".to_string(), "Sample Item 2".to_string()]
            );
            assert_eq!(page.item_row_count().await.unwrap(), 2);
            assert!(page.is_loaded().await.unwrap());
        }

        #[tokio::test]
        async fn test_list_text_contains_rows() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let text = ItemPage::new(&s).item_list_text().await.unwrap();
            assert!(text.contains("Name: Sample Item 1"));
            assert!(text.contains("Edit"));
        }
    }

    mod mutation_tests {
        use super::*;

        #[tokio::test]
        async fn test_edit_unknown_item_fails() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let err = ItemPage::new(&s)
                .edit_item_by_name("No Such Item", "Whatever")
                .await
                .unwrap_err();
            assert!(matches!(err, SuiteError::ItemNotFound { ref name } if name == "No Such Item"));
        }

        #[tokio::test]
        async fn test_edit_first_match_wins() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            page.edit_item_by_name("Sample Item", "Renamed").await.unwrap();
            page.wait_for_item_present("Renamed").await.unwrap();
            assert_eq!(
                app.stored_item_names(),
                vec!["Renamed".to_string(), "Sample Item 2".to_string()]
            );
        }

        #[tokio::test]
        async fn test_edit_to_empty_shows_error() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            page.edit_item_to_be_empty("Sample Item 2").await.unwrap();
            assert_eq!(page.error_message().await, EMPTY_NAME_ERROR);
            assert!(page.is_item_error_message_displayed().await);
        }

        #[tokio::test]
        async fn test_delete_first_item_removes_row() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            page.delete_first_item().await.unwrap();
            page.wait_for_item_row_count(1).await.unwrap();
            page.wait_for_item_absent("Sample Item 1").await.unwrap();
        }
    }

    mod probe_tests {
        use super::*;

        #[tokio::test]
        async fn test_error_message_tolerates_absence() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            assert_eq!(page.error_message().await, "");
            assert!(!page.is_item_error_message_displayed().await);
        }

        #[tokio::test]
        async fn test_error_message_tolerates_driver_failure() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            app.fail_next_query("connection reset by peer");
            assert_eq!(ItemPage::new(&s).error_message().await, "");
        }

        #[tokio::test]
        async fn test_open_modal_reads_as_item_error() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            s.click(&page.delete_button).await.unwrap();
            assert!(page.is_item_error_message_displayed().await);
            assert_eq!(
                page.error_message().await,
                "Are you sure you want to delete this item?"
            );
            s.click(&page.cancel_button).await.unwrap();
            assert!(!page.is_item_error_message_displayed().await);
        }

        #[tokio::test]
        async fn test_is_element_visible() {
            let app = MockApp::new();
            let s = logged_in_session(&app);
            let page = ItemPage::new(&s);
            assert!(page.is_element_visible(page.add_item_button_locator()).await);
            assert!(!page.is_element_visible(page.save_item_button_locator()).await);
        }
    }
}
