//! Wait conditions.
//!
//! A condition is a predicate over the live tree, evaluated against a
//! [`Locator`] on every poll. Conditions hold no state between probes.

use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::result::{SuiteError, SuiteResult};
use crate::wait::ObservedState;
use async_trait::async_trait;

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The condition holds and produced a value
    Satisfied(T),
    /// Not yet; carries what was observed
    Pending(ObservedState),
}

/// Trait for wait conditions
#[async_trait]
pub trait Condition: Send + Sync {
    /// Value produced once the condition holds
    type Output: Send;

    /// Evaluate the condition once against the current tree
    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<Self::Output>>;

    /// Get description for error messages
    fn description(&self) -> String;

    /// Locator the condition is evaluated against
    fn locator(&self) -> Option<&Locator> {
        None
    }
}

/// First match exists and is displayed
#[derive(Debug, Clone)]
pub struct LocatedAndVisible {
    locator: Locator,
}

/// First match exists, is displayed, enabled and not covered
#[derive(Debug, Clone)]
pub struct LocatedAndClickable {
    locator: Locator,
}

/// At least one match and every match displayed
#[derive(Debug, Clone)]
pub struct AllLocatedAndVisible {
    locator: Locator,
}

/// No match, or every match hidden
#[derive(Debug, Clone)]
pub struct InvisibilityOf {
    locator: Locator,
}

/// Exactly `expected` matches
#[derive(Debug, Clone)]
pub struct CountEquals {
    locator: Locator,
    expected: usize,
}

/// First match displayed and its text contains a fragment
#[derive(Debug, Clone)]
pub struct TextPresent {
    locator: Locator,
    fragment: String,
}

/// Wait for the first match of `locator` to be visible
#[must_use]
pub fn located_and_visible(locator: &Locator) -> LocatedAndVisible {
    LocatedAndVisible {
        locator: locator.clone(),
    }
}

/// Wait for the first match of `locator` to be clickable
#[must_use]
pub fn located_and_clickable(locator: &Locator) -> LocatedAndClickable {
    LocatedAndClickable {
        locator: locator.clone(),
    }
}

/// Wait for every match of `locator` to be visible
#[must_use]
pub fn all_located_and_visible(locator: &Locator) -> AllLocatedAndVisible {
    AllLocatedAndVisible {
        locator: locator.clone(),
    }
}

/// Wait for `locator` to match nothing visible
#[must_use]
pub fn invisibility_of(locator: &Locator) -> InvisibilityOf {
    InvisibilityOf {
        locator: locator.clone(),
    }
}

/// Wait for `locator` to match exactly `expected` elements
#[must_use]
pub fn count_equals(locator: &Locator, expected: usize) -> CountEquals {
    CountEquals {
        locator: locator.clone(),
        expected,
    }
}

/// Wait for the first match of `locator` to show `fragment`
#[must_use]
pub fn text_present(locator: &Locator, fragment: impl Into<String>) -> TextPresent {
    TextPresent {
        locator: locator.clone(),
        fragment: fragment.into(),
    }
}

/// No match, or the first match's text lacks a fragment
#[derive(Debug, Clone)]
pub struct TextAbsent {
    locator: Locator,
    fragment: String,
}

/// Wait for the first match of `locator` to stop showing `fragment`
#[must_use]
pub fn text_absent(locator: &Locator, fragment: impl Into<String>) -> TextAbsent {
    TextAbsent {
        locator: locator.clone(),
        fragment: fragment.into(),
    }
}

#[async_trait]
impl Condition for LocatedAndVisible {
    type Output = ElementHandle;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<ElementHandle>> {
        let Some(element) = driver.find_first(&self.locator).await? else {
            return Ok(Probe::Pending(ObservedState::NotLocated));
        };
        if driver.is_displayed(&element).await? {
            Ok(Probe::Satisfied(element))
        } else {
            Ok(Probe::Pending(ObservedState::Hidden))
        }
    }

    fn description(&self) -> String {
        format!("visibility of element located by {}", self.locator)
    }

    fn locator(&self) -> Option<&Locator> {
        Some(&self.locator)
    }
}

#[async_trait]
impl Condition for LocatedAndClickable {
    type Output = ElementHandle;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<ElementHandle>> {
        let Some(element) = driver.find_first(&self.locator).await? else {
            return Ok(Probe::Pending(ObservedState::NotLocated));
        };
        if !driver.is_displayed(&element).await? {
            return Ok(Probe::Pending(ObservedState::Hidden));
        }
        if !driver.is_enabled(&element).await? || driver.is_obscured(&element).await? {
            return Ok(Probe::Pending(ObservedState::NotInteractable));
        }
        Ok(Probe::Satisfied(element))
    }

    fn description(&self) -> String {
        format!("element to be clickable: {}", self.locator)
    }

    fn locator(&self) -> Option<&Locator> {
        Some(&self.locator)
    }
}

#[async_trait]
impl Condition for AllLocatedAndVisible {
    type Output = Vec<ElementHandle>;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<Vec<ElementHandle>>> {
        let elements = driver.find_all(&self.locator).await?;
        if elements.is_empty() {
            return Ok(Probe::Pending(ObservedState::NotLocated));
        }
        for element in &elements {
            if !driver.is_displayed(element).await? {
                return Ok(Probe::Pending(ObservedState::Hidden));
            }
        }
        Ok(Probe::Satisfied(elements))
    }

    fn description(&self) -> String {
        format!("visibility of all elements located by {}", self.locator)
    }

    fn locator(&self) -> Option<&Locator> {
        Some(&self.locator)
    }
}

#[async_trait]
impl Condition for InvisibilityOf {
    type Output = bool;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<bool>> {
        for element in driver.find_all(&self.locator).await? {
            match driver.is_displayed(&element).await {
                Ok(false) | Err(SuiteError::StaleElement { .. }) => {}
                Ok(true) => return Ok(Probe::Pending(ObservedState::Unsatisfied)),
                Err(err) => return Err(err),
            }
        }
        Ok(Probe::Satisfied(true))
    }

    fn description(&self) -> String {
        format!("invisibility of element located by {}", self.locator)
    }
}

#[async_trait]
impl Condition for CountEquals {
    type Output = bool;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<bool>> {
        let count = driver.find_all(&self.locator).await?.len();
        if count == self.expected {
            Ok(Probe::Satisfied(true))
        } else if count == 0 {
            Ok(Probe::Pending(ObservedState::NotLocated))
        } else {
            Ok(Probe::Pending(ObservedState::Unsatisfied))
        }
    }

    fn description(&self) -> String {
        format!("number of elements located by {} to be {}", self.locator, self.expected)
    }
}

#[async_trait]
impl Condition for TextPresent {
    type Output = bool;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<bool>> {
        let Some(element) = driver.find_first(&self.locator).await? else {
            return Ok(Probe::Pending(ObservedState::NotLocated));
        };
        if !driver.is_displayed(&element).await? {
            return Ok(Probe::Pending(ObservedState::Hidden));
        }
        if driver.text(&element).await?.contains(&self.fragment) {
            Ok(Probe::Satisfied(true))
        } else {
            Ok(Probe::Pending(ObservedState::Unsatisfied))
        }
    }

    fn description(&self) -> String {
        format!("text '{}' to be present in {}", self.fragment, self.locator)
    }

    fn locator(&self) -> Option<&Locator> {
        Some(&self.locator)
    }
}

#[async_trait]
impl Condition for TextAbsent {
    type Output = bool;

    async fn probe(&self, driver: &dyn Driver) -> SuiteResult<Probe<bool>> {
        let Some(element) = driver.find_first(&self.locator).await? else {
            return Ok(Probe::Satisfied(true));
        };
        if driver.text(&element).await?.contains(&self.fragment) {
            Ok(Probe::Pending(ObservedState::Unsatisfied))
        } else {
            Ok(Probe::Satisfied(true))
        }
    }

    fn description(&self) -> String {
        format!("text '{}' to be absent from {}", self.fragment, self.locator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::MockApp;

    const ROOT: &str = "http://localhost:3000/";

    async fn logged_in() -> MockApp {
        let app = MockApp::new();
        app.navigate(ROOT).await.unwrap();
        app.login_directly("admin", "admin");
        app
    }

    mod visibility_tests {
        use super::*;

        #[tokio::test]
        async fn test_visible_returns_first_match() {
            let app = logged_in().await;
            let probe = located_and_visible(&Locator::css(".delete-btn"))
                .probe(&app)
                .await
                .unwrap();
            match probe {
                Probe::Satisfied(el) => assert_eq!(el.tag_name, "button"),
                Probe::Pending(state) => panic!("expected a delete button, saw {state}"),
            }
        }

        #[tokio::test]
        async fn test_missing_reports_not_located() {
            let app = MockApp::new();
            let probe = located_and_visible(&Locator::id("itemList"))
                .probe(&app)
                .await
                .unwrap();
            assert_eq!(probe, Probe::Pending(ObservedState::NotLocated));
        }

        #[tokio::test]
        async fn test_all_visible_collects_rows() {
            let app = logged_in().await;
            let probe = all_located_and_visible(&Locator::css("#itemList li"))
                .probe(&app)
                .await
                .unwrap();
            match probe {
                Probe::Satisfied(rows) => assert_eq!(rows.len(), 2),
                Probe::Pending(state) => panic!("expected seeded rows, saw {state}"),
            }
        }

        #[tokio::test]
        async fn test_one_hidden_row_holds_back_all_visible() {
            let app = logged_in().await;
            app.hide(Locator::xpath("//ul/li[2]"));
            let probe = all_located_and_visible(&Locator::css("#itemList li"))
                .probe(&app)
                .await
                .unwrap();
            assert_eq!(probe, Probe::Pending(ObservedState::Hidden));
            assert_eq!(
                text_present(&Locator::css("#itemList li"), "Sample Item 1")
                    .probe(&app)
                    .await
                    .unwrap(),
                Probe::Satisfied(true)
            );

            app.hide(Locator::id("itemList"));
            assert_eq!(
                text_present(&Locator::id("itemList"), "Sample Item 1")
                    .probe(&app)
                    .await
                    .unwrap(),
                Probe::Pending(ObservedState::Hidden)
            );
            assert_eq!(
                invisibility_of(&Locator::id("itemList")).probe(&app).await.unwrap(),
                Probe::Satisfied(true)
            );
        }

        #[tokio::test]
        async fn test_invisibility_of_absent_element() {
            let app = logged_in().await;
            let probe = invisibility_of(&Locator::id("confirmButton"))
                .probe(&app)
                .await
                .unwrap();
            assert_eq!(probe, Probe::Satisfied(true));
        }
    }

    mod clickable_tests {
        use super::*;

        #[tokio::test]
        async fn test_hidden_and_disabled_are_reported() {
            let app = logged_in().await;
            app.disable(Locator::id("addItemButton"));
            assert_eq!(
                located_and_clickable(&Locator::id("addItemButton")).probe(&app).await.unwrap(),
                Probe::Pending(ObservedState::NotInteractable)
            );

            app.hide(Locator::id("logoutBtn"));
            assert_eq!(
                located_and_clickable(&Locator::id("logoutBtn")).probe(&app).await.unwrap(),
                Probe::Pending(ObservedState::Hidden)
            );
        }

        #[tokio::test]
        async fn test_clickable_when_unobstructed() {
            let app = logged_in().await;
            let probe = located_and_clickable(&Locator::id("addItemButton"))
                .probe(&app)
                .await
                .unwrap();
            assert!(matches!(probe, Probe::Satisfied(_)));
        }

        #[tokio::test]
        async fn test_modal_overlay_blocks_clicks_behind_it() {
            let app = logged_in().await;
            let delete = app
                .find_first(&Locator::css(".delete-btn"))
                .await
                .unwrap()
                .unwrap();
            app.click(&delete).await.unwrap();

            let behind = located_and_clickable(&Locator::id("addItemButton"))
                .probe(&app)
                .await
                .unwrap();
            assert_eq!(behind, Probe::Pending(ObservedState::NotInteractable));

            let confirm = located_and_clickable(&Locator::id("confirmButton"))
                .probe(&app)
                .await
                .unwrap();
            assert!(matches!(confirm, Probe::Satisfied(_)));
        }
    }

    mod predicate_tests {
        use super::*;

        #[tokio::test]
        async fn test_count_equals() {
            let app = logged_in().await;
            let rows = Locator::css("#itemList li");
            assert_eq!(
                count_equals(&rows, 2).probe(&app).await.unwrap(),
                Probe::Satisfied(true)
            );
            assert_eq!(
                count_equals(&rows, 3).probe(&app).await.unwrap(),
                Probe::Pending(ObservedState::Unsatisfied)
            );
        }

        #[tokio::test]
        async fn test_text_present() {
            let app = logged_in().await;
            let list = Locator::id("itemList");
            assert_eq!(
                text_present(&list, "Sample Item 2").probe(&app).await.unwrap(),
                Probe::Satisfied(true)
            );
            assert_eq!(
                text_present(&list, "Nope").probe(&app).await.unwrap(),
                Probe::Pending(ObservedState::Unsatisfied)
            );
        }

        #[tokio::test]
        async fn test_text_absent() {
            let app = logged_in().await;
            let list = Locator::id("itemList");
            assert_eq!(
                text_absent(&list, "Sample Item 1").probe(&app).await.unwrap(),
                Probe::Pending(ObservedState::Unsatisfied)
            );
            assert_eq!(
                text_absent(&list, "Nope").probe(&app).await.unwrap(),
                Probe::Satisfied(true)
            );
            assert_eq!(
                text_absent(&Locator::id("missing"), "x").probe(&app).await.unwrap(),
                Probe::Satisfied(true)
            );
        }

        #[test]
        fn test_descriptions_name_the_locator() {
            let loc = Locator::id("saveItemButton");
            assert!(located_and_clickable(&loc)
                .description()
                .contains("By.id: saveItemButton"));
            assert!(count_equals(&loc, 1).description().ends_with("to be 1"));
            assert_eq!(
                located_and_visible(&loc).locator(),
                Some(&Locator::id("saveItemButton"))
            );
            assert!(invisibility_of(&loc).locator().is_none());
        }
    }
}
