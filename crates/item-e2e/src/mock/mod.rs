//! In-process simulation of the item-management app.
//!
//! [`MockApp`] implements [`Driver`] over a model of the React client and its
//! Express backend, so every page object and scenario can run without a
//! browser. It renders the same markup the real client does (ids, classes,
//! nesting), answers the same locators, and reproduces the asynchronous parts
//! that make explicit waits necessary:
//!
//! - backend round-trips (login, create, update, delete) land after a
//!   configurable latency, so the UI lags behind the click;
//! - the delete confirmation is a full-screen overlay that covers everything
//!   behind it;
//! - handles to elements that unmount (a row that was deleted, the whole tree
//!   after navigation) are rejected as stale.
//!
//! One deliberate difference: saving a blank rename shows
//! [`EMPTY_NAME_ERROR`], the same message as a blank create. The real client
//! shows "Item name cannot be empty." on that path, so scenarios that compare
//! the two messages pass here and fail against a live app.
//!
//! [`MockApp::hide`] and [`MockApp::disable`] restyle matched elements, for
//! exercising waits on elements that are present but not usable.
//!
//! ## Example
//!
//! ```rust,ignore
//! let app = MockApp::with_config(MockAppConfig::default().with_latency_ms(50));
//! let session = Session::new(Box::new(app.clone()), SuiteConfig::default());
//! LoginPage::new(&session).login("admin", "admin").await?;
//! ```

mod dom;
mod selector;

use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::pages::{EMPTY_NAME_ERROR, INVALID_CREDENTIALS_ERROR};
use crate::result::{SuiteError, SuiteResult};
use async_trait::async_trait;
use dom::{Action, Binding, Dom, Node};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Root URL the simulated client is served from
pub const DEFAULT_ROOT_URL: &str = "http://localhost:3000/";

/// Configuration for the simulated app
#[derive(Debug, Clone)]
pub struct MockAppConfig {
    /// URL that serves the client
    pub root_url: String,
    /// Delay before a backend response is applied to the UI
    pub latency: Duration,
    /// Items the backend starts with
    pub seed_items: Vec<String>,
    /// Accepted `(username, password)` pairs
    pub users: Vec<(String, String)>,
}

impl Default for MockAppConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            latency: Duration::ZERO,
            seed_items: vec!["Sample Item 1".to_string(), "Sample Item 2".to_string()],
            users: vec![("admin".to_string(), "admin".to_string())],
        }
    }
}

impl MockAppConfig {
    /// Set backend latency in milliseconds
    #[must_use]
    pub const fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency = Duration::from_millis(ms);
        self
    }

    /// Replace the seeded items
    #[must_use]
    pub fn with_seed_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Serve the client from a different root URL
    #[must_use]
    pub fn with_root_url(mut self, url: impl Into<String>) -> Self {
        self.root_url = url.into();
        self
    }
}

/// A stored item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockItem {
    /// Millisecond-timestamp id, like the backend assigns
    pub id: u64,
    /// Item name
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Blank,
    Login,
    Items,
}

#[derive(Debug, Clone)]
enum Effect {
    LoginResponse { accepted: bool },
    Created { name: String },
    Updated { id: u64, name: String },
    Deleted { id: u64 },
}

#[derive(Debug)]
struct AppState {
    // client
    url: String,
    screen: Screen,
    document: u64,
    username: String,
    password: String,
    new_item: String,
    editing: Option<MockItem>,
    login_error: String,
    item_error: String,
    confirm_delete: Option<u64>,
    items: Vec<MockItem>,
    // backend
    stored: Vec<MockItem>,
    last_id: u64,
    // driver
    pending: Vec<(Instant, Effect)>,
    dom: Dom,
    fail_next: Option<String>,
    hidden: Vec<Locator>,
    disabled: Vec<Locator>,
    closed: bool,
    history: Vec<String>,
}

/// Simulated app implementing [`Driver`]. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockApp {
    config: Arc<MockAppConfig>,
    state: Arc<Mutex<AppState>>,
}

impl Default for MockApp {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApp {
    /// Simulated app with default config, already showing the login screen
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockAppConfig::default())
    }

    /// Simulated app with custom config, already showing the login screen
    #[must_use]
    pub fn with_config(config: MockAppConfig) -> Self {
        let stored: Vec<MockItem> = config
            .seed_items
            .iter()
            .enumerate()
            .map(|(i, name)| MockItem {
                id: i as u64 + 1,
                name: name.clone(),
            })
            .collect();
        let mut state = AppState {
            url: config.root_url.clone(),
            screen: Screen::Login,
            document: 1,
            username: String::new(),
            password: String::new(),
            new_item: String::new(),
            editing: None,
            login_error: String::new(),
            item_error: String::new(),
            confirm_delete: None,
            items: Vec::new(),
            last_id: stored.len() as u64,
            stored,
            pending: Vec::new(),
            dom: Dom::blank(),
            fail_next: None,
            hidden: Vec::new(),
            disabled: Vec::new(),
            closed: false,
            history: Vec::new(),
        };
        state.render();
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make the next tree query fail with a non-transient driver error
    pub fn fail_next_query(&self, message: impl Into<String>) {
        self.lock_raw().fail_next = Some(message.into());
    }

    /// Render everything `locator` matches as hidden, across re-renders
    pub fn hide(&self, locator: Locator) {
        let mut state = self.lock_raw();
        state.hidden.push(locator);
        state.render();
    }

    /// Render everything `locator` matches as disabled, across re-renders
    pub fn disable(&self, locator: Locator) {
        let mut state = self.lock_raw();
        state.disabled.push(locator);
        state.render();
    }

    /// Undo [`hide`](Self::hide) and [`disable`](Self::disable)
    pub fn restore(&self) {
        let mut state = self.lock_raw();
        state.hidden.clear();
        state.disabled.clear();
        state.render();
    }

    /// Skip the login form: authenticate and show the items screen now
    pub fn login_directly(&self, username: &str, password: &str) {
        let mut state = self.lock_raw();
        state.username = username.to_string();
        state.password = password.to_string();
        let accepted = self.accepts(username, password);
        state.apply(Effect::LoginResponse { accepted });
        state.render();
    }

    /// Names currently stored by the backend, in insertion order
    #[must_use]
    pub fn stored_item_names(&self) -> Vec<String> {
        let mut state = self.lock_raw();
        state.settle();
        state.stored.iter().map(|i| i.name.clone()).collect()
    }

    /// Current value of the first input matched by `locator`
    #[must_use]
    pub fn input_value(&self, locator: &Locator) -> Option<String> {
        let mut state = self.lock_raw();
        state.settle();
        let found = selector::select(&state.dom, locator, None).ok()?;
        found
            .first()
            .map(|&idx| state.dom.node(idx))
            .filter(|node| node.binding.is_some())
            .map(|node| node.value.clone())
    }

    /// Recorded driver calls, e.g. `"click:#loginButton"`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock_raw().history.clone()
    }

    /// Check if a driver method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock_raw().history.iter().any(|c| c.starts_with(method))
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock_raw().closed
    }

    fn accepts(&self, username: &str, password: &str) -> bool {
        self.config
            .users
            .iter()
            .any(|(u, p)| u == username && p == password)
    }

    fn lock_raw(&self) -> MutexGuard<'_, AppState> {
        // Poisoned by a panicking test; the state itself is still whole
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Lock for a driver call: rejects closed sessions and applies due effects
    fn lock(&self) -> SuiteResult<MutexGuard<'_, AppState>> {
        let mut state = self.lock_raw();
        if state.closed {
            return Err(SuiteError::SessionClosed);
        }
        state.settle();
        Ok(state)
    }

    fn schedule(&self, state: &mut AppState, effect: Effect) {
        if self.config.latency.is_zero() {
            state.apply(effect);
        } else {
            state.pending.push((Instant::now() + self.config.latency, effect));
        }
    }

    fn resolve(state: &AppState, element: &ElementHandle) -> SuiteResult<usize> {
        let stale = || SuiteError::StaleElement {
            element: element.id.clone(),
        };
        let (document, key) = element.id.split_once('/').ok_or_else(stale)?;
        if document != format!("d{}", state.document) {
            return Err(stale());
        }
        state.dom.find_key(key).ok_or_else(stale)
    }

    fn handle(state: &AppState, idx: usize) -> ElementHandle {
        let node = state.dom.node(idx);
        ElementHandle::new(format!("d{}/{}", state.document, node.key), node.tag)
    }

    fn describe(node: &Node) -> String {
        node.id
            .as_ref()
            .map(|id| format!("#{id}"))
            .or_else(|| node.classes.last().map(|c| format!(".{c}")))
            .unwrap_or_else(|| node.tag.to_string())
    }

    fn perform(&self, state: &mut AppState, action: Action) {
        match action {
            Action::Login => {
                state.login_error.clear();
                state.item_error.clear();
                let accepted = self.accepts(&state.username, &state.password);
                self.schedule(state, Effect::LoginResponse { accepted });
            }
            Action::Logout => {
                state.reset_client();
                state.screen = Screen::Login;
            }
            Action::AddItem => {
                state.item_error.clear();
                if state.new_item.trim().is_empty() {
                    state.item_error = EMPTY_NAME_ERROR.to_string();
                } else {
                    let name = state.new_item.clone();
                    self.schedule(state, Effect::Created { name });
                }
            }
            Action::EditItem(id) => {
                state.editing = state.items.iter().find(|i| i.id == id).cloned();
            }
            Action::SaveItem(id) => {
                state.item_error.clear();
                let name = state
                    .editing
                    .as_ref()
                    .map(|i| i.name.clone())
                    .unwrap_or_default();
                if name.trim().is_empty() {
                    state.item_error = EMPTY_NAME_ERROR.to_string();
                } else {
                    self.schedule(state, Effect::Updated { id, name });
                }
            }
            Action::DeleteItem(id) => state.confirm_delete = Some(id),
            Action::ConfirmModal => {
                if let Some(id) = state.confirm_delete {
                    state.item_error.clear();
                    self.schedule(state, Effect::Deleted { id });
                }
            }
            Action::CancelModal => state.confirm_delete = None,
        }
    }
}

impl AppState {
    fn next_id(&mut self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    fn reset_client(&mut self) {
        self.username.clear();
        self.password.clear();
        self.new_item.clear();
        self.editing = None;
        self.login_error.clear();
        self.item_error.clear();
        self.confirm_delete = None;
        self.items.clear();
    }

    fn logged_in(&self) -> bool {
        self.screen == Screen::Items
    }

    fn refresh_items(&mut self) {
        if self.logged_in() {
            self.items = self.stored.clone();
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::LoginResponse { accepted } => {
                if accepted {
                    self.screen = Screen::Items;
                    self.refresh_items();
                } else if self.screen == Screen::Login {
                    self.login_error = INVALID_CREDENTIALS_ERROR.to_string();
                }
            }
            Effect::Created { name } => {
                let id = self.next_id();
                self.stored.push(MockItem { id, name });
                self.new_item.clear();
                self.refresh_items();
            }
            Effect::Updated { id, name } => {
                if let Some(item) = self.stored.iter_mut().find(|i| i.id == id) {
                    item.name = name;
                }
                self.editing = None;
                self.refresh_items();
            }
            Effect::Deleted { id } => {
                self.stored.retain(|i| i.id != id);
                self.confirm_delete = None;
                self.refresh_items();
            }
        }
    }

    /// Apply every effect whose response is due
    fn settle(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|(at, _)| *at <= now);
        self.pending = waiting;
        if due.is_empty() {
            return;
        }
        for (_, effect) in due {
            self.apply(effect);
        }
        self.render();
    }

    fn render(&mut self) {
        let mut dom = Dom::blank();
        if self.screen == Screen::Blank {
            self.dom = dom;
            return;
        }

        let body = dom.body();
        let root = dom.append(Some(body), Node::new("div", "root").id("root"));
        let screen = dom.append(
            Some(root),
            Node::new("div", "screen").class(&["min-h-screen", "flex"]),
        );
        let card = dom.append(Some(screen), Node::new("div", "card").class(&["bg-white"]));
        dom.append(Some(card), Node::new("h1", "title").text("Simple App"));

        match self.screen {
            Screen::Login => self.render_login(&mut dom, card),
            Screen::Items => self.render_items(&mut dom, card),
            Screen::Blank => {}
        }

        // Sibling of the card, so the shared error XPath also reaches its <p>
        if self.confirm_delete.is_some() {
            let overlay = dom.append(
                Some(screen),
                Node::new("div", "modal").class(&["fixed", "inset-0"]),
            );
            dom.mark_overlay(overlay);
            let panel = dom.append(Some(overlay), Node::new("div", "modal/panel").class(&["bg-white"]));
            dom.append(
                Some(panel),
                Node::new("p", "modal/message").text("Are you sure you want to delete this item?"),
            );
            let buttons = dom.append(Some(panel), Node::new("div", "modal/buttons"));
            dom.append(
                Some(buttons),
                Node::new("button", "modal/confirm")
                    .id("confirmButton")
                    .text("Confirm")
                    .on_click(Action::ConfirmModal),
            );
            dom.append(
                Some(buttons),
                Node::new("button", "modal/cancel")
                    .id("cancelButton")
                    .text("Cancel")
                    .on_click(Action::CancelModal),
            );
        }

        self.restyle(&mut dom);
        self.dom = dom;
    }

    fn restyle(&self, dom: &mut Dom) {
        for locator in &self.hidden {
            for idx in selector::select(dom, locator, None).unwrap_or_default() {
                dom.hide(idx);
            }
        }
        for locator in &self.disabled {
            for idx in selector::select(dom, locator, None).unwrap_or_default() {
                dom.disable(idx);
            }
        }
    }

    fn render_login(&self, dom: &mut Dom, card: usize) {
        let page = dom.append(Some(card), Node::new("div", "login").class(&["space-y-4"]));
        dom.append(
            Some(page),
            Node::new("input", "login/username")
                .id("username")
                .bind(Binding::Username, &self.username),
        );
        dom.append(
            Some(page),
            Node::new("input", "login/password")
                .id("password")
                .bind(Binding::Password, &self.password),
        );
        dom.append(
            Some(page),
            Node::new("button", "login/submit")
                .id("loginButton")
                .text("Login")
                .on_click(Action::Login),
        );
        if !self.login_error.is_empty() {
            dom.append(
                Some(page),
                Node::new("p", "login/error")
                    .class(&["text-red-500", "error"])
                    .text(self.login_error.clone()),
            );
        }
    }

    fn render_items(&self, dom: &mut Dom, card: usize) {
        let page = dom.append(Some(card), Node::new("div", "items"));
        let bar = dom.append(Some(page), Node::new("div", "items/bar").class(&["flex", "justify-end"]));
        dom.append(
            Some(bar),
            Node::new("button", "items/logout")
                .id("logoutBtn")
                .text("Logout")
                .on_click(Action::Logout),
        );
        if !self.item_error.is_empty() {
            dom.append(
                Some(page),
                Node::new("p", "items/error")
                    .class(&["text-red-500", "error"])
                    .text(self.item_error.clone()),
            );
        }
        dom.append(Some(page), Node::new("h2", "items/heading").text("Manage Items"));
        let form = dom.append(Some(page), Node::new("div", "items/form").class(&["flex", "gap-2"]));
        dom.append(
            Some(form),
            Node::new("input", "items/new")
                .id("newItemInput")
                .bind(Binding::NewItem, &self.new_item),
        );
        dom.append(
            Some(form),
            Node::new("button", "items/add")
                .id("addItemButton")
                .text("Add Item")
                .on_click(Action::AddItem),
        );
        dom.append(Some(page), Node::new("h3", "items/list-heading").text("All Items:"));
        let list = dom.append(Some(page), Node::new("ul", "items/list").id("itemList"));

        for item in &self.items {
            let key = format!("items/row:{}", item.id);
            let row = dom.append(Some(list), Node::new("li", key.clone()).class(&["flex"]));
            let editing = self.editing.as_ref().filter(|e| e.id == item.id);
            if let Some(edit) = editing {
                let form = dom.append(Some(row), Node::new("div", format!("{key}/edit-form")));
                dom.append(
                    Some(form),
                    Node::new("input", format!("{key}/edit-input"))
                        .id("editItemInput")
                        .bind(Binding::EditName, &edit.name),
                );
                dom.append(
                    Some(form),
                    Node::new("button", format!("{key}/save"))
                        .id("saveItemButton")
                        .text("Save")
                        .on_click(Action::SaveItem(item.id)),
                );
            } else {
                dom.append(
                    Some(row),
                    Node::new("div", format!("{key}/label"))
                        .text(format!("ID: {} - Name: {}", item.id, item.name)),
                );
            }
            let actions = dom.append(Some(row), Node::new("div", format!("{key}/actions")));
            if editing.is_none() {
                dom.append(
                    Some(actions),
                    Node::new("button", format!("{key}/edit"))
                        .class(&["edit-btn"])
                        .text("Edit")
                        .on_click(Action::EditItem(item.id)),
                );
                dom.append(
                    Some(actions),
                    Node::new("button", format!("{key}/delete"))
                        .class(&["delete-btn"])
                        .text("Delete")
                        .on_click(Action::DeleteItem(item.id)),
                );
            }
        }
    }

    fn bound_field(&mut self, node: &Node) -> Option<&mut String> {
        match node.binding? {
            Binding::Username => Some(&mut self.username),
            Binding::Password => Some(&mut self.password),
            Binding::NewItem => Some(&mut self.new_item),
            Binding::EditName => self.editing.as_mut().map(|e| &mut e.name),
        }
    }
}

#[async_trait]
impl Driver for MockApp {
    async fn navigate(&self, url: &str) -> SuiteResult<()> {
        let mut state = self.lock()?;
        state.history.push(format!("navigate:{url}"));

        let root = self.config.root_url.trim_end_matches('/');
        let screen = if url == "about:blank" {
            Screen::Blank
        } else if url.trim_end_matches('/') == root
            || url.starts_with(&format!("{root}/"))
            || url.starts_with(&format!("{root}?"))
            || url.starts_with(&format!("{root}#"))
        {
            Screen::Login
        } else {
            return Err(SuiteError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        };

        // A reload abandons the client but not requests the backend already took
        for (_, effect) in std::mem::take(&mut state.pending) {
            if let Effect::LoginResponse { .. } = effect {
                continue;
            }
            state.apply(effect);
        }
        state.reset_client();
        state.screen = screen;
        state.url = url.to_string();
        state.document += 1;
        state.render();
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> SuiteResult<Vec<ElementHandle>> {
        let mut state = self.lock()?;
        if let Some(message) = state.fail_next.take() {
            return Err(SuiteError::driver(message));
        }
        let found = selector::select(&state.dom, locator, None)?;
        Ok(found.into_iter().map(|i| Self::handle(&state, i)).collect())
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> SuiteResult<Vec<ElementHandle>> {
        let mut state = self.lock()?;
        if let Some(message) = state.fail_next.take() {
            return Err(SuiteError::driver(message));
        }
        let scope = Self::resolve(&state, parent)?;
        let found = selector::select(&state.dom, locator, Some(scope))?;
        Ok(found.into_iter().map(|i| Self::handle(&state, i)).collect())
    }

    async fn click(&self, element: &ElementHandle) -> SuiteResult<()> {
        let mut state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        let node = state.dom.node(idx).clone();
        state.history.push(format!("click:{}", Self::describe(&node)));

        if !node.displayed {
            return Err(SuiteError::driver(format!(
                "element not interactable: {}",
                Self::describe(&node)
            )));
        }
        if state.dom.has_overlay() && !node.in_overlay {
            return Err(SuiteError::driver(format!(
                "element click intercepted: {} is covered by the confirmation modal",
                Self::describe(&node)
            )));
        }
        // Browsers swallow clicks on disabled controls
        if !node.enabled {
            return Ok(());
        }
        if let Some(action) = node.action {
            self.perform(&mut state, action);
            state.render();
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SuiteResult<()> {
        let mut state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        let node = state.dom.node(idx).clone();
        state.history.push(format!("send_keys:{}", Self::describe(&node)));

        let Some(field) = state.bound_field(&node) else {
            return Err(SuiteError::driver(format!(
                "element not interactable: {} does not accept keys",
                Self::describe(&node)
            )));
        };
        field.push_str(text);
        state.render();
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> SuiteResult<()> {
        let mut state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        let node = state.dom.node(idx).clone();
        state.history.push(format!("clear:{}", Self::describe(&node)));

        let Some(field) = state.bound_field(&node) else {
            return Err(SuiteError::driver(format!(
                "invalid element state: {} is not editable",
                Self::describe(&node)
            )));
        };
        field.clear();
        state.render();
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> SuiteResult<String> {
        let state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        Ok(state.dom.text_of(idx))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> SuiteResult<bool> {
        let state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        Ok(state.dom.node(idx).displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> SuiteResult<bool> {
        let state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        Ok(state.dom.node(idx).enabled)
    }

    async fn is_obscured(&self, element: &ElementHandle) -> SuiteResult<bool> {
        let state = self.lock()?;
        let idx = Self::resolve(&state, element)?;
        Ok(state.dom.has_overlay() && !state.dom.node(idx).in_overlay)
    }

    async fn current_url(&self) -> SuiteResult<String> {
        Ok(self.lock()?.url.clone())
    }

    async fn close(&self) -> SuiteResult<()> {
        let mut state = self.lock_raw();
        state.history.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}
