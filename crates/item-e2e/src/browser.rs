//! Chromium driver over the DevTools protocol.
//!
//! Enabled with the `browser` feature. Element handles are entries in a
//! per-driver table of remote objects; a handle whose node has left the
//! document reports [`SuiteError::StaleElement`].

use crate::config::BrowserSettings;
use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::result::{SuiteError, SuiteResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const TAG_NAME_JS: &str = "function() { return this.isConnected ? this.tagName.toLowerCase() : null; }";

const IS_DISPLAYED_JS: &str = r"function() {
    if (!this.isConnected) return null;
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return style.display !== 'none' && style.visibility !== 'hidden'
        && rect.width > 0 && rect.height > 0;
}";

const IS_ENABLED_JS: &str = "function() { return this.isConnected ? !this.disabled : null; }";

const IS_OBSCURED_JS: &str = r"function() {
    if (!this.isConnected) return null;
    const rect = this.getBoundingClientRect();
    const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    return hit !== null && hit !== this && !this.contains(hit);
}";

const CLEAR_JS: &str = r"function() {
    if (!this.isConnected) return null;
    const proto = Object.getPrototypeOf(this);
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    setter.call(this, '');
    this.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
}";

/// Remote objects by backend node id.
///
/// Every lookup that matches a node already in the table reuses its handle,
/// so repeated polls of the same locator do not grow the table. Entries are
/// dropped on navigation and close.
struct ElementTable<E> {
    entries: Mutex<HashMap<i64, Arc<E>>>,
}

impl<E> ElementTable<E> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> SuiteResult<MutexGuard<'_, HashMap<i64, Arc<E>>>> {
        self.entries
            .lock()
            .map_err(|_| SuiteError::driver("element table lock poisoned"))
    }

    /// Store the latest remote object for `node` and return its handle id
    fn insert(&self, node: i64, element: E) -> SuiteResult<String> {
        let _ = self.lock()?.insert(node, Arc::new(element));
        Ok(format!("n{node}"))
    }

    fn get(&self, handle: &ElementHandle) -> SuiteResult<Arc<E>> {
        let node = handle
            .id
            .strip_prefix('n')
            .and_then(|n| n.parse::<i64>().ok());
        let table = self.lock()?;
        node.and_then(|n| table.get(&n).cloned())
            .ok_or_else(|| SuiteError::StaleElement {
                element: handle.to_string(),
            })
    }

    fn clear(&self) -> SuiteResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().map(|t| t.len()).unwrap_or_default()
    }
}

/// Driver backed by a headless (or headed) Chromium
pub struct ChromiumDriver {
    browser: tokio::sync::Mutex<CdpBrowser>,
    page: CdpPage,
    elements: ElementTable<Element>,
    handler: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("elements", &self.elements.len())
            .finish_non_exhaustive()
    }
}

fn driver_err(e: impl std::fmt::Display) -> SuiteError {
    SuiteError::driver(e.to_string())
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(settings: &BrowserSettings) -> SuiteResult<Self> {
        let mut builder = CdpConfig::builder().window_size(settings.viewport_width, settings.viewport_height);

        if !settings.headless {
            builder = builder.with_head();
        }

        if !settings.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = settings.chromium_path {
            if !path.exists() {
                return Err(SuiteError::BrowserNotFound);
            }
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| SuiteError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| SuiteError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SuiteError::BrowserLaunch {
                message: e.to_string(),
            })?;

        debug!(headless = settings.headless, "chromium launched");
        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            elements: ElementTable::new(),
            handler,
        })
    }

    async fn register(&self, elements: Vec<Element>) -> SuiteResult<Vec<ElementHandle>> {
        let mut handles = Vec::with_capacity(elements.len());
        for element in elements {
            let tag = element
                .call_js_fn(TAG_NAME_JS, false)
                .await
                .map_err(driver_err)?
                .result
                .value
                .and_then(|v| v.as_str().map(ToString::to_string))
                .unwrap_or_default();
            let node = *element.backend_node_id.inner();
            let id = self.elements.insert(node, element)?;
            handles.push(ElementHandle::new(id, tag));
        }
        Ok(handles)
    }

    fn resolve(&self, handle: &ElementHandle) -> SuiteResult<Arc<Element>> {
        self.elements.get(handle)
    }

    /// Run `function` with `this` bound to the element; `null` means detached
    async fn call(&self, handle: &ElementHandle, function: &str) -> SuiteResult<Value> {
        let element = self.resolve(handle)?;
        let value = element
            .call_js_fn(function, false)
            .await
            .map_err(|e| stale_or_driver(handle, &e.to_string()))?
            .result
            .value
            .unwrap_or(Value::Null);
        if value.is_null() {
            return Err(SuiteError::StaleElement {
                element: handle.to_string(),
            });
        }
        Ok(value)
    }

    async fn call_bool(&self, handle: &ElementHandle, function: &str) -> SuiteResult<bool> {
        Ok(self.call(handle, function).await?.as_bool().unwrap_or(false))
    }
}

fn stale_or_driver(handle: &ElementHandle, message: &str) -> SuiteError {
    if message.contains("No node") || message.contains("Could not find object") {
        SuiteError::StaleElement {
            element: handle.to_string(),
        }
    } else {
        SuiteError::driver(message)
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> SuiteResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SuiteError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.elements.clear()
    }

    async fn find_all(&self, locator: &Locator) -> SuiteResult<Vec<ElementHandle>> {
        let found = match locator {
            Locator::XPath(expression) => self.page.find_xpaths(expression.as_str()).await,
            _ => {
                let css = locator.to_css().unwrap_or_default();
                self.page.find_elements(css).await
            }
        };
        match found {
            Ok(elements) => self.register(elements).await,
            // CDP reports "no match" as an error for some lookups
            Err(e) if e.to_string().contains("not found") => Ok(Vec::new()),
            Err(e) => Err(driver_err(e)),
        }
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> SuiteResult<Vec<ElementHandle>> {
        let css = locator.to_css().ok_or_else(|| {
            SuiteError::driver(format!("{locator} cannot be scoped to an element"))
        })?;
        let element = self.resolve(parent)?;
        match element.find_elements(css).await {
            Ok(elements) => self.register(elements).await,
            Err(e) if e.to_string().contains("not found") => Ok(Vec::new()),
            Err(e) => Err(stale_or_driver(parent, &e.to_string())),
        }
    }

    async fn click(&self, element: &ElementHandle) -> SuiteResult<()> {
        let target = self.resolve(element)?;
        target
            .click()
            .await
            .map_err(|e| stale_or_driver(element, &e.to_string()))?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SuiteResult<()> {
        let target = self.resolve(element)?;
        target
            .focus()
            .await
            .map_err(|e| stale_or_driver(element, &e.to_string()))?;
        target
            .type_str(text)
            .await
            .map_err(|e| stale_or_driver(element, &e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> SuiteResult<()> {
        self.call(element, CLEAR_JS).await?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> SuiteResult<String> {
        let target = self.resolve(element)?;
        let text = target
            .inner_text()
            .await
            .map_err(|e| stale_or_driver(element, &e.to_string()))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> SuiteResult<bool> {
        self.call_bool(element, IS_DISPLAYED_JS).await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> SuiteResult<bool> {
        self.call_bool(element, IS_ENABLED_JS).await
    }

    async fn is_obscured(&self, element: &ElementHandle) -> SuiteResult<bool> {
        self.call_bool(element, IS_OBSCURED_JS).await
    }

    async fn current_url(&self) -> SuiteResult<String> {
        Ok(self.page.url().await.map_err(driver_err)?.unwrap_or_default())
    }

    async fn close(&self) -> SuiteResult<()> {
        self.elements.clear()?;
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map(|_| ()).map_err(driver_err);
        self.handler.abort();
        closed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    mod element_table_tests {
        use super::*;

        #[test]
        fn test_same_node_reuses_handle() {
            let table = ElementTable::new();
            let first = table.insert(42, "first lookup").unwrap();
            for _ in 0..40 {
                assert_eq!(table.insert(42, "later lookup").unwrap(), first);
            }
            let _ = table.insert(7, "other row").unwrap();
            assert_eq!(table.len(), 2);

            let handle = ElementHandle::new(first, "li");
            assert_eq!(*table.get(&handle).unwrap(), "later lookup");
        }

        #[test]
        fn test_unknown_or_cleared_handle_is_stale() {
            let table = ElementTable::new();
            let id = table.insert(3, "button").unwrap();
            assert!(matches!(
                table.get(&ElementHandle::new("e3", "button")),
                Err(SuiteError::StaleElement { .. })
            ));
            table.clear().unwrap();
            assert!(matches!(
                table.get(&ElementHandle::new(id, "button")),
                Err(SuiteError::StaleElement { .. })
            ));
        }

        #[test]
        fn test_poisoned_table_is_a_driver_error() {
            let table = ElementTable::new();
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _guard = table.entries.lock().unwrap();
                panic!("poison the table");
            }));
            assert!(matches!(table.insert(1, "p"), Err(SuiteError::Driver { .. })));
            assert!(matches!(table.clear(), Err(SuiteError::Driver { .. })));
        }
    }
}
