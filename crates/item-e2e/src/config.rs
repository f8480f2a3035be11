//! Suite configuration.
//!
//! Loaded from YAML, then overridden from `ITEM_E2E_*` environment variables.
//!
//! ```yaml
//! base_url: http://localhost:3000/
//! username: admin
//! password: admin
//! wait_timeout_ms: 10000
//! browser:
//!   headless: false
//! ```

use crate::result::{SuiteError, SuiteResult};
use crate::wait::{
    WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS, SHORT_WAIT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the app under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// Root configuration for a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// URL the client is served from
    pub base_url: String,
    /// Valid username
    pub username: String,
    /// Valid password
    pub password: String,
    /// Timeout for primary interactions
    pub wait_timeout_ms: u64,
    /// Timeout for advisory visibility probes
    pub short_wait_timeout_ms: u64,
    /// Delay between probes
    pub poll_interval_ms: u64,
    /// Browser launch settings
    pub browser: BrowserSettings,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            short_wait_timeout_ms: SHORT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            browser: BrowserSettings::default(),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a window
    pub headless: bool,
    /// Explicit Chromium executable
    pub chromium_path: Option<PathBuf>,
    /// Keep the Chromium sandbox (disable inside containers)
    pub sandbox: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

impl SuiteConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> SuiteResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML, apply environment overrides and validate
    pub fn from_yaml_str(yaml: &str) -> SuiteResult<Self> {
        let mut config: Self = serde_yaml_ng::from_str(yaml)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> SuiteResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the primary wait timeout
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout_ms: u64) -> Self {
        self.wait_timeout_ms = timeout_ms;
        self
    }

    /// Set the advisory wait timeout
    #[must_use]
    pub const fn with_short_wait_timeout(mut self, timeout_ms: u64) -> Self {
        self.short_wait_timeout_ms = timeout_ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Options for primary interactions
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.wait_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Options for advisory probes
    #[must_use]
    pub const fn short_wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.short_wait_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> SuiteResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SuiteError::config("base_url must not be empty"));
        }
        if self.wait_timeout_ms == 0 || self.short_wait_timeout_ms == 0 {
            return Err(SuiteError::config("wait timeouts must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(SuiteError::config("poll_interval_ms must be positive"));
        }
        if self.poll_interval_ms > self.wait_timeout_ms {
            return Err(SuiteError::config(format!(
                "poll_interval_ms ({}) exceeds wait_timeout_ms ({})",
                self.poll_interval_ms, self.wait_timeout_ms
            )));
        }
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> SuiteResult<()> {
        if let Some(url) = lookup("ITEM_E2E_BASE_URL") {
            self.base_url = url;
        }
        if let Some(user) = lookup("ITEM_E2E_USERNAME") {
            self.username = user;
        }
        if let Some(pass) = lookup("ITEM_E2E_PASSWORD") {
            self.password = pass;
        }
        if let Some(ms) = lookup("ITEM_E2E_WAIT_TIMEOUT_MS") {
            self.wait_timeout_ms = parse_ms("ITEM_E2E_WAIT_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("ITEM_E2E_SHORT_WAIT_TIMEOUT_MS") {
            self.short_wait_timeout_ms = parse_ms("ITEM_E2E_SHORT_WAIT_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("ITEM_E2E_POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_ms("ITEM_E2E_POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(flag) = lookup("ITEM_E2E_HEADLESS") {
            self.browser.headless = parse_flag("ITEM_E2E_HEADLESS", &flag)?;
        }
        if let Some(path) = lookup("CHROMIUM_PATH") {
            self.browser.chromium_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = lookup("ITEM_E2E_NO_SANDBOX") {
            self.browser.sandbox = !parse_flag("ITEM_E2E_NO_SANDBOX", &flag)?;
        }
        Ok(())
    }
}

fn parse_ms(key: &str, value: &str) -> SuiteResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| SuiteError::config(format!("{key}: expected milliseconds, got '{value}'")))
}

fn parse_flag(key: &str, value: &str) -> SuiteResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SuiteError::config(format!(
            "{key}: expected a boolean, got '{value}'"
        ))),
    }
}
