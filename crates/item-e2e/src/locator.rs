//! Locator abstraction for element selection.
//!
//! A [`Locator`] is pure data: it names the strategy and the query string and
//! nothing else. Resolving it against the live tree is the driver's job, and
//! it is re-resolved on every wait cycle because the page re-renders between
//! actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector strategy for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// Element `id` attribute
    Id(String),
    /// CSS selector (e.g., "#itemList li")
    Css(String),
    /// XPath expression
    XPath(String),
}

impl Locator {
    /// Create an id locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a CSS selector locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// The raw query string
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Css(v) | Self::XPath(v) => v,
        }
    }

    /// Strategy name as used in diagnostics
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Css(_) => "cssSelector",
            Self::XPath(_) => "xpath",
        }
    }

    /// Express the locator as a CSS selector, if it has a CSS form.
    ///
    /// Ids become `#id` (escaped with `[id="..."]` when the id is not a plain
    /// identifier); XPath has no CSS equivalent.
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Id(id) => {
                let plain = !id.is_empty()
                    && !id.starts_with(|c: char| c.is_ascii_digit())
                    && id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                Some(if plain {
                    format!("#{id}")
                } else {
                    format!("[id={id:?}]")
                })
            }
            Self::Css(css) => Some(css.clone()),
            Self::XPath(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By.{}: {}", self.strategy(), self.value())
    }
}
