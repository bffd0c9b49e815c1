//! Browser capability boundary
//!
//! Everything the harness does to the target page goes through [`Page`]. The
//! production implementation lives in [`crate::webdriver`]; tests script an
//! in-memory page against the same trait.

use async_trait::async_trait;

use crate::error::HarnessResult;

/// Structural query against the current document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    XPath(String),
    Css(String),
}

impl Query {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Query::XPath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Query::Css(selector.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Query::XPath(s) | Query::Css(s) => s,
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::XPath(s) => write!(f, "xpath:{}", s),
            Query::Css(s) => write!(f, "css:{}", s),
        }
    }
}

/// WebDriver key code points (W3C WebDriver, section 17.4.2)
pub mod keys {
    pub const CONTROL: char = '\u{E009}';
    pub const META: char = '\u{E03D}';
    pub const DELETE: char = '\u{E017}';
}

/// Full-page capture, split out so the reporter can hold it as a trait object.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// PNG bytes of the current viewport/page
    async fn screenshot_png(&self) -> HarnessResult<Vec<u8>>;
}

/// A single browser session positioned on some page.
#[async_trait]
pub trait Page: ScreenCapture {
    type Element: Clone + Send + Sync;

    async fn goto(&self, url: &str) -> HarnessResult<()>;

    async fn current_url(&self) -> HarnessResult<String>;

    /// First element matching `query`, `None` when nothing matches.
    async fn find(&self, query: &Query) -> HarnessResult<Option<Self::Element>>;

    async fn find_all(&self, query: &Query) -> HarnessResult<Vec<Self::Element>>;

    /// Query evaluated relative to `scope`.
    async fn find_within(
        &self,
        scope: &Self::Element,
        query: &Query,
    ) -> HarnessResult<Option<Self::Element>>;

    /// Native (user-like) click.
    async fn click(&self, element: &Self::Element) -> HarnessResult<()>;

    /// Scroll the element to the centre of the viewport and click it from script.
    async fn script_click(&self, element: &Self::Element) -> HarnessResult<()>;

    async fn send_keys(&self, element: &Self::Element, keys: &str) -> HarnessResult<()>;

    /// Visible text of the element
    async fn text(&self, element: &Self::Element) -> HarnessResult<String>;

    /// End the browser session.
    async fn close(&self) -> HarnessResult<()>;
}
