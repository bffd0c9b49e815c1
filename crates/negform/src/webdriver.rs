//! WebDriver-backed [`Page`] over a chromedriver session

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::BrowserConfig;
use crate::driver::{Page, Query, ScreenCapture};
use crate::error::HarnessResult;

const SCROLL_AND_CLICK: &str =
    "arguments[0].scrollIntoView({block: 'center'}); arguments[0].click();";

/// One live browser session
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    /// Start a Chrome session against `config.webdriver_url`.
    pub async fn connect(config: &BrowserConfig) -> HarnessResult<Self> {
        let caps = chrome_capabilities(config);
        debug!("Connecting to WebDriver at {}", config.webdriver_url);

        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await?;
        info!("Browser session started");

        Ok(Self { client })
    }

    fn locator(query: &Query) -> Locator<'_> {
        match query {
            Query::XPath(expr) => Locator::XPath(expr),
            Query::Css(selector) => Locator::Css(selector),
        }
    }
}

fn chrome_args(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
    ];

    match config.window_size {
        Some([width, height]) => args.push(format!("--window-size={},{}", width, height)),
        None => args.push("--start-maximized".to_string()),
    }

    if config.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

fn chrome_capabilities(config: &BrowserConfig) -> Map<String, Value> {
    let mut chrome_opts = Map::new();
    chrome_opts.insert("args".to_string(), json!(chrome_args(config)));
    chrome_opts.insert("excludeSwitches".to_string(), json!(["enable-logging"]));

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), Value::Object(chrome_opts));
    caps
}

/// Map a "no such element" miss to `None`, keep every other failure.
fn miss_to_none<T>(result: Result<T, CmdError>) -> HarnessResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_miss() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ScreenCapture for WebDriverPage {
    async fn screenshot_png(&self) -> HarnessResult<Vec<u8>> {
        Ok(self.client.screenshot().await?)
    }
}

#[async_trait]
impl Page for WebDriverPage {
    type Element = Element;

    async fn goto(&self, url: &str) -> HarnessResult<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn find(&self, query: &Query) -> HarnessResult<Option<Element>> {
        miss_to_none(self.client.find(Self::locator(query)).await)
    }

    async fn find_all(&self, query: &Query) -> HarnessResult<Vec<Element>> {
        Ok(miss_to_none(self.client.find_all(Self::locator(query)).await)?.unwrap_or_default())
    }

    async fn find_within(&self, scope: &Element, query: &Query) -> HarnessResult<Option<Element>> {
        miss_to_none(scope.find(Self::locator(query)).await)
    }

    async fn click(&self, element: &Element) -> HarnessResult<()> {
        element.click().await?;
        Ok(())
    }

    async fn script_click(&self, element: &Element) -> HarnessResult<()> {
        let target = serde_json::to_value(element)?;
        self.client.execute(SCROLL_AND_CLICK, vec![target]).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &Element, keys: &str) -> HarnessResult<()> {
        element.send_keys(keys).await?;
        Ok(())
    }

    async fn text(&self, element: &Element) -> HarnessResult<String> {
        Ok(element.text().await?)
    }

    async fn close(&self) -> HarnessResult<()> {
        self.client.clone().close().await?;
        info!("Browser session closed");
        Ok(())
    }
}
