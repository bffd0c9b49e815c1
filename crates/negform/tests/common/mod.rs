//! Scripted in-memory page for integration tests
//!
//! A [`FakePage`] serves [`Layout`]s per URL. Every `goto` loads the next
//! layout queued for that URL (the last one repeats), so a test can script how
//! each form reload looks.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use negform::config::{HarnessConfig, Timings};
use negform::dataset::{default_field_mappings, Record};
use negform::detector::default_patterns;
use negform::locator::{default_strategies, Strategy};
use negform::row::default_submit_queries;
use negform::session::{
    entry_option_xpath, ANY_NEXT_XPATH, ENTRY_RADIO_XPATH, FORM_INPUTS_XPATH,
    LOGIN_BUTTON_CSS, PASSWORD_CSS, USERNAME_CSS,
};
use negform::{HarnessError, HarnessResult, Page, Query, ScreenCapture};

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
pub const LOGIN_URL: &str = "https://test.example/login";
pub const HOME_URL: &str = "https://test.example/home";
pub const LANDING_URL: &str = "https://test.example/lightning/page/home";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Elem(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Goto(String),
    Find(Query),
    FindAll(Query),
    Click(Elem),
    ScriptClick(Elem),
    Keys(Elem, String),
    Screenshot,
    Close,
}

/// What one load of a URL looks like
#[derive(Debug, Clone, Default)]
pub struct Layout {
    nodes: Vec<(Query, Elem)>,
    scoped: Vec<(Elem, Query, Elem)>,
    reveals: Vec<(Elem, Query, Elem)>,
    navigates: Vec<(Elem, String)>,
    delayed: Vec<(Duration, Query, Elem)>,
    failing: HashSet<Query>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, query: Query, elem: Elem) -> Self {
        self.nodes.push((query, elem));
        self
    }

    /// `child` is found by `query` relative to `scope`
    pub fn scoped(mut self, scope: Elem, query: Query, child: Elem) -> Self {
        self.scoped.push((scope, query, child));
        self
    }

    /// Clicking `trigger` (natively or from script) adds `elem` under `query`
    pub fn reveal(mut self, trigger: Elem, query: Query, elem: Elem) -> Self {
        self.reveals.push((trigger, query, elem));
        self
    }

    /// Clicking `trigger` changes the current URL without loading a layout
    pub fn navigate(mut self, trigger: Elem, url: &str) -> Self {
        self.navigates.push((trigger, url.to_string()));
        self
    }

    /// `elem` appears under `query` once `after` has passed since the load
    pub fn delayed(mut self, after: Duration, query: Query, elem: Elem) -> Self {
        self.delayed.push((after, query, elem));
        self
    }

    /// Probes for `query` return a driver error
    pub fn failing(mut self, query: Query) -> Self {
        self.failing.insert(query);
        self
    }
}

#[derive(Default)]
struct State {
    url: String,
    routes: HashMap<String, VecDeque<Layout>>,
    current: Layout,
    loaded_at: Option<Instant>,
    texts: HashMap<Elem, String>,
    fail_click: HashSet<Elem>,
    fail_script_click: HashSet<Elem>,
    rejected_keys: HashSet<String>,
    fail_screenshot: bool,
    panic_on: Option<Query>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a layout for `url`.
    pub fn route(&self, url: &str, layout: Layout) {
        self.state
            .lock()
            .routes
            .entry(url.to_string())
            .or_default()
            .push_back(layout);
    }

    /// Make `layout` the current page without a `goto`.
    pub fn show(&self, layout: Layout) {
        let mut state = self.state.lock();
        state.current = layout;
        state.loaded_at = Some(Instant::now());
    }

    pub fn set_text(&self, elem: Elem, text: &str) {
        self.state.lock().texts.insert(elem, text.to_string());
    }

    pub fn fail_click(&self, elem: Elem) {
        self.state.lock().fail_click.insert(elem);
    }

    pub fn fail_script_click(&self, elem: Elem) {
        self.state.lock().fail_script_click.insert(elem);
    }

    pub fn reject_keys(&self, keys: &str) {
        self.state.lock().rejected_keys.insert(keys.to_string());
    }

    pub fn fail_screenshots(&self) {
        self.state.lock().fail_screenshot = true;
    }

    pub fn panic_on(&self, query: Query) {
        self.state.lock().panic_on = Some(query);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Every string sent to `elem`, in order
    pub fn keys_sent(&self, elem: Elem) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Keys(e, keys) if e == elem => Some(keys),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn lookup(&self, query: &Query) -> HarnessResult<Vec<Elem>> {
        let state = self.state.lock();
        if state.panic_on.as_ref() == Some(query) {
            panic!("scripted panic on {}", query);
        }
        if state.current.failing.contains(query) {
            return Err(HarnessError::Driver(format!("probe failed: {}", query)));
        }

        let elapsed = state
            .loaded_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO);
        let mut found: Vec<Elem> = state
            .current
            .nodes
            .iter()
            .filter(|(q, _)| q == query)
            .map(|(_, e)| *e)
            .collect();
        found.extend(
            state
                .current
                .delayed
                .iter()
                .filter(|(after, q, _)| q == query && elapsed >= *after)
                .map(|(_, _, e)| *e),
        );
        Ok(found)
    }

    fn on_click(&self, elem: Elem) {
        let mut state = self.state.lock();
        let revealed: Vec<(Query, Elem)> = state
            .current
            .reveals
            .iter()
            .filter(|(trigger, _, _)| *trigger == elem)
            .map(|(_, q, e)| (q.clone(), *e))
            .collect();
        state.current.nodes.extend(revealed);

        let target = state
            .current
            .navigates
            .iter()
            .find(|(trigger, _)| *trigger == elem)
            .map(|(_, url)| url.clone());
        if let Some(url) = target {
            state.url = url;
        }
    }
}

#[async_trait]
impl ScreenCapture for FakePage {
    async fn screenshot_png(&self) -> HarnessResult<Vec<u8>> {
        self.record(Call::Screenshot);
        if self.state.lock().fail_screenshot {
            return Err(HarnessError::Driver("screenshot unavailable".into()));
        }
        Ok(PNG_MAGIC.to_vec())
    }
}

#[async_trait]
impl Page for FakePage {
    type Element = Elem;

    async fn goto(&self, url: &str) -> HarnessResult<()> {
        self.record(Call::Goto(url.to_string()));
        let mut state = self.state.lock();
        let queue = state.routes.get_mut(url);
        let layout = match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        let layout =
            layout.ok_or_else(|| HarnessError::Navigation(format!("no route for {}", url)))?;
        state.current = layout;
        state.url = url.to_string();
        state.loaded_at = Some(Instant::now());
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.state.lock().url.clone())
    }

    async fn find(&self, query: &Query) -> HarnessResult<Option<Elem>> {
        self.record(Call::Find(query.clone()));
        Ok(self.lookup(query)?.into_iter().next())
    }

    async fn find_all(&self, query: &Query) -> HarnessResult<Vec<Elem>> {
        self.record(Call::FindAll(query.clone()));
        self.lookup(query)
    }

    async fn find_within(&self, scope: &Elem, query: &Query) -> HarnessResult<Option<Elem>> {
        let state = self.state.lock();
        Ok(state
            .current
            .scoped
            .iter()
            .find(|(s, q, _)| s == scope && q == query)
            .map(|(_, _, child)| *child))
    }

    async fn click(&self, element: &Elem) -> HarnessResult<()> {
        self.record(Call::Click(*element));
        if self.state.lock().fail_click.contains(element) {
            return Err(HarnessError::Driver("element not interactable".into()));
        }
        self.on_click(*element);
        Ok(())
    }

    async fn script_click(&self, element: &Elem) -> HarnessResult<()> {
        self.record(Call::ScriptClick(*element));
        if self.state.lock().fail_script_click.contains(element) {
            return Err(HarnessError::Driver("script click failed".into()));
        }
        self.on_click(*element);
        Ok(())
    }

    async fn send_keys(&self, element: &Elem, keys: &str) -> HarnessResult<()> {
        self.record(Call::Keys(*element, keys.to_string()));
        if self.state.lock().rejected_keys.contains(keys) {
            return Err(HarnessError::Driver(format!("keys rejected: {:?}", keys)));
        }
        Ok(())
    }

    async fn text(&self, element: &Elem) -> HarnessResult<String> {
        Ok(self
            .state
            .lock()
            .texts
            .get(element)
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&self) -> HarnessResult<()> {
        self.record(Call::Close);
        Ok(())
    }
}

/// Query the default locator strategy at `index` renders for `hint`
pub fn field_query(index: usize, hint: &str) -> Query {
    Strategy::new(default_strategies()[index].clone()).render(hint)
}

pub fn submit_query() -> Query {
    Query::xpath(default_submit_queries()[0].clone())
}

pub fn error_pattern(index: usize) -> Query {
    Query::xpath(default_patterns()[index].clone())
}

/// Every wait zero except the polling interval
pub fn immediate_timings() -> Timings {
    Timings {
        login_timeout: 0,
        mfa_probe: 0,
        mfa_wait: 0,
        post_login_settle: 0,
        home_settle: 0,
        form_settle: 0,
        fill_pause: 0,
        submit_settle: 0,
        validation_timeout: 0,
        poll_interval: 250,
    }
}

/// Config pointing at the fake routes, writing under `artifacts`, with no waits
pub fn test_config(artifacts: &std::path::Path) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.target.login_url = LOGIN_URL.to_string();
    config.target.home_url = HOME_URL.to_string();
    config.report.artifacts_dir = artifacts.to_path_buf();
    config.timings = immediate_timings();
    config
}

/// Login page whose button lands on a URL carrying a redirect marker
pub fn login_layout() -> Layout {
    let (user, pass, button) = (Elem(1), Elem(2), Elem(3));
    Layout::new()
        .node(Query::css(USERNAME_CSS), user)
        .node(Query::css(PASSWORD_CSS), pass)
        .node(Query::css(LOGIN_BUTTON_CSS), button)
        .navigate(button, LANDING_URL)
}

/// Home page with the entry option, its radio and a Next button that loads
/// a form with three text inputs
pub fn home_layout(entry_option_text: &str) -> Layout {
    let (option, radio, next) = (Elem(10), Elem(11), Elem(12));
    let inputs = Query::xpath(FORM_INPUTS_XPATH);
    Layout::new()
        .node(Query::xpath(entry_option_xpath(entry_option_text)), option)
        .scoped(option, Query::xpath(ENTRY_RADIO_XPATH), radio)
        .node(Query::xpath(ANY_NEXT_XPATH), next)
        .reveal(next, inputs.clone(), Elem(20))
        .reveal(next, inputs.clone(), Elem(21))
        .reveal(next, inputs, Elem(22))
}

/// Home page where the form also exposes the FirstName input, a submit
/// button, and optionally an error that shows up after submit
pub fn form_layout(entry_option_text: &str, submit: bool, error_after_submit: bool) -> Layout {
    let mut layout = home_layout(entry_option_text)
        .node(field_query(0, "First Name"), Elem(30));
    if submit {
        layout = layout.node(submit_query(), Elem(40));
        if error_after_submit {
            layout = layout.reveal(Elem(40), error_pattern(0), Elem(50));
        }
    }
    layout
}

pub fn record(first_name: &str) -> Record {
    default_field_mappings()
        .iter()
        .map(|m| (m.source.clone(), format!("{}-{}", m.source, first_name)))
        .chain(std::iter::once(("FirstName".to_string(), first_name.to_string())))
        .collect()
}
