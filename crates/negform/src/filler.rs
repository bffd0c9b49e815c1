//! Best-effort clear-and-type into a located input

use std::fmt;
use tracing::{debug, warn};

use crate::driver::{keys, Page};
use crate::error::HarnessResult;

/// Ways to give an input focus, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStrategy {
    DirectClick,
    ScriptClick,
}

impl FocusStrategy {
    pub const ORDER: [FocusStrategy; 2] = [FocusStrategy::DirectClick, FocusStrategy::ScriptClick];

    async fn apply<P: Page>(self, page: &P, element: &P::Element) -> HarnessResult<()> {
        match self {
            FocusStrategy::DirectClick => page.click(element).await,
            FocusStrategy::ScriptClick => page.script_click(element).await,
        }
    }
}

/// Select-all chords, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllStrategy {
    ControlA,
    CommandA,
}

impl SelectAllStrategy {
    pub const ORDER: [SelectAllStrategy; 2] =
        [SelectAllStrategy::ControlA, SelectAllStrategy::CommandA];

    pub fn chord(self) -> String {
        match self {
            SelectAllStrategy::ControlA => format!("{}a", keys::CONTROL),
            SelectAllStrategy::CommandA => format!("{}a", keys::META),
        }
    }
}

/// What happened while filling one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillReport {
    pub focused_by: Option<FocusStrategy>,
    pub selected_by: Option<SelectAllStrategy>,
    pub typed: bool,
}

impl fmt::Display for FillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "focus={:?} select={:?} typed={}",
            self.focused_by, self.selected_by, self.typed
        )
    }
}

/// Run `strategies` in order until one succeeds.
async fn first_success<S, F, Fut>(strategies: &[S], mut attempt: F) -> Option<S>
where
    S: Copy + fmt::Debug,
    F: FnMut(S) -> Fut,
    Fut: std::future::Future<Output = HarnessResult<()>>,
{
    for &strategy in strategies {
        match attempt(strategy).await {
            Ok(()) => return Some(strategy),
            Err(e) => debug!("{:?} failed: {}", strategy, e),
        }
    }
    None
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FieldFiller;

impl FieldFiller {
    pub fn new() -> Self {
        Self
    }

    /// Focus, select existing content, delete it and type `value`.
    ///
    /// Never fails: every stage degrades and the report says how far it got.
    pub async fn fill<P: Page>(&self, page: &P, element: &P::Element, value: &str) -> FillReport {
        let focused_by =
            first_success(&FocusStrategy::ORDER, move |s| s.apply(page, element)).await;
        if focused_by.is_none() {
            warn!("Could not focus input; typing anyway");
        }

        let selected_by = first_success(&SelectAllStrategy::ORDER, move |s| {
            let chord = s.chord();
            async move { page.send_keys(element, &chord).await }
        })
        .await;

        let typed = match self.replace_selection(page, element, value).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Typing into input failed: {}", e);
                false
            }
        };

        FillReport {
            focused_by,
            selected_by,
            typed,
        }
    }

    async fn replace_selection<P: Page>(
        &self,
        page: &P,
        element: &P::Element,
        value: &str,
    ) -> HarnessResult<()> {
        page.send_keys(element, &keys::DELETE.to_string()).await?;
        page.send_keys(element, value).await
    }
}
