//! Login and navigation to the form under test

use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{FormConfig, TargetConfig, Timings};
use crate::driver::{Page, Query};
use crate::error::{HarnessError, HarnessResult};
use crate::filler::FieldFiller;
use crate::locator::xpath_literal;
use crate::reporter::Reporter;
use crate::wait::poll_until;

const REDIRECT_POLL: Duration = Duration::from_millis(500);

pub const USERNAME_CSS: &str = "#username";
pub const PASSWORD_CSS: &str = "#password";
pub const LOGIN_BUTTON_CSS: &str = "#Login";
pub const MFA_XPATH: &str = "//*[contains(., 'Verify Your Identity')]";
/// Radio input sharing the nearest ancestor with an entry option, relative to it
pub const ENTRY_RADIO_XPATH: &str =
    ".//ancestor::*[.//input[@type='radio']][1]//input[@type='radio']";
pub const BRANDED_NEXT_XPATH: &str =
    "//button[contains(@class,'slds-button_brand')][contains(.,'Next')]";
pub const ANY_NEXT_XPATH: &str = "//button[contains(.,'Next')]";
pub const FORM_INPUTS_XPATH: &str = "//input[@type='text' or @type='email' or @type='tel']";

/// Elements whose text contains the entry option label
pub fn entry_option_xpath(text: &str) -> String {
    format!("//*[contains(., {})]", xpath_literal(text))
}

pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Drives the target application up to a fresh copy of the form
pub struct FormNavigator {
    target: TargetConfig,
    form: FormConfig,
    timings: Timings,
}

impl FormNavigator {
    pub fn new(target: TargetConfig, form: FormConfig, timings: Timings) -> Self {
        Self {
            target,
            form,
            timings,
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Sign in; `false` after recording `Login_Failed`.
    pub async fn login<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
        credentials: &Credentials,
    ) -> bool {
        match self.try_login(page, reporter, credentials).await {
            Ok(()) => true,
            Err(e) => {
                let detail = e.to_string();
                reporter
                    .error("Login_Failed", "Could not login", Some(detail.as_str()))
                    .await;
                false
            }
        }
    }

    async fn try_login<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
        credentials: &Credentials,
    ) -> HarnessResult<()> {
        let login_timeout = Self::ms(self.timings.login_timeout);

        page.goto(&self.target.login_url).await?;
        reporter.info("Open_Login", self.target.login_url.as_str()).await;

        let username_field = Query::css(USERNAME_CSS);
        let username_query = &username_field;
        let username = poll_until(login_timeout, REDIRECT_POLL, move || {
            page.find(username_query)
        })
        .await?
        .ok_or_else(|| HarnessError::Timeout("login form".into()))?;
        let password = require(page, Query::css(PASSWORD_CSS)).await?;
        let submit = require(page, Query::css(LOGIN_BUTTON_CSS)).await?;

        type_into(page, &username, &credentials.username, "username").await?;
        type_into(page, &password, &credentials.password, "password").await?;
        reporter
            .info("Credentials_Entered", credentials.username.as_str())
            .await;

        page.click(&submit).await?;
        reporter.info("Click_Login", "Clicked").await;

        let mfa_banner = Query::xpath(MFA_XPATH);
        let mfa_query = &mfa_banner;
        let mfa = poll_until(Self::ms(self.timings.mfa_probe), REDIRECT_POLL, move || {
            page.find(mfa_query)
        })
        .await?;
        if mfa.is_some() {
            reporter
                .info(
                    "MFA",
                    format!(
                        "Waiting for manual verification ({}s)",
                        self.timings.mfa_wait / 1000
                    ),
                )
                .await;
            sleep(Self::ms(self.timings.mfa_wait)).await;
        }

        let url = poll_until(login_timeout, REDIRECT_POLL, move || async move {
            let url = page.current_url().await?;
            let redirected = self
                .target
                .redirect_markers
                .iter()
                .any(|marker| url.contains(marker.as_str()));
            Ok::<_, HarnessError>(redirected.then_some(url))
        })
        .await?
        .ok_or_else(|| HarnessError::Timeout("post-login redirect".into()))?;

        sleep(Self::ms(self.timings.post_login_settle)).await;
        reporter.info("Login_Success", url).await;
        Ok(())
    }

    /// Navigate from home to a freshly loaded form; `false` after recording why not.
    pub async fn open_form<P: Page>(&self, page: &P, reporter: &mut Reporter) -> bool {
        match self.try_open_form(page, reporter).await {
            Ok(loaded) => loaded,
            Err(e) => {
                let detail = e.to_string();
                reporter
                    .error(
                        "Open_Form_Failed",
                        "Exception opening form",
                        Some(detail.as_str()),
                    )
                    .await;
                false
            }
        }
    }

    async fn try_open_form<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
    ) -> HarnessResult<bool> {
        page.goto(&self.target.home_url).await?;
        reporter.info("Open_Home", self.target.home_url.as_str()).await;
        sleep(Self::ms(self.timings.home_settle)).await;

        if !self.choose_entry_option(page).await? {
            reporter
                .error(
                    "Domestic_Radio_NotFound",
                    format!("Could not click radio for '{}'", self.form.entry_option_text),
                    None,
                )
                .await;
            return Ok(false);
        }
        reporter.info("Choose_Domestic", "Selected radio").await;

        let next = match self.find_next(page).await? {
            Some(button) => button,
            None => {
                reporter
                    .error("Next_NotFound", "No Next button found", None)
                    .await;
                return Ok(false);
            }
        };
        page.script_click(&next).await?;
        reporter.info("Click_Next", "Navigating to form…").await;
        sleep(Self::ms(self.timings.form_settle)).await;

        let inputs = page
            .find_all(&Query::xpath(FORM_INPUTS_XPATH))
            .await?;
        if inputs.len() < self.form.min_inputs {
            reporter
                .error(
                    "Form_NotLoaded",
                    format!("Too few inputs ({})", inputs.len()),
                    None,
                )
                .await;
            return Ok(false);
        }

        reporter
            .info("Form_Loaded", format!("Inputs: {}", inputs.len()))
            .await;
        Ok(true)
    }

    /// Select the radio input that belongs to the entry option's text.
    async fn choose_entry_option<P: Page>(&self, page: &P) -> HarnessResult<bool> {
        let option = Query::xpath(entry_option_xpath(&self.form.entry_option_text));
        let radio = Query::xpath(ENTRY_RADIO_XPATH);

        for candidate in page.find_all(&option).await? {
            let found = match page.find_within(&candidate, &radio).await {
                Ok(found) => found,
                Err(e) => {
                    debug!("Radio lookup failed: {}", e);
                    continue;
                }
            };
            if let Some(input) = found {
                if page.script_click(&input).await.is_ok() {
                    info!("Selected '{}'", self.form.entry_option_text);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn find_next<P: Page>(&self, page: &P) -> HarnessResult<Option<P::Element>> {
        if let Some(button) = page.find(&Query::xpath(BRANDED_NEXT_XPATH)).await? {
            return Ok(Some(button));
        }
        Ok(page
            .find_all(&Query::xpath(ANY_NEXT_XPATH))
            .await?
            .into_iter()
            .next())
    }
}

/// Replace whatever the input holds with `value`.
async fn type_into<P: Page>(
    page: &P,
    input: &P::Element,
    value: &str,
    what: &str,
) -> HarnessResult<()> {
    if FieldFiller::new().fill(page, input, value).await.typed {
        Ok(())
    } else {
        Err(HarnessError::Driver(format!("could not type {}", what)))
    }
}

async fn require<P: Page>(page: &P, query: Query) -> HarnessResult<P::Element> {
    page.find(&query)
        .await?
        .ok_or_else(|| HarnessError::Navigation(format!("{} not present", query)))
}
