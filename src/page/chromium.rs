//! Live product page driven over CDP.
//!
//! All DOM work is done by evaluating the scripts in [`super::js_scripts`];
//! elements are addressed by the handle stamped on them when they were
//! selected.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chromiumoxide::{Browser, Page};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::js_scripts;
use super::page_timeout::with_page_timeout;
use super::ProductPage;
use crate::browser_setup::apply_stealth_measures;
use crate::extractor::poll::poll_until;

/// Handle of an element stamped by a previous query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Deserialize)]
struct JsReply<T> {
    #[serde(default)]
    missing: bool,
    v: Option<T>,
}

pub struct ChromiumPage {
    page: Page,
    timeout_secs: u64,
}

impl ChromiumPage {
    /// Open `url` in a new tab with stealth measures applied, then wait for
    /// the document to finish loading.
    pub async fn open(browser: &Browser, url: &str, timeout_secs: u64) -> Result<Self> {
        let page = with_page_timeout(
            async {
                browser
                    .new_page("about:blank")
                    .await
                    .context("Failed to create page")
            },
            timeout_secs,
            "create page",
        )
        .await?;

        if let Err(e) = apply_stealth_measures(&page).await {
            log::warn!("Stealth measures failed, continuing without them: {e}");
        }

        with_page_timeout(
            async {
                page.goto(url)
                    .await
                    .with_context(|| format!("Failed to navigate to {url}"))?;
                page.wait_for_navigation()
                    .await
                    .context("Navigation did not complete")?;
                Ok(())
            },
            timeout_secs,
            "open product page",
        )
        .await?;

        let driver = Self { page, timeout_secs };
        driver.wait_until_ready().await;
        Ok(driver)
    }

    /// Wrap a page that is already on the product
    #[must_use]
    pub fn from_page(page: Page, timeout_secs: u64) -> Self {
        Self { page, timeout_secs }
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Poll `document.readyState` until complete; proceed anyway on timeout
    async fn wait_until_ready(&self) {
        let max_wait = Duration::from_secs(self.timeout_secs);
        let ready = poll_until(
            || async {
                match self.eval::<bool>(js_scripts::READY_STATE_SCRIPT.to_string(), "ready state").await {
                    Ok(Some(true)) => Some(()),
                    _ => None,
                }
            },
            Duration::from_millis(100),
            u32::MAX,
            max_wait,
        )
        .await;

        if let Err(e) = ready {
            log::warn!("Page not ready ({e}), proceeding anyway");
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String, what: &str) -> Result<Option<T>> {
        let reply: JsReply<T> = with_page_timeout(
            async {
                self.page
                    .evaluate(script)
                    .await
                    .with_context(|| format!("Failed to evaluate {what}"))?
                    .into_value()
                    .with_context(|| format!("Unexpected result shape for {what}"))
            },
            self.timeout_secs,
            what,
        )
        .await?;

        if reply.missing {
            bail!("element left the document before {what}");
        }
        Ok(reply.v)
    }

    async fn eval_value<T: DeserializeOwned>(&self, script: String, what: &str) -> Result<T> {
        self.eval(script, what)
            .await?
            .ok_or_else(|| anyhow!("{what} returned no value"))
    }

    async fn handles(&self, scope: Option<ElementHandle>, selector: &str) -> Result<Vec<ElementHandle>> {
        let ids: Vec<u64> = self
            .eval_value(
                js_scripts::select_all(scope.map(ElementHandle::id), selector),
                &format!("query `{selector}`"),
            )
            .await?;
        Ok(ids.into_iter().map(ElementHandle).collect())
    }
}

impl ProductPage for ChromiumPage {
    type Element = ElementHandle;

    async fn url(&self) -> Result<String> {
        self.eval_value(js_scripts::URL_SCRIPT.to_string(), "location").await
    }

    async fn title(&self) -> Result<String> {
        self.eval_value(js_scripts::TITLE_SCRIPT.to_string(), "document.title").await
    }

    async fn select_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        self.handles(None, selector).await
    }

    async fn select_in(&self, scope: &ElementHandle, selector: &str) -> Result<Vec<ElementHandle>> {
        self.handles(Some(*scope), selector).await
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.eval(js_scripts::attribute(element.0, name), "getAttribute").await
    }

    async fn attributes(&self, element: &ElementHandle) -> Result<Vec<(String, String)>> {
        self.eval_value(js_scripts::attributes(element.0), "attribute list").await
    }

    async fn rendered_src(&self, element: &ElementHandle) -> Result<Option<String>> {
        self.eval(js_scripts::rendered_src(element.0), "src").await
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<String> {
        self.eval_value(js_scripts::text_content(element.0), "textContent").await
    }

    async fn outer_html(&self, element: &ElementHandle) -> Result<String> {
        self.eval_value(js_scripts::outer_html(element.0), "outerHTML").await
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.eval::<bool>(js_scripts::click(element.0), "click").await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.eval::<bool>(js_scripts::scroll_into_view(element.0), "scrollIntoView")
            .await?;
        Ok(())
    }

    async fn dispatch_lazy_load(&self, element: &ElementHandle) -> Result<()> {
        self.eval::<bool>(js_scripts::dispatch_lazy_load(element.0), "lazy-load events")
            .await?;
        Ok(())
    }
}
