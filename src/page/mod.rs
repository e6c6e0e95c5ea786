//! Page drivers.
//!
//! Everything the extractor knows about a product page goes through the
//! [`ProductPage`] trait: CSS queries, attribute and text reads, and the few
//! interactions the collector needs (click, scroll into view, lazy-load
//! nudges). Two drivers exist:
//!
//! - [`ChromiumPage`]: a live tab in Chromium, driven over CDP by injecting
//!   small scripts (see [`js_scripts`]).
//! - [`SnapshotPage`]: an in-memory DOM parsed from saved HTML. Clicks can be
//!   scripted and every interaction is recorded, which makes it the fake DOM
//!   used throughout the test suite.
//!
//! Futures returned by drivers are not required to be `Send`: extraction runs
//! on a single task, the same way a content script runs on the page thread.

pub mod chromium;
pub mod js_scripts;
pub mod page_timeout;
pub mod snapshot;

pub use chromium::{ChromiumPage, ElementHandle};
pub use page_timeout::with_page_timeout;
pub use snapshot::{Interaction, SnapshotPage};

use anyhow::Result;

/// Read/interaction surface of a product page.
#[allow(async_fn_in_trait)]
pub trait ProductPage {
    /// Opaque reference to one element of the page
    type Element: Clone;

    /// Current page URL
    async fn url(&self) -> Result<String>;

    /// `document.title`
    async fn title(&self) -> Result<String>;

    /// All elements matching `selector`, in document order
    async fn select_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Descendants of `scope` matching `selector`, in document order
    async fn select_in(&self, scope: &Self::Element, selector: &str) -> Result<Vec<Self::Element>>;

    /// Value of an attribute as written in the markup
    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    /// Every attribute of the element as `(name, value)` pairs
    async fn attributes(&self, element: &Self::Element) -> Result<Vec<(String, String)>>;

    /// Concatenated text of the element and its descendants
    async fn text_content(&self, element: &Self::Element) -> Result<String>;

    /// Serialized markup of the element itself, children included
    async fn outer_html(&self, element: &Self::Element) -> Result<String>;

    /// Trigger the page's own click handling on the element
    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Scroll the element to the vertical centre of the viewport
    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    /// Fire the scroll/resize/load/intersection signals lazy loaders listen to
    async fn dispatch_lazy_load(&self, element: &Self::Element) -> Result<()>;

    /// Source the element currently renders.
    ///
    /// Browsers expose a resolved `src` property that can differ from the
    /// attribute; drivers without a renderer fall back to the attribute.
    async fn rendered_src(&self, element: &Self::Element) -> Result<Option<String>> {
        self.attribute(element, "src").await
    }

    async fn select_first(&self, selector: &str) -> Result<Option<Self::Element>> {
        Ok(self.select_all(selector).await?.into_iter().next())
    }

    async fn select_first_in(
        &self,
        scope: &Self::Element,
        selector: &str,
    ) -> Result<Option<Self::Element>> {
        Ok(self.select_in(scope, selector).await?.into_iter().next())
    }

    /// Trimmed text of the first element matching `selector`
    async fn read_text(&self, selector: &str) -> Result<Option<String>> {
        match self.select_first(selector).await? {
            Some(element) => Ok(Some(self.text_content(&element).await?.trim().to_string())),
            None => Ok(None),
        }
    }
}

/// Whether the element's class attribute contains `fragment`.
///
/// Product pages use hashed CSS-module names (`valueItem--3xYz`), so markers
/// are matched as substrings of the whole class attribute.
pub async fn has_class_fragment<P: ProductPage>(
    page: &P,
    element: &P::Element,
    fragment: &str,
) -> Result<bool> {
    Ok(page
        .attribute(element, "class")
        .await?
        .is_some_and(|class| class.contains(fragment)))
}
