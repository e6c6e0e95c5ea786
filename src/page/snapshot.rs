//! In-memory product page backed by a kuchiki DOM.
//!
//! A snapshot page is parsed from saved HTML and answers every
//! [`ProductPage`] query against that tree. Nothing renders, so interactions
//! are emulated:
//!
//! - `click` runs an optional click handler that may mutate the DOM (this is
//!   how tests script a price re-render after selecting a variant);
//! - `dispatch_lazy_load` does what a lazy loader would and copies `data-src`
//!   into `src`;
//! - `scroll_into_view` has no effect on the tree.
//!
//! Every interaction is appended to a log so callers can check ordering.

use std::cell::RefCell;

use anyhow::{Context, Result, anyhow};
use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;

use super::ProductPage;

/// Click handler: receives the document root and the clicked element
pub type ClickHandler = Box<dyn Fn(&NodeRef, &NodeRef)>;

/// One recorded interaction with the page
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Click(NodeRef),
    ScrollIntoView(NodeRef),
    DispatchLazyLoad(NodeRef),
    /// `read_text` call with the selector it was given
    ReadText(String),
}

pub struct SnapshotPage {
    url: String,
    document: NodeRef,
    on_click: Option<ClickHandler>,
    interactions: RefCell<Vec<Interaction>>,
}

impl SnapshotPage {
    /// Parse `html` as the page found at `url`
    pub fn from_html(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: kuchiki::parse_html().one(html),
            on_click: None,
            interactions: RefCell::new(Vec::new()),
        }
    }

    /// Install a handler run after every recorded click
    #[must_use]
    pub fn with_click_handler(
        mut self,
        handler: impl Fn(&NodeRef, &NodeRef) + 'static,
    ) -> Self {
        self.on_click = Some(Box::new(handler));
        self
    }

    /// Document root, for direct inspection or mutation
    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    /// Interactions in the order they happened
    pub fn interactions(&self) -> Vec<Interaction> {
        self.interactions.borrow().clone()
    }

    /// Elements clicked so far, in order
    pub fn clicks(&self) -> Vec<NodeRef> {
        self.interactions
            .borrow()
            .iter()
            .filter_map(|interaction| match interaction {
                Interaction::Click(node) => Some(node.clone()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children of `node` with a single text node
    pub fn replace_text(node: &NodeRef, text: &str) {
        let children: Vec<NodeRef> = node.children().collect();
        for child in children {
            child.detach();
        }
        node.append(NodeRef::new_text(text));
    }

    /// Set an attribute on an element node; no-op for other node kinds
    pub fn set_attribute(node: &NodeRef, name: &str, value: &str) {
        if let Some(element) = node.as_element() {
            element.attributes.borrow_mut().insert(name, value.to_string());
        }
    }

    fn record(&self, interaction: Interaction) {
        self.interactions.borrow_mut().push(interaction);
    }
}

fn collect_matches<I: NodeIterator>(nodes: I, selector: &str) -> Result<Vec<NodeRef>> {
    let matches = nodes
        .select(selector)
        .map_err(|()| anyhow!("invalid selector: {selector}"))?;
    Ok(matches.map(|element| element.as_node().clone()).collect())
}

impl ProductPage for SnapshotPage {
    type Element = NodeRef;

    async fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .document
            .select_first("title")
            .map(|title| title.as_node().text_contents().trim().to_string())
            .unwrap_or_default())
    }

    async fn select_all(&self, selector: &str) -> Result<Vec<NodeRef>> {
        collect_matches(self.document.descendants(), selector)
    }

    async fn select_in(&self, scope: &NodeRef, selector: &str) -> Result<Vec<NodeRef>> {
        collect_matches(scope.descendants(), selector)
    }

    async fn attribute(&self, element: &NodeRef, name: &str) -> Result<Option<String>> {
        Ok(element
            .as_element()
            .and_then(|data| data.attributes.borrow().get(name).map(str::to_string)))
    }

    async fn attributes(&self, element: &NodeRef) -> Result<Vec<(String, String)>> {
        let Some(data) = element.as_element() else {
            return Ok(Vec::new());
        };
        let attributes = data.attributes.borrow();
        Ok(attributes
            .map
            .iter()
            .map(|(name, attr)| (name.local.to_string(), attr.value.clone()))
            .collect())
    }

    async fn text_content(&self, element: &NodeRef) -> Result<String> {
        Ok(element.text_contents())
    }

    async fn outer_html(&self, element: &NodeRef) -> Result<String> {
        let mut buffer = Vec::new();
        element
            .serialize(&mut buffer)
            .context("Failed to serialize element")?;
        String::from_utf8(buffer).context("Serialized element is not valid UTF-8")
    }

    async fn click(&self, element: &NodeRef) -> Result<()> {
        self.record(Interaction::Click(element.clone()));
        if let Some(handler) = &self.on_click {
            handler(&self.document, element);
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: &NodeRef) -> Result<()> {
        self.record(Interaction::ScrollIntoView(element.clone()));
        Ok(())
    }

    async fn dispatch_lazy_load(&self, element: &NodeRef) -> Result<()> {
        self.record(Interaction::DispatchLazyLoad(element.clone()));
        if let Some(data) = element.as_element() {
            let mut attributes = data.attributes.borrow_mut();
            if let Some(lazy) = attributes.get("data-src").map(str::to_string) {
                attributes.insert("src", lazy);
            }
        }
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>> {
        self.record(Interaction::ReadText(selector.to_string()));
        let matches = collect_matches(self.document.descendants(), selector)?;
        Ok(matches
            .first()
            .map(|node| node.text_contents().trim().to_string()))
    }
}
