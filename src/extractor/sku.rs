//! SKU variant walk
//!
//! Prices only render for the selected variant, so every selectable variant
//! is clicked in turn and the price read back after the page settles. Some
//! listings carry a binary "button switch" option that must be on before any
//! other variant shows a price; it is switched on first and never recorded.

use anyhow::Result;

use super::image_url::ImageUrlResolver;
use super::schema::SkuVariant;
use crate::config::SkuTiming;
use crate::page::{ProductPage, has_class_fragment};
use crate::utils::constants::{
    DISABLED_CLASS_MARKER, IMG_SELECTOR, PRICE_SELECTOR, SELECTED_CLASS_MARKER,
    TOGGLE_SWITCH_LABEL, VARIANT_LABEL_SELECTOR, VARIANT_SELECTOR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    NotStarted,
    ToggleChecked,
    /// Visiting the variant at this index of the selector list
    WalkingVariant(usize),
    Done,
}

pub struct SkuVariantWalker<'a> {
    resolver: &'a ImageUrlResolver,
    timing: SkuTiming,
    state: WalkState,
}

impl<'a> SkuVariantWalker<'a> {
    #[must_use]
    pub fn new(resolver: &'a ImageUrlResolver, timing: SkuTiming) -> Self {
        Self {
            resolver,
            timing,
            state: WalkState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Walk every variant selector and record the selectable ones.
    ///
    /// `main_images` supplies the image of variants that have none of their
    /// own. Failing to list the selectors is an error; anything that goes
    /// wrong on a single variant only skips that variant.
    pub async fn walk<P: ProductPage>(
        &mut self,
        page: &P,
        main_images: &[String],
    ) -> Result<Vec<SkuVariant>> {
        let selectors = page.select_all(VARIANT_SELECTOR).await?;
        log::debug!("Found {} variant selectors", selectors.len());

        self.switch_toggle_on(page, &selectors).await;
        self.state = WalkState::ToggleChecked;

        let mut variants = Vec::new();
        for (index, selector) in selectors.iter().enumerate() {
            self.state = WalkState::WalkingVariant(index);
            match self.visit(page, selector, main_images).await {
                Ok(Some(variant)) => variants.push(variant),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping variant {}: {e:#}", index + 1),
            }
        }

        self.state = WalkState::Done;
        log::info!("Collected {} SKU variants", variants.len());
        Ok(variants)
    }

    async fn switch_toggle_on<P: ProductPage>(&self, page: &P, selectors: &[P::Element]) {
        for selector in selectors {
            let is_toggle = matches!(
                label_of(page, selector).await,
                Ok(Some(label)) if label == TOGGLE_SWITCH_LABEL
            );
            if !is_toggle {
                continue;
            }
            match has_class_fragment(page, selector, SELECTED_CLASS_MARKER).await {
                Ok(true) => log::debug!("Button switch already on"),
                Ok(false) => {
                    log::debug!("Switching button switch on");
                    if let Err(e) = page.click(selector).await {
                        log::warn!("Failed to switch button switch on: {e:#}");
                    }
                }
                Err(e) => log::warn!("Could not read button switch state: {e:#}"),
            }
        }
    }

    async fn visit<P: ProductPage>(
        &self,
        page: &P,
        selector: &P::Element,
        main_images: &[String],
    ) -> Result<Option<SkuVariant>> {
        if has_class_fragment(page, selector, DISABLED_CLASS_MARKER).await? {
            log::debug!("Variant is disabled");
            return Ok(None);
        }

        let Some(label) = label_of(page, selector).await?.filter(|l| !l.is_empty()) else {
            log::warn!("Variant has no label");
            return Ok(None);
        };
        if label == TOGGLE_SWITCH_LABEL {
            return Ok(None);
        }

        let image_url = match page.select_first_in(selector, IMG_SELECTOR).await? {
            Some(img) => self.resolver.resolve(page, &img).await?,
            None => main_images.first().cloned(),
        };

        page.click(selector).await?;
        tokio::time::sleep(self.timing.settle).await;

        let price = page
            .read_text(PRICE_SELECTOR)
            .await?
            .filter(|price| !price.is_empty());
        log::debug!("Variant {label}: price {price:?}");

        let variant = SkuVariant::new(label, image_url, price);
        tokio::time::sleep(self.timing.throttle).await;
        Ok(Some(variant))
    }
}

async fn label_of<P: ProductPage>(page: &P, selector: &P::Element) -> Result<Option<String>> {
    match page.select_first_in(selector, VARIANT_LABEL_SELECTOR).await? {
        Some(span) => page.attribute(&span, "title").await,
        None => Ok(None),
    }
}
