//! Product extraction pipeline
//!
//! Stages run strictly in order. A stage that fails is logged and leaves its
//! field at the default, so a page with a broken gallery still yields its
//! parameters and variants.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use super::image_url::{ImageUrlResolver, UrlSet};
use super::lazy_load::{LazyLoadRevealer, RevealOutcome};
use super::parameters::parameter_html;
use super::schema::{ProductRecord, SkuVariant};
use super::sku::SkuVariantWalker;
use crate::config::{CollectConfig, SkuTiming};
use crate::page::ProductPage;
use crate::utils::constants::{
    DETAIL_IMAGE_SELECTOR, IMG_SELECTOR, ITEM_ID_SELECTOR, PARAMETERS_SELECTOR, SCRIPT_SELECTOR,
    SEPARATOR_SENTINEL_URL, THUMBNAILS_SELECTOR, THUMBNAIL_ITEM_SELECTOR, VIDEO_SELECTOR,
    VIDEO_SOURCE_SELECTOR,
};
use crate::utils::{product_id_from_url, sanitize_title};

static SCRIPT_ITEM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""itemId"\s*:\s*"?(\d+)"?"#).expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Idle,
    CollectingVideo,
    CollectingIdTitle,
    CollectingMainImages,
    CollectingDetailImages,
    CollectingParameters,
    CollectingSku,
    Done,
}

impl ExtractionStage {
    fn next(self) -> Self {
        match self {
            Self::Idle => Self::CollectingVideo,
            Self::CollectingVideo => Self::CollectingIdTitle,
            Self::CollectingIdTitle => Self::CollectingMainImages,
            Self::CollectingMainImages => Self::CollectingDetailImages,
            Self::CollectingDetailImages => Self::CollectingParameters,
            Self::CollectingParameters => Self::CollectingSku,
            Self::CollectingSku | Self::Done => Self::Done,
        }
    }
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CollectingVideo => "video",
            Self::CollectingIdTitle => "id and title",
            Self::CollectingMainImages => "main images",
            Self::CollectingDetailImages => "detail images",
            Self::CollectingParameters => "parameters",
            Self::CollectingSku => "SKU variants",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Record plus the stages that fell back to defaults
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: ProductRecord,
    pub failed_stages: Vec<ExtractionStage>,
}

/// Runs the extraction stages against a page
#[derive(Debug, Clone, Copy)]
pub struct ProductExtractor {
    revealer: LazyLoadRevealer,
    detail_pacing: Duration,
    sku_timing: SkuTiming,
}

impl ProductExtractor {
    #[must_use]
    pub fn new(config: &CollectConfig) -> Self {
        Self {
            revealer: LazyLoadRevealer::new(config.reveal()),
            detail_pacing: config.detail_pacing(),
            sku_timing: config.sku(),
        }
    }

    /// Collect a full record; never fails
    pub async fn extract<P: ProductPage>(&self, page: &P) -> ProductRecord {
        self.extract_with_report(page).await.record
    }

    pub async fn extract_with_report<P: ProductPage>(&self, page: &P) -> Extraction {
        let (source_url, resolver) = page_context(page).await;
        let mut record = ProductRecord::empty(source_url.clone());
        let mut failed_stages = Vec::new();
        let mut stage = ExtractionStage::Idle;

        loop {
            stage = stage.next();
            let outcome = match stage {
                ExtractionStage::CollectingVideo => collect_video(page, &resolver)
                    .await
                    .map(|video| record.video_url = video),
                ExtractionStage::CollectingIdTitle => {
                    let id = collect_product_id(page, &source_url)
                        .await
                        .map(|id| record.product_id = id);
                    let title = collect_title(page)
                        .await
                        .map(|title| record.title = title);
                    id.and(title)
                }
                ExtractionStage::CollectingMainImages => collect_main_images(page, &resolver)
                    .await
                    .map(|images| record.main_images = images),
                ExtractionStage::CollectingDetailImages => self
                    .collect_detail_images(page, &resolver)
                    .await
                    .map(|images| record.detail_images = images),
                ExtractionStage::CollectingParameters => collect_parameters(page)
                    .await
                    .map(|html| record.parameter_html = html),
                ExtractionStage::CollectingSku => self
                    .collect_sku(page, &resolver, &record.main_images)
                    .await
                    .map(|variants| record.sku_variants = variants),
                ExtractionStage::Idle | ExtractionStage::Done => break,
            };

            if let Err(e) = outcome {
                log::warn!("Failed to collect {stage}: {e:#}");
                failed_stages.push(stage);
            }
        }

        log::info!(
            "Collected product {}: {} main images, {} detail images, {} variants",
            record.path_id(),
            record.main_images.len(),
            record.detail_images.len(),
            record.sku_variants.len()
        );
        Extraction {
            record,
            failed_stages,
        }
    }

    /// Gallery images only
    pub async fn main_images<P: ProductPage>(&self, page: &P) -> Result<Vec<String>> {
        let (_, resolver) = page_context(page).await;
        collect_main_images(page, &resolver).await
    }

    /// Detail images only, revealing each one first
    pub async fn detail_images<P: ProductPage>(&self, page: &P) -> Result<Vec<String>> {
        let (_, resolver) = page_context(page).await;
        self.collect_detail_images(page, &resolver).await
    }

    /// Rewritten parameter block with its stylesheet, empty when absent
    pub async fn parameter_html<P: ProductPage>(&self, page: &P) -> Result<String> {
        collect_parameters(page).await
    }

    pub async fn product_id<P: ProductPage>(&self, page: &P) -> Result<Option<String>> {
        let (source_url, _) = page_context(page).await;
        collect_product_id(page, &source_url).await
    }

    pub async fn title<P: ProductPage>(&self, page: &P) -> Result<Option<String>> {
        collect_title(page).await
    }

    async fn collect_detail_images<P: ProductPage>(
        &self,
        page: &P,
        resolver: &ImageUrlResolver,
    ) -> Result<Vec<String>> {
        let images = page.select_all(DETAIL_IMAGE_SELECTOR).await?;
        log::debug!("Found {} detail images", images.len());

        let mut urls = UrlSet::new();
        for (index, img) in images.iter().enumerate() {
            if self.revealer.reveal(page, img).await == RevealOutcome::NotRevealed {
                log::debug!("Detail image {} kept its lazy source", index + 1);
            }
            match resolver.resolve(page, img).await {
                Ok(Some(url)) if url != SEPARATOR_SENTINEL_URL => {
                    urls.insert(url);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Detail image {} unreadable: {e:#}", index + 1),
            }
            tokio::time::sleep(self.detail_pacing).await;
        }
        Ok(urls.into_vec())
    }

    async fn collect_sku<P: ProductPage>(
        &self,
        page: &P,
        resolver: &ImageUrlResolver,
        main_images: &[String],
    ) -> Result<Vec<SkuVariant>> {
        SkuVariantWalker::new(resolver, self.sku_timing)
            .walk(page, main_images)
            .await
    }
}

/// Page URL and a resolver anchored on it
async fn page_context<P: ProductPage>(page: &P) -> (String, ImageUrlResolver) {
    let source_url = match page.url().await {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Could not read page URL: {e:#}");
            String::new()
        }
    };
    let resolver = ImageUrlResolver::new(&source_url).unwrap_or_else(|e| {
        log::warn!("{e:#}; resolving relative images against the marketplace");
        ImageUrlResolver::marketplace_default()
    });
    (source_url, resolver)
}

async fn collect_video<P: ProductPage>(
    page: &P,
    resolver: &ImageUrlResolver,
) -> Result<Option<String>> {
    let Some(video) = page.select_first(VIDEO_SELECTOR).await? else {
        return Ok(None);
    };

    let mut source = page
        .attribute(&video, "src")
        .await?
        .filter(|src| !src.trim().is_empty());
    if source.is_none()
        && let Some(nested) = page.select_first_in(&video, VIDEO_SOURCE_SELECTOR).await?
    {
        source = page
            .attribute(&nested, "src")
            .await?
            .filter(|src| !src.trim().is_empty());
    }

    Ok(source
        .and_then(|src| resolver.absolutize(&src))
        .map(|url| {
            let url = url.to_string();
            match url.strip_prefix("http://") {
                Some(rest) => format!("https://{rest}"),
                None => url,
            }
        }))
}

async fn collect_product_id<P: ProductPage>(page: &P, source_url: &str) -> Result<Option<String>> {
    if let Some(id) = product_id_from_url(source_url) {
        return Ok(Some(id));
    }

    if let Some(holder) = page.select_first(ITEM_ID_SELECTOR).await?
        && let Some(id) = page.attribute(&holder, "data-item-id").await?
        && !id.trim().is_empty()
    {
        return Ok(Some(id.trim().to_string()));
    }

    for script in page.select_all(SCRIPT_SELECTOR).await? {
        let text = page.text_content(&script).await?;
        if let Some(captures) = SCRIPT_ITEM_ID.captures(&text) {
            return Ok(Some(captures[1].to_string()));
        }
    }
    Ok(None)
}

async fn collect_title<P: ProductPage>(page: &P) -> Result<Option<String>> {
    let title = sanitize_title(&page.title().await?);
    Ok((!title.is_empty()).then_some(title))
}

async fn collect_main_images<P: ProductPage>(
    page: &P,
    resolver: &ImageUrlResolver,
) -> Result<Vec<String>> {
    let Some(gallery) = page.select_first(THUMBNAILS_SELECTOR).await? else {
        log::warn!("No thumbnail gallery on page");
        return Ok(Vec::new());
    };

    let mut urls = UrlSet::new();
    for (index, item) in page
        .select_in(&gallery, THUMBNAIL_ITEM_SELECTOR)
        .await?
        .iter()
        .enumerate()
    {
        let Some(img) = page.select_first_in(item, IMG_SELECTOR).await? else {
            log::debug!("Thumbnail {} has no image", index + 1);
            continue;
        };
        match resolver.resolve(page, &img).await? {
            Some(url) if url != SEPARATOR_SENTINEL_URL => {
                urls.insert(url);
            }
            _ => log::warn!("Thumbnail {} has no usable source", index + 1),
        }
    }
    Ok(urls.into_vec())
}

async fn collect_parameters<P: ProductPage>(page: &P) -> Result<String> {
    let Some(block) = page.select_first(PARAMETERS_SELECTOR).await? else {
        log::warn!("No parameter block on page");
        return Ok(String::new());
    };
    parameter_html(&page.outer_html(&block).await?)
}
