//! Page-side request handling
//!
//! The page agent answers [`PageAction`]s against one product page. Image
//! and document downloads are handed to the background agent through the
//! relay; the agent itself only reads the page.

use std::cell::Cell;

use serde_json::json;

use crate::config::CollectConfig;
use crate::error::{CollectError, CollectResult};
use crate::extractor::{
    ParametersDocument, ProductExtractor, ProductRecord, parameters_file_name,
};
use crate::page::ProductPage;
use crate::relay::{BackgroundRequest, Envelope, MessageRelay, PageAction};
use crate::utils::is_product_page;

/// Marks an operation as running for as long as it is alive
struct RunGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a Cell<bool>, operation: &'static str) -> CollectResult<Self> {
        if flag.replace(true) {
            return Err(CollectError::AlreadyRunning(operation));
        }
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

pub struct PageAgent<'p, P: ProductPage> {
    page: &'p P,
    config: CollectConfig,
    relay: MessageRelay,
    extractor: ProductExtractor,
    collecting: Cell<bool>,
    downloading: Cell<bool>,
    /// Detail image count of the last collection, for the parameters document
    detail_count: Cell<Option<usize>>,
}

impl<'p, P: ProductPage> PageAgent<'p, P> {
    #[must_use]
    pub fn new(page: &'p P, config: CollectConfig, relay: MessageRelay) -> Self {
        let extractor = ProductExtractor::new(&config);
        Self {
            page,
            config,
            relay,
            extractor,
            collecting: Cell::new(false),
            downloading: Cell::new(false),
            detail_count: Cell::new(None),
        }
    }

    /// Handle one action; failures are reported inside the envelope
    pub async fn handle(&self, action: PageAction) -> Envelope {
        let result = match action {
            PageAction::CollectData => self.collect_data().await,
            PageAction::GetProductId => self.product_id().await,
            PageAction::GetPageInfo => self.page_info().await,
            PageAction::DownloadMainImages => self.download_main_images().await,
            PageAction::StartDownload => self.download_detail_images().await,
            PageAction::DownloadProductParameters => self.download_parameters().await,
        };
        result.unwrap_or_else(|e| {
            log::error!("{action:?} failed: {e}");
            Envelope::failure(e.to_string())
        })
    }

    /// Run the full extraction and return the record
    pub async fn collect(&self) -> CollectResult<ProductRecord> {
        let _guard = RunGuard::acquire(&self.collecting, "Data collection")?;
        let record = self.extractor.extract(self.page).await;
        self.detail_count.set(Some(record.detail_images.len()));
        Ok(record)
    }

    async fn collect_data(&self) -> CollectResult<Envelope> {
        let record = self.collect().await?;
        let data = serde_json::to_value(&record)
            .map_err(|e| CollectError::Other(format!("Failed to encode product record: {e}")))?;
        Ok(Envelope::ok("Product data collected", Some(data)))
    }

    async fn product_id(&self) -> CollectResult<Envelope> {
        let id = self.extractor.product_id(self.page).await?;
        Ok(Envelope::ok(
            "Product id read",
            Some(json!({ "productId": id })),
        ))
    }

    async fn page_info(&self) -> CollectResult<Envelope> {
        let url = self.page.url().await?;
        let page_type = is_product_page(&url).then_some("product");
        let title = self.page.title().await?;
        Ok(Envelope::ok(
            "Page info read",
            Some(json!({
                "type": page_type,
                "url": url,
                "title": title,
                "isDownloading": self.downloading.get(),
            })),
        ))
    }

    async fn download_main_images(&self) -> CollectResult<Envelope> {
        let _guard = RunGuard::acquire(&self.downloading, "Download")?;
        let images = self.extractor.main_images(self.page).await?;
        self.ship_images(images, true, "main").await
    }

    async fn download_detail_images(&self) -> CollectResult<Envelope> {
        let _guard = RunGuard::acquire(&self.downloading, "Download")?;
        let images = self.extractor.detail_images(self.page).await?;
        self.detail_count.set(Some(images.len()));
        self.ship_images(images, false, "detail").await
    }

    async fn ship_images(
        &self,
        images: Vec<String>,
        is_main: bool,
        kind: &str,
    ) -> CollectResult<Envelope> {
        if images.is_empty() {
            return Err(CollectError::NothingFound(format!("No {kind} images found")));
        }
        let product_id = self.extractor.product_id(self.page).await.unwrap_or_else(|e| {
            log::warn!("Product id unavailable: {e}");
            None
        });
        let count = images.len();
        self.relay
            .request(BackgroundRequest::DownloadImages {
                images,
                is_main,
                product_id,
            })
            .await?;
        Ok(Envelope::ok(
            format!("Started downloading {count} {kind} images"),
            Some(json!({ "count": count })),
        ))
    }

    async fn download_parameters(&self) -> CollectResult<Envelope> {
        let _guard = RunGuard::acquire(&self.downloading, "Download")?;

        let parameter_html = self.extractor.parameter_html(self.page).await?;
        if parameter_html.is_empty() {
            return Err(CollectError::NothingFound(
                "No product parameter block found".to_string(),
            ));
        }

        let document = ParametersDocument {
            product_id: self.extractor.product_id(self.page).await?,
            title: self.extractor.title(self.page).await?,
            parameter_html,
            detail_image_count: self.detail_count.get().unwrap_or(0),
        };

        let content = document.render(self.config.detail_image_cdn());
        let filename = parameters_file_name(document.title.as_deref());
        self.relay
            .request(BackgroundRequest::DownloadFile {
                content,
                filename: filename.clone(),
                mime_type: "text/html".to_string(),
            })
            .await?;
        Ok(Envelope::ok(
            "Product parameters saved as HTML",
            Some(json!({ "filename": filename })),
        ))
    }
}
