//! Test utilities and fixtures for the tmall_collect test suite

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use kuchiki::NodeRef;
use tokio::sync::oneshot;
use tokio::time::Instant;

use tmall_collect::config::{CollectConfig, DownloadPolicy};
use tmall_collect::download::{DownloadBackend, TransferHandle, TransferState};
use tmall_collect::error::DownloadError;
use tmall_collect::page::{ProductPage, SnapshotPage};

pub const ITEM_URL: &str = "https://detail.tmall.com/item.htm?id=612345";

/// Wraps a product page document around `body`
#[allow(dead_code)]
pub fn product_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <title>{}</title>
</head>
<body>
    {}
</body>
</html>"#,
        html_escape::encode_text(title),
        body
    )
}

/// Thumbnail gallery with CDN-resized sources
#[allow(dead_code)]
pub const GALLERY: &str = r#"
<ul class="thumbnails--v976to2t">
    <li><img src="//img.alicdn.com/imgextra/a_200x200.jpg_.webp"></li>
    <li><img src="//img.alicdn.com/imgextra/b_q50.jpg_.webp"></li>
    <li><img src="//img.alicdn.com/imgextra/a_60x60.jpg"></li>
    <li><span>no image here</span></li>
</ul>"#;

/// Video whose own `src` is empty and whose nested source is protocol-relative
#[allow(dead_code)]
pub const VIDEO: &str = r#"
<div class="videoWrap--x1">
    <video src=""><source src="//cloud.video.taobao.com/play/x.mp4" type="video/mp4"></video>
</div>"#;

/// Detail images: two lazy ones, a separator and a duplicate
#[allow(dead_code)]
pub const DETAIL_IMAGES: &str = r#"
<div class="desc-root">
    <img class="descV8-singleImage-image lazyload" src="https://g.alicdn.com/s.gif" data-src="//img.alicdn.com/imgextra/d1_790x10000.jpg">
    <img class="descV8-singleImage-image lazyload" src="https://g.alicdn.com/s.gif">
    <img class="descV8-singleImage-image lazyload" src="//img.alicdn.com/imgextra/d2.png">
    <img class="descV8-singleImage-image lazyload" src="//img.alicdn.com/imgextra/d2_q90.png_.webp">
</div>"#;

#[allow(dead_code)]
pub const PARAMETERS: &str = r#"
<div class="baseDropsInfo--x9k">
    <div class="tableWrapper--q1">
        <div class="infoItem--zz">
            <span class="infoItemTitle--a">品牌</span>
            <span class="infoItemContent--b">Acme</span>
        </div>
        <div class="infoItem--zz">
            <span class="infoItemTitle--a">产地</span>
            <span class="infoItemContent--b" data-spm="x">中国</span>
        </div>
    </div>
</div>"#;

/// Button switch (off), two selectable colours and a disabled one
#[allow(dead_code)]
pub const SKU: &str = r#"
<div class="skuWrapper--s">
    <div class="valueItem--smR4pNt4"><span title="按钮开关">按钮开关</span></div>
    <div class="valueItem--smR4pNt4"><img src="//img.alicdn.com/imgextra/red_60x60.jpg"><span title="红色">红色</span></div>
    <div class="valueItem--smR4pNt4 isDisabled--x"><span title="蓝色">蓝色</span></div>
    <div class="valueItem--smR4pNt4"><span title="绿色">绿色</span></div>
</div>
<div class="MiniPrice--1">
    <span class="priceText--2">请先选择</span>
</div>"#;

/// A full product page built from every fixture block
#[allow(dead_code)]
pub fn full_product_html() -> String {
    product_html(
        "Acme 保温杯 500ml-tmall.com天猫",
        &[VIDEO, GALLERY, DETAIL_IMAGES, PARAMETERS, SKU].concat(),
    )
}

/// Click handler that re-renders the price for the clicked colour
#[allow(dead_code)]
pub fn price_on_click(prices: &'static [(&'static str, &'static str)]) -> impl Fn(&NodeRef, &NodeRef) {
    move |document, target| {
        let label = target
            .select_first("span[title]")
            .ok()
            .and_then(|span| span.attributes.borrow().get("title").map(str::to_string));
        let Some(label) = label else { return };
        let Some(&(_, price)) = prices.iter().find(|(name, _)| *name == label) else {
            return;
        };
        if let Ok(node) = document.select_first("span[class*=\"priceText\"]") {
            SnapshotPage::replace_text(node.as_node(), price);
        }
    }
}

/// Config with the production timings and `root` as download root
#[allow(dead_code)]
pub fn test_config(root: &Path) -> CollectConfig {
    CollectConfig::builder()
        .download_root(root)
        .build()
        .expect("valid test config")
}

/// Snapshot page whose queries fail for selectors containing any of the
/// given fragments
#[allow(dead_code)]
pub struct FaultyPage {
    pub inner: SnapshotPage,
    failing: Vec<&'static str>,
}

#[allow(dead_code)]
impl FaultyPage {
    pub fn new(inner: SnapshotPage, failing: Vec<&'static str>) -> Self {
        Self { inner, failing }
    }

    fn check(&self, selector: &str) -> Result<()> {
        match self.failing.iter().find(|fragment| selector.contains(**fragment)) {
            Some(fragment) => Err(anyhow!("injected failure for selector containing {fragment}")),
            None => Ok(()),
        }
    }
}

impl ProductPage for FaultyPage {
    type Element = NodeRef;

    async fn url(&self) -> Result<String> {
        self.inner.url().await
    }

    async fn title(&self) -> Result<String> {
        self.inner.title().await
    }

    async fn select_all(&self, selector: &str) -> Result<Vec<NodeRef>> {
        self.check(selector)?;
        self.inner.select_all(selector).await
    }

    async fn select_in(&self, scope: &NodeRef, selector: &str) -> Result<Vec<NodeRef>> {
        self.check(selector)?;
        self.inner.select_in(scope, selector).await
    }

    async fn attribute(&self, element: &NodeRef, name: &str) -> Result<Option<String>> {
        self.inner.attribute(element, name).await
    }

    async fn attributes(&self, element: &NodeRef) -> Result<Vec<(String, String)>> {
        self.inner.attributes(element).await
    }

    async fn text_content(&self, element: &NodeRef) -> Result<String> {
        self.inner.text_content(element).await
    }

    async fn outer_html(&self, element: &NodeRef) -> Result<String> {
        self.inner.outer_html(element).await
    }

    async fn click(&self, element: &NodeRef) -> Result<()> {
        self.inner.click(element).await
    }

    async fn scroll_into_view(&self, element: &NodeRef) -> Result<()> {
        self.inner.scroll_into_view(element).await
    }

    async fn dispatch_lazy_load(&self, element: &NodeRef) -> Result<()> {
        self.inner.dispatch_lazy_load(element).await
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>> {
        self.check(selector)?;
        self.inner.read_text(selector).await
    }
}

/// What a scripted transfer does
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Finish after the given delay
    Complete(Duration),
    /// Report an interrupted transfer
    Interrupt,
    /// Refuse to start
    Reject,
    /// Refuse the URL as malformed
    Invalid,
    /// Never report a terminal state
    Hang,
    /// Never get as far as a transfer handle
    Stall,
}

/// Download backend that follows a per-URL script and records every start
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    started: Mutex<Vec<(String, Instant)>>,
    // Keeps the senders of hanging transfers alive
    hanging: Mutex<Vec<oneshot::Sender<TransferState>>>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs without a script complete immediately
    pub fn script(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub fn starts(&self) -> Vec<(String, Instant)> {
        self.started.lock().expect("lock").clone()
    }

    pub fn starts_of(&self, url: &str) -> Vec<Instant> {
        self.starts()
            .into_iter()
            .filter(|(started, _)| started == url)
            .map(|(_, at)| at)
            .collect()
    }
}

impl DownloadBackend for ScriptedBackend {
    fn start(
        &self,
        url: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<TransferHandle, DownloadError>> + Send {
        self.started
            .lock()
            .expect("lock")
            .push((url.to_string(), Instant::now()));
        let script = self
            .scripts
            .get(url)
            .copied()
            .unwrap_or(Script::Complete(Duration::ZERO));
        let path: PathBuf = destination.to_path_buf();
        let stall = matches!(script, Script::Stall);

        let handle = match script {
            Script::Reject | Script::Stall => Err(DownloadError::Status(503)),
            Script::Invalid => Err(DownloadError::InvalidUrl(url.to_string())),
            Script::Complete(delay) => {
                let (handle, done) = TransferHandle::channel(path);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = done.send(TransferState::Complete);
                });
                Ok(handle)
            }
            Script::Interrupt => {
                let (handle, done) = TransferHandle::channel(path);
                let _ = done.send(TransferState::Interrupted);
                Ok(handle)
            }
            Script::Hang => {
                let (handle, done) = TransferHandle::channel(path);
                self.hanging.lock().expect("lock").push(done);
                Ok(handle)
            }
        };
        async move {
            if stall {
                std::future::pending::<()>().await;
            }
            handle
        }
    }
}

/// Default download policy with batches of `concurrency_limit`
#[allow(dead_code)]
pub fn policy(concurrency_limit: usize) -> DownloadPolicy {
    DownloadPolicy {
        concurrency_limit,
        ..DownloadPolicy::default()
    }
}
