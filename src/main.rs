// Command line front end: collect a live product page, extract from a saved
// page, or re-run the image download for a stored record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use tmall_collect::config::CollectConfig;
use tmall_collect::download::{DownloadJob, write_generated_file};
use tmall_collect::relay::{BackgroundRequest, DEFAULT_RELAY_CAPACITY};
use tmall_collect::utils::constants::DEFAULT_DOWNLOAD_ROOT;
use tmall_collect::utils::is_valid_url;
use tmall_collect::{
    BackgroundAgent, ChromiumPage, DownloadOrchestrator, HttpDownloader, MessageRelay, Outbound,
    PageAction, PageAgent, ProductExtractor, ProductRecord, SnapshotPage, launch_browser,
};

const SNAPSHOT_DEFAULT_URL: &str = "https://detail.tmall.com/item.htm";

#[derive(Parser, Debug)]
#[command(
    name = "tmall-collect",
    version,
    about = "Collect Tmall product data and download its images"
)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalOptions {
    /// Root directory for records, images and generated documents
    #[arg(long, env = "TMALL_DOWNLOAD_ROOT", default_value = DEFAULT_DOWNLOAD_ROOT, global = true)]
    download_root: PathBuf,

    /// Show the browser window (for logging in or solving a captcha)
    #[arg(long, global = true)]
    headed: bool,

    /// Chrome profile directory to reuse between runs
    #[arg(long, env = "TMALL_CHROME_DATA_DIR", global = true)]
    chrome_data_dir: Option<PathBuf>,

    /// Seconds allowed for opening the product page
    #[arg(long, default_value_t = 30, global = true)]
    page_timeout: u64,

    /// Downloads in flight per batch
    #[arg(long, default_value_t = 2, global = true)]
    concurrency: usize,

    /// Attempts per image URL
    #[arg(long, default_value_t = 3, global = true)]
    max_attempts: u32,

    /// Base URL detail images are re-hosted under, for the parameters document
    #[arg(long, env = "TMALL_DETAIL_IMAGE_CDN", global = true)]
    detail_image_cdn: Option<String>,
}

impl GlobalOptions {
    fn to_config(&self) -> Result<CollectConfig> {
        let mut builder = CollectConfig::builder()
            .download_root(&self.download_root)
            .headless(!self.headed)
            .page_load_timeout_secs(self.page_timeout)
            .concurrency_limit(self.concurrency)
            .max_attempts(self.max_attempts);
        if let Some(dir) = &self.chrome_data_dir {
            builder = builder.chrome_data_dir(dir);
        }
        if let Some(cdn) = &self.detail_image_cdn {
            builder = builder.detail_image_cdn(cdn);
        }
        builder.build()
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a product page, extract it and download everything
    Collect {
        /// Product page URL
        url: String,

        /// Only write the product record
        #[arg(long)]
        skip_downloads: bool,
    },
    /// Extract a record from a saved product page
    Snapshot {
        /// Saved HTML of a product page
        html: PathBuf,

        /// URL the page was saved from
        #[arg(long, default_value = SNAPSHOT_DEFAULT_URL)]
        url: String,

        /// Write the record here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download the images listed in a stored product record
    Download {
        /// Product record JSON written by `collect` or `snapshot`
        record: PathBuf,

        /// Skip the detail images
        #[arg(long)]
        main_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = cli.options.to_config()?;

    match cli.command {
        Command::Collect {
            url,
            skip_downloads,
        } => collect(&config, &url, skip_downloads).await,
        Command::Snapshot { html, url, output } => {
            snapshot(&config, &html, &url, output.as_deref()).await
        }
        Command::Download { record, main_only } => download(&config, &record, main_only).await,
    }
}

async fn collect(config: &CollectConfig, url: &str, skip_downloads: bool) -> Result<()> {
    if !is_valid_url(url) {
        bail!("Not a product page URL: {url}");
    }
    let session = launch_browser(config.headless(), config.chrome_data_dir().cloned()).await?;
    let result = collect_with_browser(config, &session.browser, url, skip_downloads).await;
    if let Err(e) = session.close().await {
        tracing::warn!("{e:#}");
    }
    result
}

async fn collect_with_browser(
    config: &CollectConfig,
    browser: &chromiumoxide::Browser,
    url: &str,
    skip_downloads: bool,
) -> Result<()> {
    let page = ChromiumPage::open(browser, url, config.page_load_timeout_secs()).await?;

    let (relay, requests) = MessageRelay::new(DEFAULT_RELAY_CAPACITY);
    let background = BackgroundAgent::new(HttpDownloader::new()?, config, &relay);
    let reporter = tokio::spawn(report_events(relay.subscribe()));
    let worker = tokio::spawn(background.run(requests));

    let agent = PageAgent::new(&page, config.clone(), relay.clone());
    let record = agent.collect().await?;
    let saved = save_record(config.download_root(), &record).await?;
    tracing::info!("Product record written to {}", saved.display());

    if !skip_downloads {
        for (images, is_main) in [
            (record.main_images.clone(), true),
            (record.detail_images.clone(), false),
        ] {
            if images.is_empty() {
                continue;
            }
            relay
                .request(BackgroundRequest::DownloadImages {
                    images,
                    is_main,
                    product_id: record.product_id.clone(),
                })
                .await?;
        }

        let envelope = agent.handle(PageAction::DownloadProductParameters).await;
        match envelope.error {
            Some(error) => tracing::warn!("Parameters document skipped: {error}"),
            None => tracing::info!("{}", envelope.message.unwrap_or_default()),
        }
    }

    drop(agent);
    drop(relay);
    worker.await.context("Background agent failed")?;
    reporter.await.context("Progress reporter failed")?;
    Ok(())
}

async fn snapshot(
    config: &CollectConfig,
    html: &Path,
    url: &str,
    output: Option<&Path>,
) -> Result<()> {
    let markup = tokio::fs::read_to_string(html)
        .await
        .with_context(|| format!("Failed to read {}", html.display()))?;
    let page = SnapshotPage::from_html(url, &markup);

    let extraction = ProductExtractor::new(config)
        .extract_with_report(&page)
        .await;
    for stage in &extraction.failed_stages {
        tracing::warn!("Stage '{stage}' failed, its fields are left empty");
    }

    let json = serde_json::to_string_pretty(&extraction.record)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Product record written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn download(config: &CollectConfig, record_path: &Path, main_only: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(record_path)
        .await
        .with_context(|| format!("Failed to read {}", record_path.display()))?;
    let record: ProductRecord = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a product record", record_path.display()))?;

    let orchestrator = DownloadOrchestrator::new(HttpDownloader::new()?, config);
    let limit = config.download().concurrency_limit;
    let mut jobs = vec![DownloadJob::new(
        record.main_images,
        true,
        record.product_id.clone(),
        limit,
    )];
    if !main_only {
        jobs.push(DownloadJob::new(
            record.detail_images,
            false,
            record.product_id,
            limit,
        ));
    }

    for job in jobs.iter().filter(|job| !job.urls.is_empty()) {
        let report = orchestrator
            .run(job, |progress| tracing::info!("Download progress: {progress:.0}%"))
            .await;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn save_record(root: &Path, record: &ProductRecord) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(record)?;
    write_generated_file(
        root,
        &format!("{}/product.json", record.path_id()),
        json.as_bytes(),
    )
    .await
}

async fn report_events(mut events: broadcast::Receiver<Outbound>) {
    loop {
        match events.recv().await {
            Ok(Outbound::DownloadProgress { progress }) => {
                tracing::info!("Download progress: {progress:.0}%");
            }
            Ok(Outbound::DownloadError { error }) => tracing::warn!("{error}"),
            Ok(Outbound::DownloadFinished { report }) => tracing::info!(
                "Download finished: {} of {} saved",
                report.succeeded,
                report.total
            ),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Progress reporter skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
