//! Chromium discovery, launch and per-page stealth setup.

use anyhow::{Context, Result, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

use crate::utils::constants::CHROME_USER_AGENT;

/// A running browser and the task pumping its CDP connection
pub struct BrowserSession {
    pub browser: Browser,
    handler: JoinHandle<()>,
    pub user_data_dir: PathBuf,
    /// Profile directory was created for this run and is removed on close
    temp_profile: bool,
}

impl BrowserSession {
    /// Close the browser, wait for the process to exit, then drop a
    /// per-run profile directory.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.context("Failed to close browser")?;
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {e}");
        }
        self.handler.abort();

        // Only after wait(): Chrome holds file locks until it exits
        if std::mem::take(&mut self.temp_profile) {
            info!("Removing temp profile {}", self.user_data_dir.display());
            if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
                warn!(
                    "Failed to remove temp profile {}: {e}",
                    self.user_data_dir.display()
                );
            }
        }
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|var| std::env::var_os(var).map(PathBuf::from))
            .collect();
        roots.push(PathBuf::from(r"C:\Program Files"));
        roots
            .into_iter()
            .flat_map(|root| {
                [
                    root.join(r"Google\Chrome\Application\chrome.exe"),
                    root.join(r"Chromium\Application\chrome.exe"),
                ]
            })
            .collect()
    } else if cfg!(target_os = "macos") {
        let mut paths: Vec<PathBuf> = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
        }
        paths
    } else {
        [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

/// Find a Chrome/Chromium executable.
///
/// `CHROMIUM_PATH` overrides everything; then well-known install locations
/// are checked, then `which` on Unix.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("CHROMIUM_PATH").map(PathBuf::from) {
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!("CHROMIUM_PATH points to a missing file: {}", path.display());
    }

    if let Some(path) = candidate_paths().into_iter().find(|p| p.exists()) {
        info!("Found browser at: {}", path.display());
        return Ok(path);
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser using 'which': {found}");
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir();
            warn!(
                "No user cache directory, downloading Chromium under {}",
                fallback.display()
            );
            fallback
        })
        .join("tmall_collect")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir).context("Failed to create browser cache directory")?;

    info!("Downloading managed Chromium into {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch browser")?;
    info!("Downloaded Chromium to: {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// Launch Chromium for product pages.
///
/// `chrome_data_dir` keeps a login session between runs; without it a
/// per-process directory under the temp dir is used.
pub async fn launch_browser(headless: bool, chrome_data_dir: Option<PathBuf>) -> Result<BrowserSession> {
    let chrome_path = match find_browser_executable() {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}; falling back to a managed download");
            download_managed_browser().await?
        }
    };

    let temp_profile = chrome_data_dir.is_none();
    let user_data_dir = chrome_data_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("tmall_collect_chrome_{}", std::process::id()))
    });
    std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);
    builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let config = builder
        .arg(format!("--user-agent={CHROME_USER_AGENT}"))
        .arg("--lang=zh-CN")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-features=TranslateUI")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--password-store=basic")
        .arg("--use-mock-keychain")
        .arg("--mute-audio")
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

    info!("Launching browser (headless: {headless})");
    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;

    let handler = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // chromiumoxide cannot decode every CDP event newer Chrome sends
                if message.contains("data did not match any variant of untagged enum Message")
                    || message.contains("Failed to deserialize WS response")
                {
                    trace!("Ignoring undecodable CDP message: {message}");
                } else {
                    error!("Browser handler error: {e:?}");
                }
            }
        }
        info!("Browser handler task completed");
    });

    Ok(BrowserSession {
        browser,
        handler,
        user_data_dir,
        temp_profile,
    })
}

const STEALTH_SCRIPTS: [&str; 4] = [
    r"Object.defineProperty(navigator, 'webdriver', { get: () => false });",
    r"Object.defineProperty(navigator, 'languages', { get: () => ['zh-CN', 'zh', 'en'] });",
    r"if (!window.chrome) { window.chrome = {}; }
      if (!window.chrome.runtime) {
          window.chrome.runtime = {
              connect: () => ({
                  onMessage: { addListener: () => {}, removeListener: () => {} },
                  postMessage: () => {}
              })
          };
      }",
    r"if (window.WebGLRenderingContext) {
          const getParameter = WebGLRenderingContext.prototype.getParameter;
          WebGLRenderingContext.prototype.getParameter = new Proxy(getParameter, {
              apply(target, ctx, args) {
                  const param = (args && args[0]) || null;
                  if (param === 37445) return 'Intel Inc.';
                  if (param === 37446) return 'Intel Iris OpenGL Engine';
                  return Reflect.apply(target, ctx, args);
              }
          });
      }",
];

/// Accept-Language sent alongside the overridden user agent
const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// New-document registrations for every stealth script
#[must_use]
pub fn stealth_script_registrations() -> Vec<AddScriptToEvaluateOnNewDocumentParams> {
    STEALTH_SCRIPTS
        .iter()
        .map(|source| AddScriptToEvaluateOnNewDocumentParams {
            source: (*source).to_string(),
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        })
        .collect()
}

/// User agent override for the network layer and `navigator.userAgent`
#[must_use]
pub fn user_agent_override() -> SetUserAgentOverrideParams {
    SetUserAgentOverrideParams {
        user_agent: CHROME_USER_AGENT.to_string(),
        accept_language: Some(ACCEPT_LANGUAGE.to_string()),
        platform: Some("Win32".to_string()),
        user_agent_metadata: None,
    }
}

/// Mask the usual automation fingerprints on `page`.
///
/// The scripts are registered to run in every new document, so this must be
/// called before the page navigates to the product.
pub async fn apply_stealth_measures(page: &Page) -> Result<()> {
    let mut registered = 0;
    for params in stealth_script_registrations() {
        match page.execute(params).await {
            Ok(_) => registered += 1,
            Err(e) => warn!("Failed to register stealth script: {e}"),
        }
    }

    page.execute(user_agent_override())
        .await
        .context("Failed to override user agent")?;
    info!(
        "Stealth measures registered: {registered}/{} scripts",
        STEALTH_SCRIPTS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stealth_script_is_registered_for_new_documents() {
        let registrations = stealth_script_registrations();
        assert_eq!(registrations.len(), STEALTH_SCRIPTS.len());
        assert!(registrations[0].source.contains("'webdriver'"));
        assert!(registrations[1].source.contains("'zh-CN'"));
        assert!(registrations.iter().all(|r| r.run_immediately.is_none()));
    }

    #[test]
    fn user_agent_override_is_a_desktop_chinese_browser() {
        let params = user_agent_override();
        assert_eq!(params.user_agent, CHROME_USER_AGENT);
        assert!(!params.user_agent.contains("Headless"));
        assert_eq!(params.accept_language.as_deref(), Some(ACCEPT_LANGUAGE));
    }
}
