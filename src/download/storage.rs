//! File placement under the download root
//!
//! Existing files are never overwritten. A taken name gets a counter before
//! its extension (`main-1 (1).jpg`, `main-1 (2).jpg`), and the new file is
//! created with `create_new` so two writers cannot claim the same name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Highest counter tried before giving up on a name
const MAX_UNIQUIFY_ATTEMPTS: u32 = 10_000;

/// `name (n).ext` variant of `path`
#[must_use]
pub fn numbered_variant(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    };
    path.with_file_name(name)
}

/// Create a new empty file at `path` or at the first free numbered variant.
///
/// Parent directories are created as needed.
pub async fn create_unique(path: &Path) -> std::io::Result<(PathBuf, File)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }

    let mut candidate = path.to_path_buf();
    for n in 1..=MAX_UNIQUIFY_ATTEMPTS {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                candidate = numbered_variant(path, n);
            }
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {}", path.display()),
    ))
}

/// Write a generated document to `root/relative`, uniquifying on collision
pub async fn write_generated_file(root: &Path, relative: &str, content: &[u8]) -> Result<PathBuf> {
    let target = root.join(relative);
    let (path, mut file) = create_unique(&target)
        .await
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.flush().await?;
    log::info!("Saved {}", path.display());
    Ok(path)
}
