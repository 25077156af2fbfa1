//! Streaming archive downloads.

use std::path::Path;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

/// Download `url` to `dest`, streaming the body to disk in chunks.
///
/// Returns `Ok(false)` without creating the file when the server responds
/// with a non-success status; the caller treats that as a clean abort. There
/// is no timeout and no retry, and an error mid-body propagates and may
/// leave a truncated file behind.
pub async fn download_to_file(client: &Client, url: &str, dest: &Path) -> Result<bool> {
    info!(%url, "downloading archive");

    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        warn!(status = %resp.status(), %url, "failed to download archive");
        return Ok(false);
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let file = fs::File::create(dest)
        .await
        .with_context(|| format!("creating {}", dest.display()))?;
    let mut writer = BufWriter::new(file);
    let mut stream = resp.bytes_stream();
    let mut bytes_written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    writer.flush().await?;

    info!(bytes = bytes_written, path = %dest.display(), "download complete");
    Ok(true)
}
