//! The two synchronization flows.
//!
//! Each flow is one sequential pipeline per invocation: locate, download,
//! extract, merge or record. Expected misses (no release, nothing new,
//! download refused) end the run cleanly with exit 0; filesystem and
//! archive errors propagate.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::fs;
use tracing::{info, warn};

use crate::cli::MirrorConfig;
use crate::fetch::download_to_file;
use crate::io::LocalFileReader;
use crate::layout::route_tree;
use crate::releases::{ReleaseLocator, snapshot_date_from_tag};
use crate::state::SyncState;
use crate::zip::ZipExtractor;

/// Scratch directory delta archives unpack into before routing.
const DELTA_SCRATCH_DIR: &str = "deltaCves";

/// Archive nested inside full snapshot downloads.
const NESTED_SNAPSHOT_ARCHIVE: &str = "cves.zip";

/// Marker file recording the last processed snapshot tag.
const MARKER_FILE: &str = ".last_release";

async fn unpack_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let reader = Arc::new(LocalFileReader::new(archive)?);
    ZipExtractor::new(reader).unpack_all(dest).await
}

/// Merge yesterday's end-of-day delta release into the mirror.
///
/// Runs without marker state: re-running the same day simply overwrites the
/// same records, so the flow is naturally idempotent.
pub async fn run_delta(config: &MirrorConfig) -> Result<()> {
    let locator = ReleaseLocator::new(
        config.api_url.as_str(),
        config.download_base.as_str(),
        config.resolution,
    )?;

    let date = ReleaseLocator::yesterday_utc();
    let Some(release) = locator.find_delta_release(&date).await? else {
        info!(%date, "no end-of-day delta release found, nothing to do");
        return Ok(());
    };

    fs::create_dir_all(&config.base_dir).await?;
    let archive_path = config
        .base_dir
        .join(format!("{date}_end_of_day_delta_cve_data.zip"));
    if !download_to_file(locator.client(), &release.url, &archive_path).await? {
        return Ok(());
    }

    let scratch = config.base_dir.join(DELTA_SCRATCH_DIR);
    let unpacked = unpack_archive(&archive_path, &scratch).await?;
    info!(files = unpacked, "delta archive extracted");

    let stats = route_tree(&scratch, &config.base_dir)?;
    info!(
        moved = stats.moved,
        skipped = stats.skipped,
        "delta records merged into mirror"
    );

    fs::remove_file(&archive_path).await?;
    fs::remove_dir_all(&scratch).await?;
    info!("cleanup complete");
    Ok(())
}

/// Download and unpack the latest full snapshot when its tag is new.
///
/// The snapshot tree is left as extracted; records are not routed. The
/// marker is only advanced after the archive has been fully processed.
pub async fn run_snapshot(config: &MirrorConfig) -> Result<()> {
    let locator = ReleaseLocator::new(
        config.api_url.as_str(),
        config.download_base.as_str(),
        config.resolution,
    )?;

    let Some(tag) = locator.latest_release_tag().await? else {
        return Ok(());
    };

    let marker = config.base_dir.join(MARKER_FILE);
    let mut state = SyncState::load(&marker).await?;
    if !state.is_new_release(&tag) {
        info!(%tag, "snapshot already up to date, nothing to do");
        return Ok(());
    }

    let Some(date) = snapshot_date_from_tag(&tag) else {
        warn!(%tag, "latest release tag does not embed a snapshot date");
        return Ok(());
    };

    fs::create_dir_all(&config.base_dir).await?;
    let archive_path = config
        .base_dir
        .join(format!("{date}_all_CVEs_at_midnight.zip.zip"));
    let url = locator.snapshot_url(&tag, date);
    if !download_to_file(locator.client(), &url, &archive_path).await? {
        return Ok(());
    }

    let unpacked = unpack_archive(&archive_path, &config.base_dir).await?;
    info!(files = unpacked, "snapshot archive extracted");

    let nested = config.base_dir.join(NESTED_SNAPSHOT_ARCHIVE);
    if fs::try_exists(&nested).await? {
        let nested_unpacked = unpack_archive(&nested, &config.base_dir).await?;
        info!(files = nested_unpacked, "nested cves.zip extracted");
        fs::remove_file(&nested).await?;
    }
    fs::remove_file(&archive_path).await?;

    state.record(&tag).await?;
    info!(%tag, "snapshot complete, marker updated");
    Ok(())
}
