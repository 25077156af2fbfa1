//! Release feed client for the upstream CVE List repository.
//!
//! The [`ReleaseLocator`] queries the GitHub releases API to find the delta
//! release for a given day, or the latest full-snapshot release. A failed
//! feed request or a missing match is "nothing to do" (`Ok(None)`), never an
//! error; callers only see `Err` for unexpected conditions such as a feed
//! that stops returning JSON.

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

/// Sent on every feed request; the GitHub API rejects anonymous clients
/// without a User-Agent.
const USER_AGENT: &str = concat!("cvemirror/", env!("CARGO_PKG_VERSION"));

/// Substring that marks a daily end-of-day delta tag.
const DELTA_TAG_MARKER: &str = "_at_end_of_day";

/// Suffix of the delta zip asset within a release.
const DELTA_ASSET_SUFFIX: &str = "_delta_CVEs_at_end_of_day.zip";

/// A release object from the feed. Only the fields this tool consumes.
#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable asset attached to a release.
#[derive(Debug, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// How a delta release's download URL is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetResolution {
    /// Template the URL from the tag and date. This re-derives upstream's
    /// naming convention instead of consulting the asset list; if upstream
    /// renames its assets the constructed URL silently goes stale.
    Templated,
    /// Pick the delta asset out of the release metadata returned by the feed.
    FromAssetList,
}

/// A located delta release, ready to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRelease {
    pub tag: String,
    pub date: String,
    pub url: String,
}

/// Queries the release feed and resolves archive download URLs.
pub struct ReleaseLocator {
    client: Client,
    api_url: String,
    download_base: String,
    resolution: AssetResolution,
}

impl ReleaseLocator {
    pub fn new(
        api_url: impl Into<String>,
        download_base: impl Into<String>,
        resolution: AssetResolution,
    ) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            download_base: download_base.into(),
            resolution,
        })
    }

    /// Yesterday's date in UTC, formatted `YYYY-MM-DD`.
    ///
    /// Delta releases are published at the end of each UTC day, so a run on
    /// any given day looks for the previous day's tag.
    pub fn yesterday_utc() -> String {
        (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string()
    }

    /// The HTTP client, shared with archive downloads so they carry the same
    /// User-Agent.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Find the end-of-day delta release for `date`.
    ///
    /// Scans the feed in the order the API returns it for the first tag
    /// containing `<date>_at_end_of_day`, then resolves its download URL per
    /// the configured [`AssetResolution`].
    ///
    /// Returns `Ok(None)` when the feed responds non-200, no tag matches, or
    /// asset-list resolution finds no delta asset on the matched release.
    pub async fn find_delta_release(&self, date: &str) -> Result<Option<DeltaRelease>> {
        let target = format!("{date}{DELTA_TAG_MARKER}");
        info!(%date, "looking for end-of-day delta release");

        let resp = self.client.get(&self.api_url).send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "failed to fetch releases");
            return Ok(None);
        }

        let releases: Vec<Release> = resp.json().await?;
        for release in releases {
            if !release.tag_name.contains(&target) {
                continue;
            }
            info!(tag = %release.tag_name, "matching end-of-day release found");

            let url = match self.resolution {
                AssetResolution::Templated => Some(format!(
                    "{}/{}/{}{}",
                    self.download_base, release.tag_name, date, DELTA_ASSET_SUFFIX
                )),
                AssetResolution::FromAssetList => release
                    .assets
                    .iter()
                    .find(|a| a.name.ends_with(DELTA_ASSET_SUFFIX))
                    .map(|a| a.browser_download_url.clone()),
            };

            return match url {
                Some(url) => Ok(Some(DeltaRelease {
                    tag: release.tag_name,
                    date: date.to_string(),
                    url,
                })),
                None => {
                    warn!(tag = %release.tag_name, "release carries no delta asset");
                    Ok(None)
                }
            };
        }

        Ok(None)
    }

    /// Fetch the tag of the latest release, or `Ok(None)` on a non-200
    /// response.
    pub async fn latest_release_tag(&self) -> Result<Option<String>> {
        let url = format!("{}/latest", self.api_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "failed to fetch latest release");
            return Ok(None);
        }

        let release: Release = resp.json().await?;
        Ok(Some(release.tag_name))
    }

    /// Download URL of the full snapshot published under `tag` for `date`.
    pub fn snapshot_url(&self, tag: &str, date: &str) -> String {
        format!(
            "{}/{}/{}_all_CVEs_at_midnight.zip.zip",
            self.download_base, tag, date
        )
    }
}

/// Extract the snapshot date embedded in a release tag.
///
/// Latest-release tags look like `cve_2024-08-06_2300Z`; the second
/// `_`-separated field is the date the snapshot covers. Returns `None` when
/// the tag does not carry a `YYYY-MM-DD` field there, which means upstream
/// changed its tagging convention.
pub fn snapshot_date_from_tag(tag: &str) -> Option<&str> {
    let date = tag.split('_').nth(1)?;
    let mut fields = date.split('-');
    let (y, m, d) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }
    let numeric =
        |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_digit());
    if numeric(y, 4) && numeric(m, 2) && numeric(d, 2) {
        Some(date)
    } else {
        None
    }
}
