use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::releases::AssetResolution;

/// Release feed for the upstream CVE List repository.
pub const DEFAULT_API_URL: &str = "https://api.github.com/repos/CVEProject/cvelistV5/releases";

/// Base of the asset download URLs templated from release tags.
pub const DEFAULT_DOWNLOAD_BASE: &str =
    "https://github.com/CVEProject/cvelistV5/releases/download";

#[derive(Parser, Debug)]
#[command(name = "cvemirror")]
#[command(version)]
#[command(about = "Keeps a local mirror of the CVE List up to date", long_about = None)]
#[command(after_help = "Examples:\n  \
  cvemirror delta                     merge yesterday's end-of-day delta into the mirror\n  \
  cvemirror snapshot                  download the latest full snapshot if it is new\n  \
  cvemirror --base-dir /srv/cve delta mirror into a custom directory")]
pub struct Cli {
    /// Base directory of the local mirror
    #[arg(
        long = "base-dir",
        env = "CVEMIRROR_BASE_DIR",
        default_value = "cve_data/cvelistV5"
    )]
    pub base_dir: PathBuf,

    /// Release feed endpoint (JSON array of releases)
    #[arg(long = "api-url", env = "CVEMIRROR_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Base URL that archive download paths are templated under
    #[arg(
        long = "download-base",
        env = "CVEMIRROR_DOWNLOAD_BASE",
        default_value = DEFAULT_DOWNLOAD_BASE
    )]
    pub download_base: String,

    /// Resolve delta download URLs from the release's asset list instead of
    /// templating them from the tag
    #[arg(long = "resolve-from-assets")]
    pub resolve_from_assets: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "CVEMIRROR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Merge yesterday's end-of-day delta release into the mirror
    Delta,
    /// Download and unpack the latest full snapshot if its tag is new
    Snapshot,
}

/// Resolved settings shared by both synchronization flows.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub base_dir: PathBuf,
    pub api_url: String,
    pub download_base: String,
    pub resolution: AssetResolution,
}

impl Cli {
    pub fn config(&self) -> MirrorConfig {
        MirrorConfig {
            base_dir: self.base_dir.clone(),
            api_url: self.api_url.clone(),
            download_base: self.download_base.clone(),
            resolution: if self.resolve_from_assets {
                AssetResolution::FromAssetList
            } else {
                AssetResolution::Templated
            },
        }
    }
}
