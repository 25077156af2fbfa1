//! # cvemirror
//!
//! Keeps a local mirror of the CVE List up to date from the
//! `CVEProject/cvelistV5` release feed.
//!
//! The crate implements two one-shot synchronization flows:
//!
//! - **delta**: locate yesterday's "end of day" incremental release, download
//!   its zip archive, and merge the extracted `CVE-<year>-<seq>.json` records
//!   into the mirror's `cves/<year>/<bucket>xxx/` layout.
//! - **snapshot**: download the latest full snapshot (including the nested
//!   `cves.zip` it carries) when its release tag differs from the last one
//!   recorded in the marker file.
//!
//! Each flow is a single sequential pipeline per invocation; polling is
//! achieved by re-running the binary from an external scheduler.
//!
//! ## Example
//!
//! ```no_run
//! use cvemirror::{AssetResolution, ReleaseLocator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let locator = ReleaseLocator::new(
//!         "https://api.github.com/repos/CVEProject/cvelistV5/releases",
//!         "https://github.com/CVEProject/cvelistV5/releases/download",
//!         AssetResolution::Templated,
//!     )?;
//!
//!     let date = ReleaseLocator::yesterday_utc();
//!     if let Some(release) = locator.find_delta_release(&date).await? {
//!         println!("delta available: {}", release.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod fetch;
pub mod io;
pub mod layout;
pub mod releases;
pub mod state;
pub mod sync;
pub mod zip;

pub use cli::{Cli, Command, MirrorConfig};
pub use fetch::download_to_file;
pub use io::{LocalFileReader, ReadAt};
pub use layout::{RecordName, RouteStats, route_tree};
pub use releases::{AssetResolution, DeltaRelease, ReleaseLocator};
pub use state::SyncState;
pub use sync::{run_delta, run_snapshot};
pub use zip::{ArchiveEntry, ZipExtractor};
