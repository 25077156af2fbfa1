//! Persisted cross-run sync state.
//!
//! The marker file holds the tag of the last fully processed snapshot
//! release; it is the only state carried between runs. Writes go through a
//! temp file and a rename, so a crash mid-write leaves either the old
//! marker or the new one, never a torn file.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Sync state loaded from, and persisted to, a marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    path: PathBuf,
    last_tag: Option<String>,
}

impl SyncState {
    /// Load the marker at `path`. A missing marker is an empty state.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let last_tag = match fs::read_to_string(&path).await {
            Ok(contents) => {
                let tag = contents.trim().to_string();
                (!tag.is_empty()).then_some(tag)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("reading marker {}", path.display()));
            }
        };
        Ok(Self { path, last_tag })
    }

    /// True when `tag` has not been processed yet: no marker exists, or the
    /// recorded tag differs by exact string comparison.
    pub fn is_new_release(&self, tag: &str) -> bool {
        self.last_tag.as_deref() != Some(tag)
    }

    pub fn last_tag(&self) -> Option<&str> {
        self.last_tag.as_deref()
    }

    /// Record `tag` as processed and persist it atomically.
    pub async fn record(&mut self, tag: &str) -> Result<()> {
        let tmp = self.path.with_extension("tmp");

        let mut file = fs::File::create(&tmp)
            .await
            .with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(tag.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing marker {}", self.path.display()))?;

        debug!(%tag, marker = %self.path.display(), "marker updated");
        self.last_tag = Some(tag.to_string());
        Ok(())
    }
}
