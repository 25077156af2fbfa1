//! Random-access input sources for archive parsing.
//!
//! The zip parser reads container structures by offset rather than
//! sequentially, so archives are accessed through the [`ReadAt`] seam.
//! Downloads land on disk first and are then opened with
//! [`LocalFileReader`]; tests substitute in-memory buffers.

mod local;

pub use local::LocalFileReader;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
