use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::DeflateDecoder;
use tokio::fs;
use tracing::debug;

use crate::io::ReadAt;
use anyhow::{Result, bail};

use super::parser::ZipParser;
use super::structures::{ArchiveEntry, CompressionMethod};

/// Unpacks whole archives into a directory tree.
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        self.parser.list_entries().await
    }

    /// Unpack every entry into `dest`, creating directories as needed.
    ///
    /// Returns the number of files written. A malformed container or an
    /// unsupported compression method is an error; callers treat it as
    /// fatal rather than recovering.
    pub async fn unpack_all(&self, dest: &Path) -> Result<usize> {
        let entries = self.entries().await?;
        fs::create_dir_all(dest).await?;

        let mut unpacked = 0;
        for entry in &entries {
            let target = dest.join(checked_entry_path(&entry.file_name)?);

            if entry.is_directory {
                fs::create_dir_all(&target).await?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }

            let data = self.read_entry(entry).await?;
            fs::write(&target, &data).await?;
            debug!(entry = %entry.file_name, "unpacked");
            unpacked += 1;
        }

        Ok(unpacked)
    }

    /// Read and decompress one entry's data into memory.
    async fn read_entry(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry).await?;

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_at(data_offset, &mut raw).await?;

        match entry.compression_method {
            CompressionMethod::Stored => Ok(raw),
            CompressionMethod::Deflate => {
                let mut decoder = DeflateDecoder::new(raw.as_slice());
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                decoder.read_to_end(&mut out)?;
                Ok(out)
            }
            CompressionMethod::Unknown(_) => bail!(
                "unsupported compression method {} for {}",
                entry.compression_method.as_u16(),
                entry.file_name
            ),
        }
    }
}

/// Validate an entry name and rebuild it as a relative path.
///
/// Absolute names and `..` components would escape the extraction
/// directory, so an archive carrying them is rejected outright.
fn checked_entry_path(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        bail!("archive entry has an absolute path: {name}");
    }

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => bail!("archive entry escapes the extraction directory: {name}"),
        }
    }
    Ok(out)
}
