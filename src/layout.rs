//! Routing of extracted CVE records into the mirror's bucket layout.
//!
//! The upstream tree groups records as `cves/<year>/<bucket>xxx/`, where the
//! bucket prefix is derived from the record's sequence number to bound
//! directory fan-out: `CVE-2024-12345.json` lands in `cves/2024/12xxx/`,
//! `CVE-2024-1234.json` in `cves/2024/1xxx/`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

const RECORD_PREFIX: &str = "CVE-";
const RECORD_SUFFIX: &str = ".json";

/// A record filename parsed into its `CVE-<year>-<sequence>.json` fields.
///
/// Parsing is strict: the unrecognized case is an explicit `None`, not an
/// index panic somewhere downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordName {
    pub year: String,
    pub sequence: String,
}

impl RecordName {
    /// Parse a file name of the exact shape `CVE-<year>-<sequence>.json`,
    /// with both fields non-empty and numeric. Anything else is `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(RECORD_SUFFIX)?;
        let rest = stem.strip_prefix(RECORD_PREFIX)?;
        let (year, sequence) = rest.split_once('-')?;

        let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !numeric(year) || !numeric(sequence) {
            return None;
        }

        Some(Self {
            year: year.to_string(),
            sequence: sequence.to_string(),
        })
    }

    /// Bucket directory name for this record.
    ///
    /// Five-digit sequences bucket on their first two digits, four-digit
    /// sequences on their first digit. Other lengths have no bucket and the
    /// router skips them.
    pub fn bucket(&self) -> Option<String> {
        match self.sequence.len() {
            5 => Some(format!("{}xxx", &self.sequence[..2])),
            4 => Some(format!("{}xxx", &self.sequence[..1])),
            _ => None,
        }
    }
}

/// Outcome of a routing pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouteStats {
    /// Record files moved into the mirror tree.
    pub moved: usize,
    /// Record files with an unexpected sequence length, left in place.
    pub skipped: usize,
}

/// Walk `src` recursively and move every record file into its bucket under
/// `<base>/cves/<year>/<bucket>/`, replacing same-named destination files.
///
/// Files that do not parse as record names are ignored; records whose
/// sequence has no bucket are logged and left where they are. Filesystem
/// errors propagate.
pub fn route_tree(src: &Path, base: &Path) -> Result<RouteStats> {
    let mut stats = RouteStats::default();
    route_dir(src, base, &mut stats)?;
    Ok(stats)
}

fn route_dir(dir: &Path, base: &Path, stats: &mut RouteStats) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            route_dir(&path, base, stats)?;
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(record) = RecordName::parse(name) else {
            continue;
        };

        match record.bucket() {
            Some(bucket) => {
                let target_dir = base.join("cves").join(&record.year).join(&bucket);
                fs::create_dir_all(&target_dir)
                    .with_context(|| format!("creating {}", target_dir.display()))?;

                let target = target_dir.join(name);
                move_file(&path, &target)?;
                debug!(record = %name, to = %target.display(), "routed");
                stats.moved += 1;
            }
            None => {
                warn!(
                    file = %name,
                    sequence_len = record.sequence.len(),
                    "unexpected CVE number length, skipping"
                );
                stats.skipped += 1;
            }
        }
    }

    Ok(())
}

/// Move with overwrite semantics: the destination is replaced, the source
/// entry is removed. Falls back to copy + delete when rename crosses a
/// filesystem boundary.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to)
        .with_context(|| format!("moving {} to {}", from.display(), to.display()))?;
    fs::remove_file(from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(base: &Path, rel: &str, contents: &[u8]) {
        let path = base.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(contents).unwrap();
    }

    #[test]
    fn parses_record_names_strictly() {
        let record = RecordName::parse("CVE-2024-12345.json").unwrap();
        assert_eq!(record.year, "2024");
        assert_eq!(record.sequence, "12345");

        assert!(RecordName::parse("CVE-2024-1234.json").is_some());
        assert!(RecordName::parse("CVE-2024-1.json").is_some());

        assert!(RecordName::parse("cve-2024-1234.json").is_none());
        assert!(RecordName::parse("CVE-2024-1234.txt").is_none());
        assert!(RecordName::parse("CVE-2024.json").is_none());
        assert!(RecordName::parse("CVE--1234.json").is_none());
        assert!(RecordName::parse("CVE-2024-.json").is_none());
        assert!(RecordName::parse("CVE-2024-12a4.json").is_none());
        assert!(RecordName::parse("delta.json").is_none());
    }

    #[test]
    fn buckets_follow_sequence_length() {
        let five = RecordName::parse("CVE-2024-12345.json").unwrap();
        assert_eq!(five.bucket().unwrap(), "12xxx");

        let four = RecordName::parse("CVE-2024-1234.json").unwrap();
        assert_eq!(four.bucket().unwrap(), "1xxx");

        let one = RecordName::parse("CVE-2024-1.json").unwrap();
        assert!(one.bucket().is_none());

        let six = RecordName::parse("CVE-2024-123456.json").unwrap();
        assert!(six.bucket().is_none());
    }

    #[test]
    fn routes_records_into_buckets() {
        let scratch = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();

        create_file(scratch.path(), "deltas/CVE-2024-12345.json", b"five");
        create_file(scratch.path(), "CVE-2023-1234.json", b"four");
        create_file(scratch.path(), "notes.txt", b"ignored");

        let stats = route_tree(scratch.path(), base.path()).unwrap();

        assert_eq!(stats, RouteStats { moved: 2, skipped: 0 });
        assert_eq!(
            fs::read(base.path().join("cves/2024/12xxx/CVE-2024-12345.json")).unwrap(),
            b"five"
        );
        assert_eq!(
            fs::read(base.path().join("cves/2023/1xxx/CVE-2023-1234.json")).unwrap(),
            b"four"
        );
        assert!(!scratch.path().join("deltas/CVE-2024-12345.json").exists());
        // Non-record files stay put
        assert!(scratch.path().join("notes.txt").exists());
    }

    #[test]
    fn short_sequence_is_skipped_in_place() {
        let scratch = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();

        create_file(scratch.path(), "CVE-2024-1.json", b"one");

        let stats = route_tree(scratch.path(), base.path()).unwrap();

        assert_eq!(stats, RouteStats { moved: 0, skipped: 1 });
        assert!(scratch.path().join("CVE-2024-1.json").exists());
        assert!(!base.path().join("cves").exists());
    }

    #[test]
    fn routing_overwrites_existing_destination() {
        let scratch = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();

        create_file(scratch.path(), "CVE-2024-12345.json", b"new contents");
        create_file(
            base.path(),
            "cves/2024/12xxx/CVE-2024-12345.json",
            b"old contents",
        );

        let stats = route_tree(scratch.path(), base.path()).unwrap();

        assert_eq!(stats.moved, 1);
        assert_eq!(
            fs::read(base.path().join("cves/2024/12xxx/CVE-2024-12345.json")).unwrap(),
            b"new contents"
        );
        assert!(!scratch.path().join("CVE-2024-12345.json").exists());
    }
}
