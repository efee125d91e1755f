//! Streaming retrieval of the files a difference brings in.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use dreams_diff::ContentDifference;
use dreams_types::fingerprint::CHUNK_SIZE;
use dreams_types::{ContentManifest, FileHasher};
use tracing::{debug, info, warn};

use crate::applier::safe_join;
use crate::error::UpgradeResult;
use crate::source::{ReleaseRef, ReleaseSource};

/// A file that could not be staged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadFailure {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Result of [`download`].
#[derive(Clone, Debug, Default)]
pub struct DownloadReport {
    /// Relative paths written to the staging directory.
    pub staged: Vec<String>,
    /// Total bytes written.
    pub bytes: u64,
    pub failures: Vec<DownloadFailure>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stage every added and modified file of `diff` from `release` into
/// `staging`, mirroring the release layout.
///
/// Each file is streamed in fixed-size chunks. A file whose byte count
/// differs from the declared length, or whose fingerprint differs from the
/// non-empty entry in `expected`, is discarded and recorded as a failure;
/// the remaining files are still fetched.
pub fn download(
    source: &dyn ReleaseSource,
    release: &ReleaseRef,
    diff: &ContentDifference,
    staging: &Path,
    expected: &ContentManifest,
) -> UpgradeResult<DownloadReport> {
    fs::create_dir_all(staging)?;
    let mut report = DownloadReport::default();
    let paths: Vec<&str> = diff.incoming_paths().collect();
    let total = paths.len();

    for (index, path) in paths.into_iter().enumerate() {
        debug!(path, progress = index + 1, total, "downloading");
        match fetch_one(source, release, path, staging, expected) {
            Ok(bytes) => {
                report.bytes += bytes;
                report.staged.push(path.to_string());
            }
            Err(reason) => {
                warn!(path, %reason, "download failed");
                report.failures.push(DownloadFailure {
                    path: path.to_string(),
                    reason,
                });
            }
        }
    }

    info!(
        release = %release.name,
        staged = report.staged.len(),
        failed = report.failures.len(),
        bytes = report.bytes,
        "download finished"
    );
    Ok(report)
}

fn fetch_one(
    source: &dyn ReleaseSource,
    release: &ReleaseRef,
    path: &str,
    staging: &Path,
    expected: &ContentManifest,
) -> Result<u64, String> {
    let dest = safe_join(staging, path).ok_or_else(|| "path escapes the staging directory".to_string())?;
    let remote = source.fetch_file(release, path).map_err(|e| e.to_string())?;

    let written = stream_to(remote.reader, &dest).map_err(|e| e.to_string());
    let verdict = written.and_then(|bytes| {
        if bytes != remote.length {
            return Err(format!("expected {} bytes, received {bytes}", remote.length));
        }
        match expected.get(path).filter(|fp| !fp.is_empty()) {
            Some(want) => {
                let got = FileHasher::FILE.hash_file(&dest).map_err(|e| e.to_string())?;
                if &got == want {
                    Ok(bytes)
                } else {
                    Err(format!("fingerprint mismatch: expected {}, got {}", want.short(), got.short()))
                }
            }
            None => Ok(bytes),
        }
    });

    if verdict.is_err() && dest.exists() {
        if let Err(e) = fs::remove_file(&dest) {
            warn!(path, error = %e, "could not discard rejected download");
        }
    }
    verdict
}

fn stream_to(mut reader: Box<dyn Read>, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(dest)?);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    out.flush()?;
    Ok(total)
}
