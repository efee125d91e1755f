//! Release archives: `tar` streams, optionally zstd-compressed.
//!
//! Archives are treated as immutable. Only named entries (the sidecar, the
//! release descriptor) are ever read back; file content is never walked for
//! fingerprinting.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use dreams_types::filter::normalize_path;
use tracing::debug;

use crate::error::{IndexError, IndexResult};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default compression level for written archives.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Read a single entry of an archive into memory.
///
/// Returns `Ok(None)` if the archive has no entry at `entry_path`.
pub fn read_entry(archive: &Path, entry_path: &str) -> IndexResult<Option<Vec<u8>>> {
    if !archive.is_file() {
        return Err(IndexError::NotFound(archive.to_path_buf()));
    }
    let wanted = normalize_path(entry_path);
    let reader = open(archive)?;
    let mut tar = tar::Archive::new(reader);
    let entries = tar.entries().map_err(|e| archive_error(archive, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(archive, e))?;
        let name = {
            let path = entry.path().map_err(|e| archive_error(archive, e))?;
            normalize_path(&path.to_string_lossy())
        };
        if name == wanted {
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| archive_error(archive, e))?;
            debug!(archive = %archive.display(), entry = %wanted, bytes = data.len(), "read archive entry");
            return Ok(Some(data));
        }
    }
    Ok(None)
}

/// Pack the content of `dir` into a zstd-compressed tar archive at `dest`.
pub fn write_archive(dir: &Path, dest: &Path) -> IndexResult<()> {
    if !dir.is_dir() {
        return Err(IndexError::NotFound(dir.to_path_buf()));
    }
    let file = File::create(dest)?;
    let encoder = zstd::Encoder::new(file, COMPRESSION_LEVEL)?;
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(".", dir)?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    debug!(dir = %dir.display(), archive = %dest.display(), "wrote release archive");
    Ok(())
}

fn open(archive: &Path) -> IndexResult<Box<dyn Read>> {
    let mut file = File::open(archive)?;
    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if read == magic.len() && magic == ZSTD_MAGIC {
        let decoder = zstd::Decoder::new(file).map_err(|e| archive_error(archive, e))?;
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn archive_error(path: &Path, err: impl std::fmt::Display) -> IndexError {
    IndexError::Archive {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
