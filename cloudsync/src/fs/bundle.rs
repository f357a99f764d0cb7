//! Zip archiving of dependency bundles for upload.

use std::io::{Cursor, Write};
use std::path::Path;

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::fs::walker::{walk_directory, WalkOptions};
use crate::utils::errors::io_err;
use crate::utils::{Result, SyncError};

/// Zip every file under `root`, entries named by their relative path.
///
/// Blocking; call from `spawn_blocking`.
pub fn zip_directory(root: &Path) -> Result<Bytes> {
    let files = walk_directory(root, &WalkOptions::unfiltered()).map_err(|e| io_err(root, e))?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for file in &files {
        let content = std::fs::read(&file.path).map_err(|e| io_err(&file.path, e))?;
        writer
            .start_file(file.relative_path.clone(), options)
            .map_err(|e| SyncError::Compression(format!("zip {}: {e}", file.relative_path)))?;
        writer.write_all(&content).map_err(|e| io_err(&file.path, e))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| SyncError::Compression(format!("zip finalize: {e}")))?;
    Ok(Bytes::from(cursor.into_inner()))
}
