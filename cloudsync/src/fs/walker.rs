//! Directory traversal for class trees.
//!
//! Excluded folders are pruned before descent, so nothing under e.g.
//! `node_modules` is ever visited.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Folder names never synchronized: tests, dependency-manager metadata and
/// build caches.
pub const EXCLUDED_FOLDERS: &[&str] = &[
    "tests",
    "test",
    "__tests__",
    "node_modules",
    ".git",
    ".npm",
    ".cache",
    ".turbo",
    "build",
    "dist",
];

/// File names never synchronized: OS metadata and lockfiles.
pub const EXCLUDED_FILES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// Options for directory walking
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Follow symbolic links
    pub follow_links: bool,

    /// Folder names pruned from the walk (exact match)
    pub excluded_folders: Vec<String>,

    /// File names skipped (exact match)
    pub excluded_files: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_links: false,
            excluded_folders: EXCLUDED_FOLDERS.iter().map(|s| s.to_string()).collect(),
            excluded_files: EXCLUDED_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl WalkOptions {
    /// Walk everything, used for dependency bundles.
    pub fn unfiltered() -> Self {
        Self {
            follow_links: false,
            excluded_folders: Vec::new(),
            excluded_files: Vec::new(),
        }
    }
}

/// A file discovered during walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// `/`-separated path relative to the walk root
    pub relative_path: String,

    /// File size in bytes
    pub size: u64,
}

/// Walk a directory tree and collect all regular files, in name order.
pub fn walk_directory(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry, options));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata()?;
        files.push(FileInfo {
            path: entry.path().to_path_buf(),
            relative_path: relative_slash_path(entry.path(), root),
            size: metadata.len(),
        });
    }

    Ok(files)
}

fn is_excluded(entry: &DirEntry, options: &WalkOptions) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        options.excluded_folders.iter().any(|f| f == name.as_ref())
    } else {
        options.excluded_files.iter().any(|f| f == name.as_ref())
    }
}

fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
