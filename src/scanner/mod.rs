//! Dataset discovery.
//!
//! Finds emission datasets (`*.json`) under a file or directory and loads
//! them as [`RawDataset`] handles. Files that cannot be read become
//! [`RawDataset::Missing`]; the pipeline turns those into zero-filled reports.

use crate::agent::RawDataset;
use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for dataset discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions treated as datasets.
    pub extensions: Vec<String>,
    /// Directory names skipped during the walk.
    pub excludes: Vec<String>,
    /// Directories skipped wherever they sit under the root, such as the
    /// report output directory.
    pub exclude_paths: Vec<PathBuf>,
    /// Files larger than this are skipped.
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            excludes: vec![".git", "target", "node_modules", "reports"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclude_paths: Vec::new(),
            max_file_size: 64 * 1024 * 1024,
        }
    }
}

/// A discovered dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    pub path: PathBuf,
    /// Path below the scanned root; the file name for a file given directly.
    pub relative: PathBuf,
    pub stem: String,
    pub size: u64,
}

impl DatasetFile {
    fn from_path(path: &Path, root: &Path, size: u64) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string());
        let relative = path
            .strip_prefix(root)
            .ok()
            .filter(|r| !r.as_os_str().is_empty())
            .or_else(|| path.file_name().map(Path::new))
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&stem));
        Self {
            path: path.to_path_buf(),
            relative,
            stem,
            size,
        }
    }

    pub fn load(&self) -> RawDataset {
        load_dataset(&self.path)
    }

    /// Where this dataset's report goes under `output_dir`. Mirrors the
    /// dataset's place below the scanned root, so equal file names in
    /// different directories never collide.
    pub fn report_path(&self, output_dir: &Path, extension: &str) -> PathBuf {
        output_dir.join(&self.relative).with_extension(extension)
    }
}

pub struct DatasetScanner {
    config: ScanConfig,
}

impl DatasetScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Discover datasets under `root`, sorted by path.
    ///
    /// A file given directly is always returned, whatever its extension.
    pub fn scan(&self, root: &Path) -> Result<Vec<DatasetFile>> {
        if !root.exists() {
            bail!("Input not found: {}", root.display());
        }

        if root.is_file() {
            let size = fs::metadata(root).map(|m| m.len()).unwrap_or(0);
            let parent = root.parent().unwrap_or(root);
            return Ok(vec![DatasetFile::from_path(root, parent, size)]);
        }

        // Only directories that already exist can hold stale files.
        let excluded_dirs: Vec<PathBuf> = self
            .config
            .exclude_paths
            .iter()
            .filter_map(|p| p.canonicalize().ok())
            .collect();

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                if self.is_excluded(&e.file_name().to_string_lossy()) {
                    return false;
                }
                !(e.file_type().is_dir()
                    && !excluded_dirs.is_empty()
                    && e.path()
                        .canonicalize()
                        .map_or(false, |p| excluded_dirs.contains(&p)))
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    warn!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if size > self.config.max_file_size {
                warn!(
                    "Skipping {} ({} bytes exceeds limit)",
                    entry.path().display(),
                    size
                );
                continue;
            }

            files.push(DatasetFile::from_path(entry.path(), root, size));
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Discovered {} dataset(s) under {}", files.len(), root.display());
        Ok(files)
    }

    /// Whether `path` has a dataset extension.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        self.config.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }

    fn is_excluded(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return true;
        }
        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

/// Read a dataset file. Unreadable files yield [`RawDataset::Missing`].
pub fn load_dataset(path: &Path) -> RawDataset {
    match fs::read_to_string(path) {
        Ok(text) => RawDataset::Text(text),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            RawDataset::Missing
        }
    }
}
