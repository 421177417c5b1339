use crate::config::ScanConfig;
use crate::error::{AppError, Result};
use crate::metrics::{FileMetrics, SeverityBand, SeverityThresholds};
use crate::pool::CancellationToken;
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Metric state of one entry. Written once per scan session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase", tag = "state"))]
pub enum MetricsState {
    #[default]
    Pending,
    Computed(FileMetrics),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct FileEntry {
    pub full_path: PathBuf,
    /// Path below the scan root, always `/`-separated.
    pub relative_path: String,
    pub display_name: String,
    /// Lowercase, with leading dot; empty when the file has none.
    pub extension: String,
    pub size_bytes: u64,
    pub metrics: MetricsState,
    pub is_selected: bool,
}

impl FileEntry {
    pub fn new(root: &Path, full_path: PathBuf, size_bytes: u64) -> Self {
        let relative_path = relative_path_string(&full_path, root);
        let display_name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative_path.clone());
        let extension = full_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        Self {
            full_path,
            relative_path,
            display_name,
            extension,
            size_bytes,
            metrics: MetricsState::Pending,
            is_selected: false,
        }
    }

    pub fn computed_metrics(&self) -> Option<&FileMetrics> {
        match &self.metrics {
            MetricsState::Computed(m) => Some(m),
            _ => None,
        }
    }

    pub fn line_count(&self) -> Option<usize> {
        self.computed_metrics().map(|m| m.line_count)
    }

    pub fn char_count(&self) -> Option<usize> {
        self.computed_metrics().map(|m| m.char_count)
    }

    pub fn is_binary(&self) -> bool {
        self.computed_metrics().is_some_and(|m| m.binary)
    }

    /// Derived on every call, so it always reflects the current line count.
    pub fn severity_band(&self, thresholds: &SeverityThresholds) -> Option<SeverityBand> {
        self.line_count().map(|lines| thresholds.classify(lines))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Directory names pruned at any depth, compared case-insensitively.
    pub excluded_dirs: Vec<String>,
    pub skip_hidden_dirs: bool,
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            excluded_dirs: config
                .excluded_dirs
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            skip_hidden_dirs: config.skip_hidden_dirs,
            follow_links: config.follow_links,
        }
    }
}

impl ScanOptions {
    fn prunes(&self, dir_name: &str) -> bool {
        (self.skip_hidden_dirs && dir_name.starts_with('.'))
            || self
                .excluded_dirs
                .iter()
                .any(|d| d.eq_ignore_ascii_case(dir_name))
    }
}

/// Recursively lists the files under `root`. Excluded and hidden directories are
/// pruned as whole subtrees. Symlinked directories are followed once per real
/// directory. Only a missing or unreadable root is a hard failure.
pub fn scan(
    root: &Path,
    options: &ScanOptions,
    cancel: &CancellationToken,
) -> Result<Vec<FileEntry>> {
    let root = check_root(root)?;
    log::info!("Scanning directory: {}", root.display());

    let mut visited_dirs: HashSet<PathBuf> = HashSet::new();
    visited_dirs.insert(root.clone());

    let walker = WalkDir::new(&root)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| keep_entry(entry, options, &mut visited_dirs));

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for entry_result in walker {
        cancel.check()?;
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(AppError::from(e)),
            Err(e) => {
                log::warn!("Skipping unreadable path during scan: {}", e);
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        log::trace!("Found file: {}", entry.path().display());
        entries.push(FileEntry::new(&root, entry.into_path(), size));
    }

    log::info!(
        "Scan complete. Found {} files ({} unreadable paths skipped).",
        entries.len(),
        skipped
    );
    Ok(entries)
}

fn check_root(root: &Path) -> Result<PathBuf> {
    let canonical = root.canonicalize().map_err(|e| AppError::from_io(root, e))?;
    let meta = fs::metadata(&canonical).map_err(|e| AppError::from_io(&canonical, e))?;
    if !meta.is_dir() {
        return Err(AppError::InvalidArgument(format!(
            "Path is not a directory: {}",
            root.display()
        )));
    }
    // metadata succeeds on directories we cannot list.
    fs::read_dir(&canonical).map_err(|e| AppError::from_io(&canonical, e))?;
    Ok(canonical)
}

fn keep_entry(entry: &DirEntry, options: &ScanOptions, visited_dirs: &mut HashSet<PathBuf>) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if options.prunes(&name) {
        log::trace!("Pruning directory: {}", entry.path().display());
        return false;
    }
    if entry.path_is_symlink() || options.follow_links {
        match entry.path().canonicalize() {
            Ok(real) if visited_dirs.contains(&real) => {
                log::debug!("Skipping already visited directory: {}", entry.path().display());
                return false;
            }
            Ok(real) => {
                visited_dirs.insert(real);
            }
            Err(e) => {
                log::warn!("Cannot resolve directory {}: {}", entry.path().display(), e);
                return false;
            }
        }
    }
    true
}

pub fn relative_path_string(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x\n").unwrap();
    }

    fn relative_paths(entries: &[FileEntry]) -> Vec<String> {
        entries.iter().map(|e| e.relative_path.clone()).collect()
    }

    #[test]
    fn prunes_build_and_hidden_dirs_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Program.cs");
        touch(root, "bin/Temp.cs");
        touch(root, "obj/Debug/x.cs");
        touch(root, ".git/config");
        touch(root, "src/Views/Index.cshtml");
        touch(root, "src/Nested/bin/deep.cs");
        touch(root, "src/Nested/.vs/cache.txt");
        touch(root, "src/.hidden-file.txt");

        let entries = scan(root, &ScanOptions::default(), &CancellationToken::new()).unwrap();
        assert_eq!(
            relative_paths(&entries),
            vec!["Program.cs", "src/.hidden-file.txt", "src/Views/Index.cshtml"]
        );
    }

    #[test]
    fn exclusions_are_case_insensitive_and_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "BIN/a.cs");
        touch(root, "node_modules/b.js");
        touch(root, "c.cs");

        let options = ScanOptions {
            excluded_dirs: vec!["bin".into(), "node_modules".into()],
            ..ScanOptions::default()
        };
        let entries = scan(root, &options, &CancellationToken::new()).unwrap();
        assert_eq!(relative_paths(&entries), vec!["c.cs"]);
    }

    #[test]
    fn entry_fields_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/App.RAZOR");
        touch(dir.path(), "Makefile");
        let entries = scan(dir.path(), &ScanOptions::default(), &CancellationToken::new()).unwrap();
        let app = entries.iter().find(|e| e.display_name == "App.RAZOR").unwrap();
        assert_eq!(app.extension, ".razor");
        assert!(app.full_path.is_absolute());
        assert_eq!(app.metrics, MetricsState::Pending);
        assert!(!app.is_selected);
        let make = entries.iter().find(|e| e.display_name == "Makefile").unwrap();
        assert_eq!(make.extension, "");
    }

    #[test]
    fn missing_root_is_path_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(
            &dir.path().join("nope"),
            &ScanOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::PathNotFound(_)));
    }

    #[test]
    fn cancelled_scan_stops() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.txt");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = scan(dir.path(), &ScanOptions::default(), &cancel).unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "a/file.txt");
        std::os::unix::fs::symlink(root.join("a"), root.join("a/loop")).unwrap();
        std::os::unix::fs::symlink(root, root.join("a/up")).unwrap();

        let entries = scan(root, &ScanOptions::default(), &CancellationToken::new()).unwrap();
        assert_eq!(relative_paths(&entries), vec!["a/file.txt"]);
    }
}
