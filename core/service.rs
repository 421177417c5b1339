use crate::assembler::FileContent;
use crate::error::{AppError, Result};
use crate::metrics::{FileMetrics, MetricsCache, read_text};
use crate::pool::{CancellationToken, WorkerPool};
use crate::scanner::{self, MetricsState, ScanOptions};
use indexmap::IndexMap;
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct FileListing {
    pub file_name: String,
    pub full_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct MetadataResult {
    pub line_count: usize,
    pub char_count: usize,
    pub binary: bool,
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl From<Result<FileMetrics>> for MetadataResult {
    fn from(result: Result<FileMetrics>) -> Self {
        match result {
            Ok(m) => Self {
                line_count: m.line_count,
                char_count: m.char_count,
                binary: m.binary,
                error: None,
            },
            Err(e) => Self {
                error: Some(e.to_string()),
                ..Self::default()
            },
        }
    }
}

impl From<&MetricsState> for MetadataResult {
    fn from(state: &MetricsState) -> Self {
        match state {
            MetricsState::Computed(m) => Self::from(Ok::<_, AppError>(*m)),
            MetricsState::Failed { error } => Self {
                error: Some(error.clone()),
                ..Self::default()
            },
            MetricsState::Pending => Self {
                error: Some("metrics pending".to_string()),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct ContentResult {
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub content: Option<String>,
    pub binary: bool,
    #[cfg_attr(
        feature = "serde_support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl From<FileContent> for ContentResult {
    fn from(content: FileContent) -> Self {
        match content {
            FileContent::Text { text } => Self {
                content: Some(text),
                ..Self::default()
            },
            FileContent::Binary { .. } => Self {
                binary: true,
                ..Self::default()
            },
            FileContent::Error { message } => Self {
                error: Some(message),
                ..Self::default()
            },
        }
    }
}

/// Lists every file below `root` after build and hidden directory pruning.
pub fn list_files(
    root: &Path,
    options: &ScanOptions,
    cancel: &CancellationToken,
) -> Result<Vec<FileListing>> {
    let entries = scanner::scan(root, options, cancel)?;
    Ok(entries
        .into_iter()
        .map(|e| FileListing {
            file_name: e.display_name,
            full_path: e.full_path,
        })
        .collect())
}

/// Metrics per path through the pool and cache, in input order.
pub fn fetch_metrics(
    paths: &[PathBuf],
    pool: &WorkerPool,
    cache: &Arc<MetricsCache>,
) -> Vec<(PathBuf, Result<FileMetrics>)> {
    let cache = Arc::clone(cache);
    pool.run(paths, move |path| cache.get_or_compute(path))
}

/// Decoded content per path through the pool, in input order.
pub fn fetch_contents(paths: &[PathBuf], pool: &WorkerPool) -> Vec<(PathBuf, FileContent)> {
    pool.run(paths, read_text)
        .into_iter()
        .map(|(path, result)| (path, FileContent::from(result)))
        .collect()
}

pub fn get_metadata(
    paths: &[PathBuf],
    pool: &WorkerPool,
    cache: &Arc<MetricsCache>,
) -> IndexMap<String, MetadataResult> {
    let results: IndexMap<String, MetadataResult> = fetch_metrics(paths, pool, cache)
        .into_iter()
        .map(|(path, result)| (path.display().to_string(), result.into()))
        .collect();
    log::debug!(
        "Metadata for {} paths ({} failed).",
        results.len(),
        results.values().filter(|r| r.error.is_some()).count()
    );
    results
}

pub fn get_contents(paths: &[PathBuf], pool: &WorkerPool) -> IndexMap<String, ContentResult> {
    let results: IndexMap<String, ContentResult> = fetch_contents(paths, pool)
        .into_iter()
        .map(|(path, content)| (path.display().to_string(), content.into()))
        .collect();
    log::debug!(
        "Contents for {} paths ({} failed).",
        results.len(),
        results.values().filter(|r| r.error.is_some()).count()
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::pool::PoolOptions;
    use std::fs;
    use std::time::Duration;

    fn pool() -> WorkerPool {
        WorkerPool::new(
            PoolOptions {
                concurrency: 2,
                read_timeout: Duration::from_secs(5),
            },
            CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn list_files_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Program.cs"), "a\n").unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/Temp.cs"), "b\n").unwrap();
        let files = list_files(dir.path(), &ScanOptions::default(), &CancellationToken::new()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "Program.cs");
        assert!(files[0].full_path.is_absolute());
    }

    #[test]
    fn list_files_missing_root_fails() {
        let err = list_files(
            Path::new("/no/such/root/anywhere"),
            &ScanOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::PathNotFound(_)));
    }

    #[test]
    fn metadata_reports_per_path_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.txt");
        fs::write(&good, "one\ntwo\n").unwrap();
        let missing = dir.path().join("missing.txt");
        let cache = Arc::new(MetricsCache::new(Duration::from_secs(60)));

        let result = get_metadata(&[good.clone(), missing.clone()], &pool(), &cache);
        let keys: Vec<_> = result.keys().cloned().collect();
        assert_eq!(keys, vec![good.display().to_string(), missing.display().to_string()]);
        assert_eq!(result[0].line_count, 2);
        assert_eq!(result[0].char_count, 8);
        assert!(result[0].error.is_none());
        assert!(result[1].error.is_some());
    }

    #[test]
    fn contents_mark_binary_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("a.txt");
        let binary = dir.path().join("b.bin");
        fs::write(&text, "hello").unwrap();
        fs::write(&binary, [0u8, 1, 2]).unwrap();
        let missing = dir.path().join("c.txt");

        let result = get_contents(&[text, binary, missing], &pool());
        assert_eq!(result[0].content.as_deref(), Some("hello"));
        assert!(result[1].binary && result[1].content.is_none());
        assert!(result[2].error.is_some());
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let r = MetadataResult {
            line_count: 3,
            char_count: 9,
            binary: false,
            error: None,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"lineCount":3,"charCount":9,"binary":false}"#);
    }
}
