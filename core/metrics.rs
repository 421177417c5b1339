use crate::error::{AppError, Result};
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct FileMetrics {
    pub line_count: usize,
    pub char_count: usize,
    /// Content could not be decoded as text; `char_count` holds the raw byte count.
    pub binary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub enum SeverityBand {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityThresholds {
    pub medium_from: usize,
    pub high_from: usize,
    pub critical_from: usize,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium_from: 1000,
            high_from: 2000,
            critical_from: 3000,
        }
    }
}

impl SeverityThresholds {
    pub fn classify(&self, line_count: usize) -> SeverityBand {
        if line_count < self.medium_from {
            SeverityBand::Low
        } else if line_count < self.high_from {
            SeverityBand::Medium
        } else if line_count < self.critical_from {
            SeverityBand::High
        } else {
            SeverityBand::Critical
        }
    }
}

/// Decoded file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileText {
    Text(String),
    Binary { byte_len: usize },
}

impl FileText {
    pub fn metrics(&self) -> FileMetrics {
        match self {
            FileText::Text(text) => FileMetrics {
                line_count: count_lines(text),
                char_count: bytecount::num_chars(text.as_bytes()),
                binary: false,
            },
            FileText::Binary { byte_len } => FileMetrics {
                line_count: 0,
                char_count: *byte_len,
                binary: true,
            },
        }
    }
}

/// Counts terminator-delimited segments. `\n`, `\r\n` and a lone `\r` each end
/// a line; a trailing terminator does not open a new one.
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let bytes = text.as_bytes();
    let lf = bytecount::count(bytes, b'\n');
    let cr = bytecount::count(bytes, b'\r');
    let crlf = bytes.windows(2).filter(|w| *w == b"\r\n").count();
    let terminators = lf + cr - crlf;
    if matches!(bytes.last(), Some(b'\n') | Some(b'\r')) {
        terminators
    } else {
        terminators + 1
    }
}

/// Best-effort decoding: UTF-8 (BOM stripped) or BOM-marked UTF-16.
/// Anything with NUL bytes or invalid sequences is treated as binary.
pub fn decode_text(bytes: Vec<u8>) -> FileText {
    let byte_len = bytes.len();
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes, byte_len);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes, byte_len);
    }
    if bytes.contains(&0) {
        return FileText::Binary { byte_len };
    }
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes[3..].to_vec()
    } else {
        bytes
    };
    match String::from_utf8(bytes) {
        Ok(text) => FileText::Text(text),
        Err(_) => FileText::Binary { byte_len },
    }
}

fn decode_utf16(body: &[u8], to_unit: fn([u8; 2]) -> u16, byte_len: usize) -> FileText {
    if body.len() % 2 != 0 {
        return FileText::Binary { byte_len };
    }
    let units = body.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    match char::decode_utf16(units).collect::<std::result::Result<String, _>>() {
        Ok(text) if !text.contains('\0') => FileText::Text(text),
        _ => FileText::Binary { byte_len },
    }
}

pub fn read_text(path: &Path) -> Result<FileText> {
    let bytes = fs::read(path).map_err(|e| AppError::from_io(path, e))?;
    Ok(decode_text(bytes))
}

pub fn compute_metrics(path: &Path) -> Result<FileMetrics> {
    let text = read_text(path)?;
    let metrics = text.metrics();
    log::trace!(
        "Computed metrics for {}: {} lines, {} chars{}",
        path.display(),
        metrics.line_count,
        metrics.char_count,
        if metrics.binary { " (binary)" } else { "" }
    );
    Ok(metrics)
}

/// What a cached value was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    pub modified: Option<SystemTime>,
    pub size: u64,
}

impl Validator {
    pub fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).map_err(|e| AppError::from_io(path, e))?;
        Ok(Self {
            modified: meta.modified().ok(),
            size: meta.len(),
        })
    }
}

#[derive(Debug)]
struct CacheEntry {
    validator: Validator,
    metrics: FileMetrics,
    stored_at: Instant,
}

/// Metrics memoized per path. A hit requires the file's current mtime and size
/// to equal the stored validator; the TTL only bounds how long entries linger.
#[derive(Debug)]
pub struct MetricsCache {
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl MetricsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_or_compute(&self, path: &Path) -> Result<FileMetrics> {
        let validator = Validator::of(path)?;
        if let Some(hit) = self.lookup(path, &validator) {
            log::trace!("Metrics cache hit: {}", path.display());
            return Ok(hit);
        }
        let metrics = compute_metrics(path)?;
        // Re-validate after the read: a write racing the read must not be cached.
        if Validator::of(path)? == validator {
            self.store(path, validator, metrics);
        } else {
            log::debug!("File changed during read, not caching: {}", path.display());
        }
        Ok(metrics)
    }

    fn lookup(&self, path: &Path, validator: &Validator) -> Option<FileMetrics> {
        let mut entries = self.entries.lock().ok()?;
        let now = Instant::now();
        entries.retain(|_, e| now.duration_since(e.stored_at) < self.ttl);
        match entries.get(path) {
            Some(entry) if entry.validator == *validator => Some(entry.metrics),
            Some(_) => {
                log::trace!("Metrics cache stale: {}", path.display());
                entries.remove(path);
                None
            }
            None => None,
        }
    }

    fn store(&self, path: &Path, validator: Validator, metrics: FileMetrics) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                path.to_path_buf(),
                CacheEntry {
                    validator,
                    metrics,
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn line_counting_rules() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("abc"), 1);
        assert_eq!(count_lines("abc\n"), 1);
        assert_eq!(count_lines("a\nb"), 2);
        assert_eq!(count_lines("a\nb\n"), 2);
        assert_eq!(count_lines("a\r\nb\r\n"), 2);
        assert_eq!(count_lines("a\rb"), 2);
        assert_eq!(count_lines("\n\n"), 2);
        assert_eq!(count_lines("a\r\r\nb"), 3);
        assert_eq!(count_lines("\r\n\n\r"), 3);
    }

    #[test]
    fn char_count_is_code_points() {
        let metrics = FileText::Text("héllo\n".to_string()).metrics();
        assert_eq!(metrics.char_count, 6);
        assert_eq!(metrics.line_count, 1);
        assert!(!metrics.binary);
    }

    #[test]
    fn decodes_bom_variants() {
        assert_eq!(
            decode_text(b"\xEF\xBB\xBFhi".to_vec()),
            FileText::Text("hi".to_string())
        );
        assert_eq!(
            decode_text(vec![0xFF, 0xFE, b'h', 0, b'i', 0]),
            FileText::Text("hi".to_string())
        );
        assert_eq!(
            decode_text(vec![0xFE, 0xFF, 0, b'h', 0, b'i']),
            FileText::Text("hi".to_string())
        );
    }

    #[test]
    fn undecodable_content_is_binary_not_an_error() {
        let text = decode_text(vec![0x89, b'P', b'N', b'G', 0, 0, 1]);
        assert_eq!(text, FileText::Binary { byte_len: 7 });
        let metrics = text.metrics();
        assert_eq!(metrics.line_count, 0);
        assert_eq!(metrics.char_count, 7);
        assert!(metrics.binary);

        assert!(matches!(decode_text(vec![0xC3, 0x28]), FileText::Binary { .. }));
    }

    #[test]
    fn severity_bands_follow_thresholds() {
        let t = SeverityThresholds::default();
        assert_eq!(t.classify(0), SeverityBand::Low);
        assert_eq!(t.classify(999), SeverityBand::Low);
        assert_eq!(t.classify(1000), SeverityBand::Medium);
        assert_eq!(t.classify(1999), SeverityBand::Medium);
        assert_eq!(t.classify(2000), SeverityBand::High);
        assert_eq!(t.classify(3000), SeverityBand::Critical);

        let custom = SeverityThresholds {
            medium_from: 10,
            high_from: 20,
            critical_from: 30,
        };
        assert_eq!(custom.classify(25), SeverityBand::High);
    }

    #[test]
    fn missing_file_is_path_not_found() {
        let err = compute_metrics(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, AppError::PathNotFound(_)));
    }

    #[test]
    fn cache_invalidates_when_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\n").unwrap();

        let cache = MetricsCache::new(Duration::from_secs(3600));
        assert_eq!(cache.get_or_compute(&path).unwrap().line_count, 1);
        assert_eq!(cache.len(), 1);

        // Size changes even if the mtime granularity hides the write.
        let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"two\nthree\n").unwrap();
        drop(f);

        assert_eq!(cache.get_or_compute(&path).unwrap().line_count, 3);
    }

    #[test]
    fn zero_ttl_never_serves_hits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "x").unwrap();
        let cache = MetricsCache::new(Duration::ZERO);
        cache.get_or_compute(&path).unwrap();
        cache.get_or_compute(&path).unwrap();
        assert!(cache.len() <= 1);
    }
}
