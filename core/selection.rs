use crate::error::{AppError, Result};
use crate::metrics::{FileMetrics, SeverityBand, SeverityThresholds};
use crate::scanner::{FileEntry, MetricsState};
use log;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    LineCount,
    CharCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct SessionSummary {
    pub total_files: usize,
    pub selected_files: usize,
    pub total_lines: usize,
    pub total_chars: usize,
    pub selected_lines: usize,
    pub selected_chars: usize,
    pub binary_files: usize,
    pub failed_files: usize,
    pub pending_files: usize,
    pub severity_bands: BTreeMap<SeverityBand, usize>,
}

#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    entries: Vec<FileEntry>,
    index: HashMap<PathBuf, usize>,
    sort: Option<(SortField, SortDirection)>,
    thresholds: SeverityThresholds,
}

impl Session {
    /// Builds a session over `entries`. Duplicate paths keep their first entry.
    pub fn new(root: PathBuf, entries: Vec<FileEntry>, thresholds: SeverityThresholds) -> Self {
        let mut seen = HashSet::new();
        let before = entries.len();
        let entries: Vec<FileEntry> = entries
            .into_iter()
            .filter(|e| seen.insert(e.full_path.clone()))
            .collect();
        if entries.len() != before {
            log::warn!(
                "Dropped {} duplicate paths while building session",
                before - entries.len()
            );
        }
        let mut session = Self {
            root,
            entries,
            index: HashMap::new(),
            sort: None,
            thresholds,
        };
        session.rebuild_index();
        session
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The working set in its current sort order.
    pub fn current_view(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry(&self, path: &Path) -> Option<&FileEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    fn entry_mut(&mut self, path: &Path) -> Result<&mut FileEntry> {
        match self.index.get(path) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(AppError::PathNotFound(path.to_path_buf())),
        }
    }

    /// Flips the selection of `path` and returns the new state.
    pub fn toggle_selection(&mut self, path: &Path) -> Result<bool> {
        let entry = self.entry_mut(path)?;
        entry.is_selected = !entry.is_selected;
        log::trace!("Toggled {} -> {}", path.display(), entry.is_selected);
        Ok(entry.is_selected)
    }

    pub fn set_selected(&mut self, path: &Path, selected: bool) -> Result<()> {
        self.entry_mut(path)?.is_selected = selected;
        Ok(())
    }

    /// Selects every entry whose full path ends with one of `suffixes`
    /// (trimmed, case-insensitive). Only adds; returns how many were newly selected.
    pub fn apply_defaults<S: AsRef<str>>(&mut self, suffixes: &[S]) -> usize {
        let suffixes: Vec<String> = suffixes
            .iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if suffixes.is_empty() {
            return 0;
        }
        let mut newly_selected = 0;
        for entry in self.entries.iter_mut().filter(|e| !e.is_selected) {
            let path = entry.full_path.to_string_lossy().trim().to_lowercase();
            if suffixes.iter().any(|s| path.ends_with(s.as_str())) {
                entry.is_selected = true;
                newly_selected += 1;
            }
        }
        log::debug!("Default selection added {} files", newly_selected);
        newly_selected
    }

    pub fn select_all(&mut self) {
        self.entries.iter_mut().for_each(|e| e.is_selected = true);
    }

    pub fn clear_selection(&mut self) {
        self.entries.iter_mut().for_each(|e| e.is_selected = false);
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|e| e.is_selected)
            .map(|e| e.full_path.clone())
            .collect()
    }

    pub fn pending_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|e| e.metrics == MetricsState::Pending)
            .map(|e| e.full_path.clone())
            .collect()
    }

    pub fn sort_order(&self) -> Option<(SortField, SortDirection)> {
        self.sort
    }

    /// Stable sort: equal keys keep their prior relative order.
    pub fn set_sort_order(&mut self, field: SortField, direction: SortDirection) {
        self.entries.sort_by(|a, b| {
            let ord = compare_by(field, a, b);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        self.sort = Some((field, direction));
        self.rebuild_index();
    }

    /// Stores the outcome of a metrics computation. Each entry is written at
    /// most once; later writes are ignored and reported as `false`.
    pub fn record_metrics(&mut self, path: &Path, outcome: Result<FileMetrics>) -> Result<bool> {
        let entry = self.entry_mut(path)?;
        if entry.metrics != MetricsState::Pending {
            log::debug!("Metrics already recorded for {}", path.display());
            return Ok(false);
        }
        entry.metrics = match outcome {
            Ok(metrics) => MetricsState::Computed(metrics),
            Err(e) => MetricsState::Failed {
                error: e.to_string(),
            },
        };
        Ok(true)
    }

    pub fn severity_band(&self, path: &Path) -> Option<SeverityBand> {
        self.entry(path)
            .and_then(|e| e.severity_band(&self.thresholds))
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            total_files: self.entries.len(),
            ..SessionSummary::default()
        };
        for entry in &self.entries {
            if entry.is_selected {
                summary.selected_files += 1;
            }
            match &entry.metrics {
                MetricsState::Pending => summary.pending_files += 1,
                MetricsState::Failed { .. } => summary.failed_files += 1,
                MetricsState::Computed(m) => {
                    if m.binary {
                        summary.binary_files += 1;
                    }
                    summary.total_lines += m.line_count;
                    summary.total_chars += m.char_count;
                    if entry.is_selected {
                        summary.selected_lines += m.line_count;
                        summary.selected_chars += m.char_count;
                    }
                    *summary
                        .severity_bands
                        .entry(self.thresholds.classify(m.line_count))
                        .or_insert(0) += 1;
                }
            }
        }
        summary
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.full_path.clone(), i))
            .collect();
    }
}

fn compare_by(field: SortField, a: &FileEntry, b: &FileEntry) -> Ordering {
    match field {
        SortField::Name => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase()),
        SortField::LineCount => a.line_count().cmp(&b.line_count()),
        SortField::CharCount => a.char_count().cmp(&b.char_count()),
    }
}
