use crate::error::AppError;
use crate::scanner::FileEntry;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log;
use rayon::prelude::*;

/// Immutable snapshot of the active filters, normalized on construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    extensions: Vec<String>,
    ignored_folders: Vec<String>,
    wildcards: Vec<String>,
    search: String,
}

impl FilterCriteria {
    /// Extensions may be given as `cs`, `.cs` or `*.cs`, and comma separated.
    /// Wildcard strings may carry several `;`-separated patterns.
    pub fn new<S: AsRef<str>>(
        extensions: &[S],
        ignored_folders: &[S],
        wildcards: &[S],
        search: &str,
    ) -> Self {
        let extensions = extensions
            .iter()
            .flat_map(|s| s.as_ref().split(','))
            .filter_map(normalize_extension)
            .collect();
        let ignored_folders = ignored_folders
            .iter()
            .map(|f| {
                f.as_ref()
                    .trim()
                    .replace('\\', "/")
                    .trim_matches('/')
                    .to_lowercase()
            })
            .filter(|f| !f.is_empty())
            .collect();
        let wildcards = wildcards
            .iter()
            .flat_map(|s| s.as_ref().split(';'))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        Self {
            extensions,
            ignored_folders,
            wildcards,
            search: search.trim().to_lowercase(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn ignored_folders(&self) -> &[String] {
        &self.ignored_folders
    }

    pub fn wildcards(&self) -> &[String] {
        &self.wildcards
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
            && self.ignored_folders.is_empty()
            && self.wildcards.is_empty()
            && self.search.is_empty()
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('*').trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(format!(".{}", ext.to_lowercase()))
    }
}

/// Criteria with wildcard patterns compiled. Malformed patterns are dropped and
/// kept in `rejected` so callers can surface them.
#[derive(Debug)]
pub struct CompiledFilter {
    criteria: FilterCriteria,
    globs: Option<GlobSet>,
    rejected: Vec<AppError>,
}

impl CompiledFilter {
    pub fn new(criteria: &FilterCriteria) -> Self {
        let mut rejected = Vec::new();
        let mut builder = GlobSetBuilder::new();
        let mut accepted = 0usize;

        for pattern in &criteria.wildcards {
            let normalized = pattern.replace('\\', "/");
            match GlobBuilder::new(&normalized)
                .case_insensitive(true)
                .literal_separator(false)
                .build()
            {
                Ok(glob) => {
                    log::trace!("Adding wildcard pattern: {}", pattern);
                    builder.add(glob);
                    accepted += 1;
                }
                Err(e) => {
                    log::warn!("Skipping invalid wildcard pattern \"{}\": {}", pattern, e);
                    rejected.push(AppError::FilterMisconfiguration {
                        pattern: pattern.clone(),
                        reason: e.kind().to_string(),
                    });
                }
            }
        }

        let globs = if accepted == 0 {
            None
        } else {
            match builder.build() {
                Ok(set) => Some(set),
                Err(e) => {
                    log::warn!("Could not build wildcard set, ignoring wildcards: {}", e);
                    rejected.push(AppError::from(e));
                    None
                }
            }
        };

        Self {
            criteria: criteria.clone(),
            globs,
            rejected,
        }
    }

    pub fn rejected(&self) -> &[AppError] {
        &self.rejected
    }

    pub fn into_rejected(self) -> Vec<AppError> {
        self.rejected
    }

    // Families are AND-combined and each is a no-op when empty.
    pub fn matches(&self, entry: &FileEntry) -> bool {
        self.passes_folders(entry)
            && self.passes_extension(entry)
            && self.passes_wildcards(entry)
            && self.passes_search(entry)
    }

    fn passes_folders(&self, entry: &FileEntry) -> bool {
        if self.criteria.ignored_folders.is_empty() {
            return true;
        }
        let dir = match entry.relative_path.rfind('/') {
            Some(idx) => format!("/{}/", entry.relative_path[..idx].to_lowercase()),
            None => return true,
        };
        !self
            .criteria
            .ignored_folders
            .iter()
            .any(|folder| dir.contains(&format!("/{}/", folder)))
    }

    fn passes_extension(&self, entry: &FileEntry) -> bool {
        self.criteria.extensions.is_empty() || self.criteria.extensions.contains(&entry.extension)
    }

    fn passes_wildcards(&self, entry: &FileEntry) -> bool {
        match &self.globs {
            Some(set) => set.is_match(&entry.relative_path),
            None => true,
        }
    }

    fn passes_search(&self, entry: &FileEntry) -> bool {
        self.criteria.search.is_empty()
            || entry
                .relative_path
                .to_lowercase()
                .contains(&self.criteria.search)
    }
}

/// Returns the entries passing `criteria`, in input order.
pub fn apply(entries: &[FileEntry], criteria: &FilterCriteria) -> Vec<FileEntry> {
    if criteria.is_empty() {
        return entries.to_vec();
    }
    let compiled = CompiledFilter::new(criteria);
    apply_compiled(entries, &compiled)
}

pub fn apply_compiled(entries: &[FileEntry], compiled: &CompiledFilter) -> Vec<FileEntry> {
    let filtered: Vec<FileEntry> = entries
        .par_iter()
        .filter(|entry| compiled.matches(entry))
        .cloned()
        .collect();
    log::debug!(
        "Filter kept {} of {} entries.",
        filtered.len(),
        entries.len()
    );
    filtered
}
