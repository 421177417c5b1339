use crate::assembler::{CommonPhrase, InstructionSet};
use crate::error::{AppError, Result};
use crate::filter::FilterCriteria;
use crate::metrics::SeverityThresholds;
use crate::selection::{SortDirection, SortField};
use log;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".ctxpack";
pub const DEFAULT_CONFIG_FILENAME: &str = "ctxpack.toml";
pub const DEFAULT_OUTPUT_DIR: &str = ".ctxpack/out";
pub const DEFAULT_READ_TIMEOUT: &str = "10s";
pub const DEFAULT_CACHE_TTL: &str = "5m";
pub const ROOT_ENV_VAR: &str = "CTXPACK_ROOT";
const MAX_DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub severity: SeverityConfig,
    #[serde(default)]
    pub instructions: InstructionsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    #[serde(default = "default_true")]
    pub skip_hidden_dirs: bool,
    #[serde(default = "default_true")]
    pub follow_links: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub ignored_folders: Vec<String>,
    #[serde(default)]
    pub wildcards: Vec<String>,
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    #[serde(default = "default_suffixes")]
    pub default_suffixes: Vec<String>,
    #[serde(default = "default_true")]
    pub apply_defaults: bool,
    #[serde(default)]
    pub sort_field: SortField,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SeverityConfig {
    #[serde(default = "default_medium_from")]
    pub medium_from: usize,
    #[serde(default = "default_high_from")]
    pub high_from: usize,
    #[serde(default = "default_critical_from")]
    pub critical_from: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InstructionsConfig {
    #[serde(default)]
    pub top: String,
    #[serde(default)]
    pub bottom: String,
    #[serde(default = "default_phrases")]
    pub phrases: Vec<PhraseConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PhraseConfig {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub target_lines: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PerformanceConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_read_timeout_string")]
    pub read_timeout: String,
    #[serde(default = "default_cache_ttl_string")]
    pub cache_ttl: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub json_minify: bool,
    #[serde(default = "default_false")]
    pub include_timestamp: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub filename_base: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_excluded_dirs() -> Vec<String> {
    vec!["bin".to_string(), "obj".to_string()]
}
fn default_suffixes() -> Vec<String> {
    [
        "program.cs",
        "startup.cs",
        "app.razor",
        "_imports.razor",
        "appsettings.json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_medium_from() -> usize {
    1000
}
fn default_high_from() -> usize {
    2000
}
fn default_critical_from() -> usize {
    3000
}
fn default_phrases() -> Vec<PhraseConfig> {
    [
        (
            "full-files",
            "When you change a file, reply with the complete updated file.",
        ),
        (
            "no-placeholders",
            "Do not leave placeholders or elide unchanged code.",
        ),
        (
            "ask-first",
            "Ask for any unselected file listed below before assuming its content.",
        ),
    ]
    .iter()
    .map(|(id, text)| PhraseConfig {
        id: id.to_string(),
        text: text.to_string(),
        enabled: false,
    })
    .collect()
}
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_DEFAULT_CONCURRENCY)
}
fn default_read_timeout_string() -> String {
    DEFAULT_READ_TIMEOUT.to_string()
}
fn default_cache_ttl_string() -> String {
    DEFAULT_CACHE_TTL.to_string()
}
fn default_format() -> String {
    "text".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: default_excluded_dirs(),
            skip_hidden_dirs: default_true(),
            follow_links: default_true(),
        }
    }
}
impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_suffixes: default_suffixes(),
            apply_defaults: default_true(),
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
        }
    }
}
impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            medium_from: default_medium_from(),
            high_from: default_high_from(),
            critical_from: default_critical_from(),
        }
    }
}
impl Default for InstructionsConfig {
    fn default() -> Self {
        Self {
            top: String::new(),
            bottom: String::new(),
            phrases: default_phrases(),
        }
    }
}
impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            read_timeout: default_read_timeout_string(),
            cache_ttl: default_cache_ttl_string(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            json_minify: default_true(),
            include_timestamp: default_false(),
            output_dir: default_output_dir(),
            filename_base: None,
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var(ROOT_ENV_VAR).ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::from_io(&path_to_resolve, e))
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        if let Some(p_str) = cli_config_file {
            let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let project_path = project_root
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILENAME);
        if project_path.exists() {
            log::debug!("Using project config file: {}", project_path.display());
            return Ok(Some(project_path));
        }

        let user_path = dirs::config_dir().map(|d| d.join("ctxpack").join(DEFAULT_CONFIG_FILENAME));
        match user_path {
            Some(path) if path.exists() => {
                log::debug!("Using user config file: {}", path.display());
                Ok(Some(path))
            }
            _ => {
                log::debug!(
                    "No config file specified and none found at: {}",
                    project_path.display()
                );
                Ok(None)
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path)
            .map_err(|e| AppError::from_io(config_path, e))?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_content)
            .map_err(|e| AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(AppError::from)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.severity;
        if !(s.medium_from <= s.high_from && s.high_from <= s.critical_from) {
            return Err(AppError::Config(format!(
                "Severity thresholds must be ascending (medium {} <= high {} <= critical {})",
                s.medium_from, s.high_from, s.critical_from
            )));
        }
        if self.performance.concurrency == 0 {
            return Err(AppError::Config(
                "[performance].concurrency must be at least 1".to_string(),
            ));
        }
        if self.chunking.target_lines == Some(0) {
            return Err(AppError::Config(
                "[chunking].target_lines must be at least 1".to_string(),
            ));
        }
        self.get_read_timeout()?;
        self.get_cache_ttl()?;
        Ok(())
    }

    pub fn get_read_timeout(&self) -> Result<Duration> {
        parse(&self.performance.read_timeout).map_err(|e| {
            AppError::InvalidArgument(format!(
                "Invalid read timeout '{}': {}. Use format like '500ms', '10s'.",
                self.performance.read_timeout, e
            ))
        })
    }

    pub fn get_cache_ttl(&self) -> Result<Duration> {
        parse(&self.performance.cache_ttl).map_err(|e| {
            AppError::InvalidArgument(format!(
                "Invalid cache TTL '{}': {}. Use format like '90s', '5m'.",
                self.performance.cache_ttl, e
            ))
        })
    }

    pub fn filter_criteria(&self) -> FilterCriteria {
        FilterCriteria::new(
            &self.filters.extensions,
            &self.filters.ignored_folders,
            &self.filters.wildcards,
            &self.filters.search,
        )
    }

    pub fn severity_thresholds(&self) -> SeverityThresholds {
        SeverityThresholds {
            medium_from: self.severity.medium_from,
            high_from: self.severity.high_from,
            critical_from: self.severity.critical_from,
        }
    }

    pub fn instruction_set(&self) -> InstructionSet {
        InstructionSet {
            top: self.instructions.top.clone(),
            bottom: self.instructions.bottom.clone(),
            phrases: self
                .instructions
                .phrases
                .iter()
                .map(|p| CommonPhrase {
                    id: p.id.clone(),
                    text: p.text.clone(),
                    enabled: p.enabled,
                })
                .collect(),
        }
    }

    /// Enables the named common phrases; unknown ids are reported back.
    pub fn enable_phrases<'a>(&mut self, ids: &'a [String]) -> Vec<&'a str> {
        let mut unknown = Vec::new();
        for id in ids {
            match self.instructions.phrases.iter_mut().find(|p| &p.id == id) {
                Some(phrase) => phrase.enabled = true,
                None => unknown.push(id.as_str()),
            }
        }
        unknown
    }

    pub fn get_effective_filename_base(&self, project_root: &Path) -> String {
        self.output.filename_base.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "context".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.excluded_dirs, vec!["bin", "obj"]);
        assert_eq!(config.severity.critical_from, 3000);
        assert_eq!(config.get_read_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(config.get_cache_ttl().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [filters]
            extensions = ["cs", ".razor"]
            wildcards = ["*/Views/*;*.cshtml"]

            [chunking]
            target_lines = 400

            [[instructions.phrases]]
            id = "terse"
            text = "Be terse."
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.target_lines, Some(400));
        assert_eq!(config.instructions.phrases.len(), 1);
        assert!(config.instruction_set().phrases[0].enabled);
        assert_eq!(config.filter_criteria().wildcards().len(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_toml_str("[scan]\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, AppError::TomlParse(_)));
    }

    #[test]
    fn descending_thresholds_are_rejected() {
        let err = Config::from_toml_str("[severity]\nmedium_from = 5000\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = Config::from_toml_str("[performance]\nread_timeout = \"soon\"\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn enable_phrases_reports_unknown_ids() {
        let mut config = Config::default();
        let ids = vec!["full-files".to_string(), "nope".to_string()];
        let unknown = config.enable_phrases(&ids);
        assert_eq!(unknown, vec!["nope"]);
        assert!(config.instructions.phrases[0].enabled);
    }
}
