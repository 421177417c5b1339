use crate::assembler::{self, FileContent, InstructionSet, Package};
use crate::chunking::{self, Chunk};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::filter::{self, CompiledFilter, FilterCriteria};
use crate::metrics::{MetricsCache, SeverityThresholds};
use crate::pool::{CancellationToken, PoolOptions, WorkerPool};
use crate::scanner::{self, ScanOptions};
use crate::selection::{Session, SortDirection, SortField};
use crate::service;
use chrono::Local;
use log;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub root: PathBuf,
    pub scan: ScanOptions,
    pub criteria: FilterCriteria,
    /// Suffixes selected automatically, when `apply_defaults` is set.
    pub default_suffixes: Vec<String>,
    pub apply_defaults: bool,
    /// Further suffixes to select, matched like the defaults.
    pub select: Vec<String>,
    pub select_all: bool,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub thresholds: SeverityThresholds,
    pub instructions: InstructionSet,
    pub target_lines: Option<usize>,
    pub include_timestamp: bool,
    pub pool: PoolOptions,
    pub cache_ttl: Duration,
}

impl PipelineOptions {
    pub fn from_config(config: &Config, root: PathBuf) -> Result<Self> {
        Ok(Self {
            root,
            scan: ScanOptions::from(&config.scan),
            criteria: config.filter_criteria(),
            default_suffixes: config.selection.default_suffixes.clone(),
            apply_defaults: config.selection.apply_defaults,
            select: Vec::new(),
            select_all: false,
            sort_field: config.selection.sort_field,
            sort_direction: config.selection.sort_direction,
            thresholds: config.severity_thresholds(),
            instructions: config.instruction_set(),
            target_lines: config.chunking.target_lines,
            include_timestamp: config.output.include_timestamp,
            pool: PoolOptions::from_config(config)?,
            cache_ttl: config.get_cache_ttl()?,
        })
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub session: Session,
    pub package: Package,
    /// Present when a target line count was given.
    pub chunks: Option<Vec<Chunk>>,
    /// Wildcard patterns that failed to compile and were ignored.
    pub rejected_patterns: Vec<AppError>,
}

pub struct Pipeline {
    options: PipelineOptions,
    pool: WorkerPool,
    cache: Arc<MetricsCache>,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, cancel: CancellationToken) -> Result<Self> {
        let pool = WorkerPool::new(options.pool, cancel)?;
        let cache = Arc::new(MetricsCache::new(options.cache_ttl));
        Ok(Self {
            options,
            pool,
            cache,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Scans, filters and measures the tree and applies the configured
    /// selection and sort order.
    pub fn build_session(&self) -> Result<(Session, Vec<AppError>)> {
        let opts = &self.options;
        let cancel = self.pool.cancellation();

        let entries = scanner::scan(&opts.root, &opts.scan, cancel)?;
        let compiled = CompiledFilter::new(&opts.criteria);
        let entries = filter::apply_compiled(&entries, &compiled);
        let rejected = compiled.into_rejected();

        let mut session = Session::new(opts.root.clone(), entries, opts.thresholds);
        if opts.select_all {
            session.select_all();
        } else {
            if opts.apply_defaults {
                session.apply_defaults(&opts.default_suffixes);
            }
            if !opts.select.is_empty() {
                let added = session.apply_defaults(&opts.select);
                if added == 0 {
                    log::warn!("No files matched the requested selection: {:?}", opts.select);
                }
            }
        }

        let paths = session.pending_paths();
        log::info!("Computing metrics for {} files.", paths.len());
        for (path, outcome) in service::fetch_metrics(&paths, &self.pool, &self.cache) {
            if let Err(AppError::Cancelled) = outcome {
                return Err(AppError::Cancelled);
            }
            session.record_metrics(&path, outcome)?;
        }
        cancel.check()?;

        session.set_sort_order(opts.sort_field, opts.sort_direction);
        Ok((session, rejected))
    }

    /// Loads the selected contents and renders the package for `session`.
    pub fn assemble(&self, session: &Session) -> Result<Package> {
        let selected = session.selected_paths();
        log::info!("Reading {} selected files.", selected.len());
        let contents: HashMap<PathBuf, FileContent> =
            service::fetch_contents(&selected, &self.pool).into_iter().collect();
        self.pool.cancellation().check()?;

        let generated_at = self.options.include_timestamp.then(Local::now);
        Ok(assembler::assemble(
            session.current_view(),
            &contents,
            &self.options.instructions,
            generated_at,
        ))
    }

    pub fn run(&self) -> Result<PipelineOutput> {
        let (session, rejected_patterns) = self.build_session()?;
        let package = self.assemble(&session)?;
        let chunks = match self.options.target_lines {
            Some(target) => Some(chunking::pack(&package, target)?),
            None => None,
        };
        Ok(PipelineOutput {
            session,
            package,
            chunks,
            rejected_patterns,
        })
    }
}
