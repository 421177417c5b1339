use crate::cli_args::MetadataArgs;
use crate::output::{print_data_or_text, print_metadata_table};
use crate::{determine_root, load_config_for_command};
use anyhow::{Context, Result};
use ctxpack_core::filter::{self, CompiledFilter};
use ctxpack_core::service::fetch_metrics;
use ctxpack_core::{
    CancellationToken, FileEntry, MetadataResult, MetricsCache, PoolOptions, ScanOptions, Session,
    WorkerPool, scan,
};
use indexmap::IndexMap;
use log;
use std::fs;
use std::sync::Arc;

pub fn handle_metadata_command(args: MetadataArgs) -> Result<()> {
    let project_root = determine_root(&args.project_config)?;
    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.filters),
        Some(&args.format_output),
    )
    .context("Failed to load configuration for metadata command")?;
    let cancel = CancellationToken::new();

    let entries = if args.paths.is_empty() {
        let scanned = scan(&project_root, &ScanOptions::from(&config.scan), &cancel)
            .with_context(|| format!("Failed to scan {}", project_root.display()))?;
        filter::apply_compiled(&scanned, &CompiledFilter::new(&config.filter_criteria()))
    } else {
        args.paths
            .iter()
            .map(|p| {
                let full_path = project_root.join(p);
                let size = fs::metadata(&full_path).map(|m| m.len()).unwrap_or(0);
                FileEntry::new(&project_root, full_path, size)
            })
            .collect()
    };

    let mut session = Session::new(project_root.clone(), entries, config.severity_thresholds());
    let pool = WorkerPool::new(PoolOptions::from_config(&config)?, cancel)?;
    let cache = Arc::new(MetricsCache::new(config.get_cache_ttl()?));
    let paths = session.pending_paths();
    log::info!("Measuring {} files.", paths.len());
    for (path, outcome) in fetch_metrics(&paths, &pool, &cache) {
        session.record_metrics(&path, outcome)?;
    }

    let field = args
        .sort
        .sort
        .map(Into::into)
        .unwrap_or(config.selection.sort_field);
    let direction = args
        .sort
        .direction()
        .unwrap_or(config.selection.sort_direction);
    session.set_sort_order(field, direction);

    if config.output.format.eq_ignore_ascii_case("text") {
        print_metadata_table(session.current_view(), session.thresholds());
        return Ok(());
    }

    let results: IndexMap<String, MetadataResult> = session
        .current_view()
        .iter()
        .map(|e| (e.full_path.display().to_string(), MetadataResult::from(&e.metrics)))
        .collect();
    print_data_or_text(
        &results,
        None,
        &config.output.format,
        !config.output.json_minify,
    )
}
