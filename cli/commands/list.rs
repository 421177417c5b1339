use crate::cli_args::ListArgs;
use crate::output::print_data_or_text;
use crate::{determine_root, load_config_for_command};
use anyhow::{Context, Result};
use ctxpack_core::filter::{self, CompiledFilter};
use ctxpack_core::{CancellationToken, FileListing, ScanOptions, scan};
use log;

pub fn handle_list_command(args: ListArgs) -> Result<()> {
    let project_root = determine_root(&args.project_config)?;
    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.filters),
        Some(&args.format_output),
    )
    .context("Failed to load configuration for list command")?;

    let entries = scan(
        &project_root,
        &ScanOptions::from(&config.scan),
        &CancellationToken::new(),
    )
    .with_context(|| format!("Failed to list files under {}", project_root.display()))?;

    let compiled = CompiledFilter::new(&config.filter_criteria());
    let entries = filter::apply_compiled(&entries, &compiled);
    log::debug!("{} files after filtering.", entries.len());

    let listing: Vec<FileListing> = entries
        .iter()
        .map(|e| FileListing {
            file_name: e.display_name.clone(),
            full_path: e.full_path.clone(),
        })
        .collect();
    let plain: String = entries
        .iter()
        .map(|e| format!("{}\n", e.relative_path))
        .collect();

    print_data_or_text(
        &listing,
        Some(plain),
        &config.output.format,
        !config.output.json_minify,
    )
}
