use crate::cli_args::ContentsArgs;
use crate::output::print_data_or_text;
use crate::{determine_root, load_config_for_command};
use anyhow::{Context, Result};
use ctxpack_core::{CancellationToken, PoolOptions, WorkerPool, get_contents};
use std::path::PathBuf;

pub fn handle_contents_command(args: ContentsArgs) -> Result<()> {
    let project_root = determine_root(&args.project_config)?;
    let mut config = load_config_for_command(&project_root, &args.project_config, None, None)
        .context("Failed to load configuration for contents command")?;
    // Structured output unless a format was asked for explicitly.
    config.output.format = args
        .format_output
        .format
        .clone()
        .unwrap_or_else(|| "json".to_string());

    let paths: Vec<PathBuf> = args.paths.iter().map(|p| project_root.join(p)).collect();
    let pool = WorkerPool::new(PoolOptions::from_config(&config)?, CancellationToken::new())?;
    let results = get_contents(&paths, &pool);

    let plain: String = results
        .iter()
        .map(|(path, result)| match (&result.content, &result.error) {
            (Some(content), _) => format!("==> {} <==\n{}\n", path, content),
            (None, Some(error)) => format!("==> {} <==\n[error: {}]\n", path, error),
            (None, None) => format!("==> {} <==\n[binary]\n", path),
        })
        .collect();

    print_data_or_text(
        &results,
        Some(plain),
        &config.output.format,
        args.format_output.pretty || !config.output.json_minify,
    )
}
