mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, FilterOpts, FormatOutputOpts, ProjectConfigOpts};
use ctxpack_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::PathNotFound(_)) => 2,
        Some(AppError::PathNotAccessible { .. }) => 2,
        Some(AppError::ReadError { .. }) => 2,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::WalkDir(_)) => 2,
        Some(AppError::Chunking(_)) => 3,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::FilterMisconfiguration { .. }) => 5,
        Some(AppError::DurationParse(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(AppError::Cancelled) => 7,
        Some(AppError::Timeout { .. }) => 7,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::List(args) => {
                log::debug!("Executing 'list' command...");
                commands::list::handle_list_command(args)?;
            }
            Commands::Metadata(args) => {
                log::debug!("Executing 'metadata' command...");
                commands::metadata::handle_metadata_command(args)?;
            }
            Commands::Contents(args) => {
                log::debug!("Executing 'contents' command...");
                commands::contents::handle_contents_command(args)?;
            }
            Commands::Pack(args) => {
                log::debug!("Executing 'pack' command...");
                commands::pack::handle_pack_command(args, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

pub fn determine_root(project_opts: &ProjectConfigOpts) -> Result<PathBuf> {
    let root = Config::determine_project_root(project_opts.root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", root.display());
    Ok(root)
}

/// Loads the config for `project_root` and applies the shared CLI overrides.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    filters: Option<&FilterOpts>,
    format_override: Option<&FormatOutputOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config.as_ref(),
        project_opts.no_config,
    )
    .context("Failed to resolve configuration path")?;

    let mut config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(filters) = filters {
        merge_filter_overrides(&mut config, filters);
    }
    if let Some(fmt_opts) = format_override {
        if let Some(format) = &fmt_opts.format {
            config.output.format = format.clone();
        }
        if fmt_opts.pretty {
            config.output.json_minify = false;
        }
    }
    Ok(config)
}

fn merge_filter_overrides(config: &mut Config, filters: &FilterOpts) {
    log::trace!("Applying filter CLI overrides to config...");
    if !filters.extensions.is_empty() {
        config.filters.extensions = filters.extensions.clone();
    }
    if !filters.ignored_folders.is_empty() {
        config.filters.ignored_folders = filters.ignored_folders.clone();
    }
    if !filters.wildcards.is_empty() {
        config.filters.wildcards = filters.wildcards.clone();
    }
    if let Some(search) = &filters.search {
        config.filters.search = search.clone();
    }
}
