use crate::cli_args::PackArgs;
use crate::output::{print_summary, write_to_file, write_to_stdout};
use crate::{determine_root, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use ctxpack_core::output_formats::{chunk_file_name, package_file_name};
use ctxpack_core::{AppError, CancellationToken, Config, Pipeline, PipelineOptions};
use log;
use std::path::{Path, PathBuf};

pub fn handle_pack_command(args: PackArgs, quiet: bool) -> Result<()> {
    let project_root = determine_root(&args.project_config)?;
    let mut config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.filters),
        None,
    )
    .context("Failed to load configuration for pack command")?;
    apply_pack_overrides(&mut config, &args)?;

    let mut options = PipelineOptions::from_config(&config, project_root.clone())?;
    options.select = args.selection.select.clone();
    options.select_all = args.selection.select_all;

    let pipeline = Pipeline::new(options, CancellationToken::new())?;
    let output = pipeline.run().context("Failed to assemble context package")?;

    for rejected in &output.rejected_patterns {
        if !quiet {
            eprintln!("{} {}", "Warning:".yellow().bold(), rejected);
        }
    }

    let base = args
        .name
        .clone()
        .unwrap_or_else(|| config.get_effective_filename_base(&project_root));
    let save_dir = args
        .save
        .as_ref()
        .map(|dir| resolve_save_dir(&project_root, dir.as_ref(), &config));

    match (&output.chunks, &save_dir) {
        (Some(chunks), Some(dir)) => {
            for chunk in chunks {
                let path = dir.join(chunk_file_name(&base, &chunk.chunk_info));
                write_to_file(&path, &chunk.render())?;
                if !quiet {
                    println!(
                        "{} {} saved to: {}",
                        "📦".blue(),
                        chunk.chunk_info.header(),
                        path.display().to_string().dimmed()
                    );
                }
            }
        }
        (Some(chunks), None) => {
            let rendered: Vec<String> = chunks.iter().map(|c| c.render()).collect();
            write_to_stdout(&rendered.join("\n"))?;
        }
        (None, Some(dir)) => {
            let path = dir.join(package_file_name(&base));
            write_to_file(&path, &output.package.text())?;
            if !quiet {
                println!(
                    "{} Package saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        (None, None) => write_to_stdout(&output.package.text())?,
    }

    if args.summary {
        print_summary(
            &output.session.summary(),
            output.chunks.as_ref().map(|c| c.len()),
        );
    }
    Ok(())
}

fn apply_pack_overrides(config: &mut Config, args: &PackArgs) -> Result<()> {
    log::trace!("Applying pack command CLI overrides to config...");
    if args.selection.no_defaults {
        config.selection.apply_defaults = false;
    }
    if let Some(field) = args.sort.sort {
        config.selection.sort_field = field.into();
    }
    if let Some(direction) = args.sort.direction() {
        config.selection.sort_direction = direction;
    }
    if let Some(top) = &args.instructions.top {
        config.instructions.top = top.clone();
    }
    if let Some(bottom) = &args.instructions.bottom {
        config.instructions.bottom = bottom.clone();
    }
    let unknown = config.enable_phrases(&args.instructions.phrases);
    if !unknown.is_empty() {
        let known: Vec<&str> = config
            .instructions
            .phrases
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        anyhow::bail!(AppError::InvalidArgument(format!(
            "Unknown phrase id(s): {}. Known: {}",
            unknown.join(", "),
            known.join(", ")
        )));
    }
    if args.target_lines.is_some() {
        config.chunking.target_lines = args.target_lines;
    }
    if args.timestamp {
        config.output.include_timestamp = true;
    }
    Ok(())
}

fn resolve_save_dir(project_root: &Path, cli_dir: Option<&PathBuf>, config: &Config) -> PathBuf {
    let dir = cli_dir.cloned().unwrap_or_else(|| config.output.output_dir.clone());
    if dir.is_absolute() {
        dir
    } else {
        project_root.join(dir)
    }
}
