use crate::cli_args::ConfigArgs;
use crate::output::{write_to_file, write_to_stdout};
use crate::{determine_root, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use ctxpack_core::AppError;
use ctxpack_core::Config;
use ctxpack_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let project_root = determine_root(&args.project_config)?;

    let config = if args.effective {
        load_config_for_command(&project_root, &args.project_config, None, None)?
    } else {
        Config::default()
    };
    let toml = config
        .to_toml_string()
        .context("Failed to serialize configuration")?;

    if !args.save {
        return write_to_stdout(&toml);
    }

    let save_path = project_root
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_CONFIG_FILENAME);
    if save_path.exists() && !args.force {
        anyhow::bail!(AppError::InvalidArgument(format!(
            "Config file '{}' already exists. Use --force to overwrite.",
            save_path.display()
        )));
    }
    write_to_file(&save_path, &toml)?;
    if !quiet {
        println!(
            "{} Config saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
