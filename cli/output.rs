use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use ctxpack_core::output_formats;
use ctxpack_core::{FileEntry, MetricsState, SessionSummary, SeverityBand, SeverityThresholds};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Prints `data` as JSON or YAML, or `plain_text` when the format is `text`.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format: &str,
    pretty_json: bool,
) -> Result<()> {
    if format.eq_ignore_ascii_case("text") {
        match plain_text {
            Some(text) => write_to_stdout(&text),
            None => write_to_stdout(&serialize_output(data, "json", true)?),
        }
    } else {
        write_to_stdout(&serialize_output(data, format, pretty_json)?)
    }
}

fn serialize_output<T: Serialize>(data: &T, format: &str, pretty_json: bool) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => output_formats::serialize_to_yaml(data).map_err(anyhow::Error::from),
        _ => output_formats::serialize_to_json(data, pretty_json).map_err(anyhow::Error::from),
    }
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn readable_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

fn band_color(band: SeverityBand) -> Color {
    match band {
        SeverityBand::Low => Color::Green,
        SeverityBand::Medium => Color::Yellow,
        SeverityBand::High => Color::DarkYellow,
        SeverityBand::Critical => Color::Red,
    }
}

pub fn print_metadata_table(entries: &[FileEntry], thresholds: &SeverityThresholds) {
    if entries.is_empty() {
        println!("{}", "(No files matched)".yellow());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Lines").fg(Color::Green),
        Cell::new("Chars").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
        Cell::new("Band").fg(Color::Green),
    ]);
    for entry in entries {
        let (lines, chars, band) = match &entry.metrics {
            MetricsState::Computed(m) if m.binary => {
                ("binary".to_string(), "-".to_string(), Cell::new("-"))
            }
            MetricsState::Computed(m) => {
                let band = thresholds.classify(m.line_count);
                (
                    m.line_count.to_string(),
                    m.char_count.to_string(),
                    Cell::new(format!("{:?}", band)).fg(band_color(band)),
                )
            }
            MetricsState::Failed { error } => {
                (format!("error: {}", error), "-".to_string(), Cell::new("-"))
            }
            MetricsState::Pending => ("-".to_string(), "-".to_string(), Cell::new("-")),
        };
        table.add_row(vec![
            Cell::new(&entry.relative_path).fg(Color::Cyan),
            Cell::new(lines).set_alignment(CellAlignment::Right),
            Cell::new(chars).set_alignment(CellAlignment::Right),
            Cell::new(readable_size(entry.size_bytes))
                .set_alignment(CellAlignment::Right)
                .fg(Color::DarkGrey),
            band,
        ]);
    }
    println!("{table}");
}

/// Totals go to stderr so they never mix with a package written to stdout.
pub fn print_summary(summary: &SessionSummary, chunk_count: Option<usize>) {
    eprintln!();
    eprintln!("{}", " Package Summary ".green().bold().underline());
    eprintln!(
        "{:<20} {} ({} selected)",
        "Files:".green(),
        summary.total_files.to_string().cyan(),
        summary.selected_files.to_string().cyan()
    );
    eprintln!(
        "{:<20} {} ({} selected)",
        "Lines:".green(),
        summary.total_lines.to_string().cyan(),
        summary.selected_lines.to_string().cyan()
    );
    eprintln!(
        "{:<20} {} ({} selected)",
        "Chars:".green(),
        summary.total_chars.to_string().cyan(),
        summary.selected_chars.to_string().cyan()
    );
    if summary.binary_files > 0 || summary.failed_files > 0 {
        eprintln!(
            "{:<20} {} binary, {} failed",
            "Skipped:".green(),
            summary.binary_files.to_string().yellow(),
            summary.failed_files.to_string().red()
        );
    }
    let bands: Vec<String> = summary
        .severity_bands
        .iter()
        .map(|(band, count)| format!("{:?}: {}", band, count))
        .collect();
    if !bands.is_empty() {
        eprintln!("{:<20} {}", "Severity:".green(), bands.join(", "));
    }
    if let Some(count) = chunk_count {
        eprintln!("{:<20} {}", "Chunks:".green(), count.to_string().cyan());
    }
    eprintln!();
}
