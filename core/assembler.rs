use crate::error::AppError;
use crate::metrics::{FileText, count_lines};
use crate::scanner::{FileEntry, MetricsState};
use chrono::{DateTime, Local};
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

pub const PACKAGE_TITLE: &str = "# CONTEXT PACKAGE";
pub const UNSELECTED_HEADER: &str = "# UNSELECTED FILES";
pub const FILE_START: &str = "=====================FILE-START==================";
pub const FILE_END: &str = "----------------------FILE-END-------------------";
pub const BINARY_PLACEHOLDER: &str = "[BINARY FILE - CONTENT SKIPPED]";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct CommonPhrase {
    pub id: String,
    pub text: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct InstructionSet {
    pub top: String,
    pub bottom: String,
    /// Rendered in declaration order when enabled.
    pub phrases: Vec<CommonPhrase>,
}

impl InstructionSet {
    pub fn enabled_phrases(&self) -> impl Iterator<Item = &CommonPhrase> {
        self.phrases.iter().filter(|p| p.enabled)
    }
}

/// Content of one selected file as handed to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase", tag = "kind"))]
pub enum FileContent {
    Text { text: String },
    Binary { byte_len: usize },
    Error { message: String },
}

impl From<FileText> for FileContent {
    fn from(text: FileText) -> Self {
        match text {
            FileText::Text(text) => FileContent::Text { text },
            FileText::Binary { byte_len } => FileContent::Binary { byte_len },
        }
    }
}

impl From<Result<FileText, AppError>> for FileContent {
    fn from(result: Result<FileText, AppError>) -> Self {
        match result {
            Ok(text) => text.into(),
            Err(e) => FileContent::Error {
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub enum BlockKind {
    Header,
    File,
    Metadata,
    Footer,
}

/// Unit of packing. Text always ends with a line terminator, so block line
/// counts add up to the line count of the concatenated package.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub line_count: usize,
}

impl Block {
    pub fn new(kind: BlockKind, mut text: String) -> Self {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let line_count = count_lines(&text);
        Self {
            kind,
            text,
            line_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct Package {
    pub blocks: Vec<Block>,
    pub selected_count: usize,
    pub unselected_count: usize,
}

impl Package {
    pub fn text(&self) -> String {
        self.blocks.iter().map(|b| b.text.as_str()).collect()
    }

    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| b.line_count).sum()
    }
}

/// Builds the package for `view` in its given order. Selected entries are
/// rendered from `contents`; a selected entry missing there gets an error marker.
pub fn assemble(
    view: &[FileEntry],
    contents: &HashMap<PathBuf, FileContent>,
    instructions: &InstructionSet,
    generated_at: Option<DateTime<Local>>,
) -> Package {
    let (selected, unselected): (Vec<&FileEntry>, Vec<&FileEntry>) =
        view.iter().partition(|e| e.is_selected);
    log::debug!(
        "Assembling package: {} selected, {} unselected.",
        selected.len(),
        unselected.len()
    );

    let mut blocks = Vec::with_capacity(selected.len() + 4);
    blocks.push(header_block(
        selected.len(),
        unselected.len(),
        instructions,
        generated_at,
    ));

    for entry in &selected {
        blocks.push(file_block(entry, contents.get(&entry.full_path)));
    }

    if !unselected.is_empty() {
        blocks.push(metadata_block(&unselected));
    }

    if !instructions.bottom.is_empty() {
        blocks.push(Block::new(BlockKind::Footer, instructions.bottom.clone()));
    }

    Package {
        blocks,
        selected_count: selected.len(),
        unselected_count: unselected.len(),
    }
}

// Title, counts, top instructions and enabled phrases form one block so a
// chunk boundary never falls inside the preamble.
fn header_block(
    selected: usize,
    unselected: usize,
    instructions: &InstructionSet,
    generated_at: Option<DateTime<Local>>,
) -> Block {
    let mut text = String::new();
    text.push_str(PACKAGE_TITLE);
    text.push('\n');
    if let Some(ts) = generated_at {
        let _ = writeln!(text, "# Generated: {}", ts.format("%Y-%m-%d %H:%M:%S"));
    }
    let _ = writeln!(
        text,
        "# Selected files: {} | Unselected files: {}",
        selected, unselected
    );
    text.push('\n');
    push_paragraph(&mut text, &instructions.top);
    for phrase in instructions.enabled_phrases() {
        push_paragraph(&mut text, phrase.text.trim());
    }
    Block::new(BlockKind::Header, text)
}

// Appends `body` unchanged, terminated, followed by a blank line.
fn push_paragraph(text: &mut String, body: &str) {
    if body.is_empty() {
        return;
    }
    text.push_str(body);
    if !body.ends_with('\n') {
        text.push('\n');
    }
    text.push('\n');
}

fn file_block(entry: &FileEntry, content: Option<&FileContent>) -> Block {
    let mut text = String::new();
    text.push_str(&entry.relative_path);
    text.push('\n');
    text.push_str(FILE_START);
    text.push('\n');
    match content {
        Some(FileContent::Text { text: body }) => {
            text.push_str(body);
            if !body.is_empty() && !body.ends_with('\n') {
                text.push('\n');
            }
        }
        Some(FileContent::Binary { .. }) => {
            text.push_str(BINARY_PLACEHOLDER);
            text.push('\n');
        }
        Some(FileContent::Error { message }) => {
            let _ = writeln!(text, "[ERROR READING FILE: {}]", message);
        }
        None => {
            log::warn!("No content loaded for selected file {}", entry.full_path.display());
            text.push_str("[ERROR READING FILE: content not loaded]\n");
        }
    }
    text.push_str(FILE_END);
    text.push_str("\n\n");
    Block::new(BlockKind::File, text)
}

fn metadata_block(unselected: &[&FileEntry]) -> Block {
    let mut text = String::new();
    text.push_str(UNSELECTED_HEADER);
    text.push('\n');
    for entry in unselected {
        let _ = match &entry.metrics {
            MetricsState::Computed(m) if m.binary => {
                writeln!(text, "{} | binary | bytes: {}", entry.relative_path, m.char_count)
            }
            MetricsState::Computed(m) => writeln!(
                text,
                "{} | lines: {} | chars: {}",
                entry.relative_path, m.line_count, m.char_count
            ),
            MetricsState::Failed { error } => {
                writeln!(text, "{} | error: {}", entry.relative_path, error)
            }
            MetricsState::Pending => writeln!(text, "{} | metrics pending", entry.relative_path),
        };
    }
    text.push('\n');
    Block::new(BlockKind::Metadata, text)
}
