use crate::assembler::{Block, Package};
use crate::error::{AppError, Result};
use log;
#[cfg(feature = "serde_support")]
use serde::Serialize;

/// Lines `Chunk::render` puts before the body.
pub const HEADER_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct ChunkInfo {
    pub current_part: usize,
    pub total_parts: usize,
}

impl ChunkInfo {
    pub fn header(&self) -> String {
        format!("Chunk {} of {}", self.current_part, self.total_parts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct Chunk {
    pub chunk_info: ChunkInfo,
    pub blocks: Vec<Block>,
}

impl Chunk {
    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| b.line_count).sum()
    }

    /// Single block larger than the target on its own.
    pub fn is_oversized(&self, target_lines: usize) -> bool {
        self.blocks.len() == 1 && self.line_count() > target_lines
    }

    /// Block texts only. Concatenating every body in order yields the package.
    pub fn body(&self) -> String {
        self.blocks.iter().map(|b| b.text.as_str()).collect()
    }

    /// Body preceded by the `Chunk K of N` header line and a blank line.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.chunk_info.header(), self.body())
    }
}

/// Greedy in-order packing of the package blocks into chunks of at most
/// `target_lines` lines. Blocks are never split; a block larger than the
/// target gets a chunk of its own. The bound applies to the chunk body;
/// `Chunk::render` adds `HEADER_LINES` on top of it.
pub fn pack(package: &Package, target_lines: usize) -> Result<Vec<Chunk>> {
    if target_lines == 0 {
        return Err(AppError::Chunking(
            "Target lines per chunk must be greater than 0".to_string(),
        ));
    }

    let mut chunks_data: Vec<Vec<Block>> = Vec::new();
    let mut current_blocks: Vec<Block> = Vec::new();
    let mut current_lines: usize = 0;

    for block in &package.blocks {
        let block_lines = block.line_count;

        if block_lines > target_lines {
            log::trace!(
                "{:?} block ({} lines) exceeds target ({}), putting in its own chunk.",
                block.kind,
                block_lines,
                target_lines
            );
            if !current_blocks.is_empty() {
                chunks_data.push(std::mem::take(&mut current_blocks));
                current_lines = 0;
            }
            chunks_data.push(vec![block.clone()]);
            continue;
        }

        if !current_blocks.is_empty() && current_lines.saturating_add(block_lines) > target_lines {
            chunks_data.push(std::mem::take(&mut current_blocks));
            current_blocks = vec![block.clone()];
            current_lines = block_lines;
        } else {
            current_lines = current_lines.saturating_add(block_lines);
            current_blocks.push(block.clone());
        }
    }

    if !current_blocks.is_empty() {
        chunks_data.push(current_blocks);
    }

    let total_parts = chunks_data.len();
    log::info!(
        "Split package ({} lines) into {} chunks of at most {} lines.",
        package.line_count(),
        total_parts,
        target_lines
    );

    Ok(chunks_data
        .into_iter()
        .enumerate()
        .map(|(i, blocks)| Chunk {
            chunk_info: ChunkInfo {
                current_part: i + 1,
                total_parts,
            },
            blocks,
        })
        .collect())
}
