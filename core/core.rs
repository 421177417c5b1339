pub mod assembler;
pub mod chunking;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod output_formats;
pub mod pipeline;
pub mod pool;
pub mod scanner;
pub mod selection;
pub mod service;

pub use assembler::{Block, BlockKind, CommonPhrase, FileContent, InstructionSet, Package, assemble};
pub use chunking::{Chunk, ChunkInfo, pack};
pub use config::Config;
pub use error::{AppError, Result};
pub use filter::{CompiledFilter, FilterCriteria};
pub use metrics::{FileMetrics, FileText, MetricsCache, SeverityBand, SeverityThresholds, compute_metrics};
pub use pipeline::{Pipeline, PipelineOptions, PipelineOutput};
pub use pool::{CancellationToken, PoolOptions, WorkerPool};
pub use scanner::{FileEntry, MetricsState, ScanOptions, scan};
pub use selection::{Session, SessionSummary, SortDirection, SortField};
pub use service::{ContentResult, FileListing, MetadataResult, get_contents, get_metadata, list_files};
