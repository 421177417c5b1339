use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use ctxpack_core::{SortDirection, SortField};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Directory to scan (default: $CTXPACK_ROOT or current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub root: Option<PathBuf>,

    #[arg(
        long,
        help = "Path of the TOML config file (default: .ctxpack/ctxpack.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Pretty-print JSON output (compact by default).",
        help_heading = "Output Formatting"
    )]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(short = 'e', long = "ext", value_name = "EXT", action = clap::ArgAction::Append, help = "Only include these extensions (cs, .cs, *.cs; comma separated).", help_heading = "Filtering")]
    pub extensions: Vec<String>,

    #[arg(long = "ignore-folder", value_name = "FOLDER", action = clap::ArgAction::Append, help = "Skip files below a folder with this name.", help_heading = "Filtering")]
    pub ignored_folders: Vec<String>,

    #[arg(short = 'w', long = "wildcard", value_name = "PATTERN", action = clap::ArgAction::Append, help = "Glob pattern on the relative path; ';' separates several.", help_heading = "Filtering")]
    pub wildcards: Vec<String>,

    #[arg(
        long,
        value_name = "TEXT",
        help = "Case-insensitive substring of the relative path.",
        help_heading = "Filtering"
    )]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortFieldArg {
    Name,
    Lines,
    Chars,
}

impl From<SortFieldArg> for SortField {
    fn from(arg: SortFieldArg) -> Self {
        match arg {
            SortFieldArg::Name => SortField::Name,
            SortFieldArg::Lines => SortField::LineCount,
            SortFieldArg::Chars => SortField::CharCount,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SortOpts {
    #[arg(long, value_enum, value_name = "FIELD", help = "Sort files by name, lines or chars.", help_heading = "Ordering")]
    pub sort: Option<SortFieldArg>,

    #[arg(long, help = "Sort in descending order.", help_heading = "Ordering")]
    pub desc: bool,
}

impl SortOpts {
    pub fn direction(&self) -> Option<SortDirection> {
        self.desc.then_some(SortDirection::Descending)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionOpts {
    #[arg(short = 's', long = "select", value_name = "SUFFIX", action = clap::ArgAction::Append, help = "Select files whose path ends with SUFFIX (case-insensitive).", help_heading = "Selection")]
    pub select: Vec<String>,

    #[arg(
        long,
        help = "Select every file that passes the filters.",
        help_heading = "Selection"
    )]
    pub select_all: bool,

    #[arg(
        long,
        help = "Do not auto-select the configured default suffixes.",
        help_heading = "Selection"
    )]
    pub no_defaults: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstructionOpts {
    #[arg(long, value_name = "TEXT", help = "Instructions placed before the files.", help_heading = "Instructions")]
    pub top: Option<String>,

    #[arg(long, value_name = "TEXT", help = "Instructions placed after everything else.", help_heading = "Instructions")]
    pub bottom: Option<String>,

    #[arg(short = 'p', long = "phrase", value_name = "ID", action = clap::ArgAction::Append, help = "Enable a configured common phrase by id.", help_heading = "Instructions")]
    pub phrases: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pack selected project files into LLM-ready context chunks.",
    long_about = "ctxpack scans a project, filters and selects files, measures them \nand packs selected contents plus metadata for the rest into line-bounded chunks.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  ctxpack list -e cs\n  ctxpack metadata --sort lines --desc\n  ctxpack pack -s program.cs --target-lines 400 --save\n  ctxpack config",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(visible_alias = "ls", about = "List the files found below the root.")]
    List(ListArgs),

    #[command(
        visible_alias = "m",
        about = "Show line and character counts per file."
    )]
    Metadata(MetadataArgs),

    #[command(visible_alias = "c", about = "Print the content of the given files.")]
    Contents(ContentsArgs),

    #[command(
        visible_alias = "p",
        about = "Assemble the context package and split it into chunks."
    )]
    Pack(PackArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub sort: SortOpts,

    #[arg(value_name = "PATHS", help = "Files to measure (default: every file below the root).")]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ContentsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(required = true, value_name = "PATHS", help = "Files to read.")]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub sort: SortOpts,
    #[clap(flatten)]
    pub instructions: InstructionOpts,

    #[arg(
        short = 't',
        long,
        value_name = "LINES",
        help = "Split the package into chunks of at most LINES lines.",
        help_heading = "Output Control"
    )]
    pub target_lines: Option<usize>,

    #[arg(
        long, value_name = "SAVE_DIR",
        num_args = 0..=1,
        help_heading = "Output Control",
        help = "Save package or chunk files. Optional SAVE_DIR overrides the configured output dir.",
    )]
    pub save: Option<Option<PathBuf>>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Base name of saved files (default: root directory name).",
        help_heading = "Output Control"
    )]
    pub name: Option<String>,

    #[arg(
        long,
        help = "Add a generation timestamp to the package header.",
        help_heading = "Output Control"
    )]
    pub timestamp: bool,

    #[arg(
        long,
        help = "Print a totals summary to stderr after packing.",
        help_heading = "Output Control"
    )]
    pub summary: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_enum,
        value_name = "SHELL",
        help = "Shell to generate completions for [default: fish]"
    )]
    pub shell: Option<Shell>,
    #[arg(long, help = "Save completion script to the shell's default location.")]
    pub save: bool,
    #[arg(long, requires = "save", help = "Overwrite an existing completion file.")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        long,
        help = "Save default config to <root>/.ctxpack/ctxpack.toml."
    )]
    pub save: bool,

    #[arg(long, requires = "save", help = "Overwrite an existing config file.")]
    pub force: bool,

    #[arg(
        long,
        help = "Print the effective config (file plus defaults) instead of the defaults."
    )]
    pub effective: bool,
}
