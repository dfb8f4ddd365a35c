use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand, ValueEnum};

use crate::canonical::options::MAX_COMPRESSION;
use crate::canonical::{ConvertOptions, EscapeMode, Limits};
use crate::pipeline::DiffStyle;
use crate::pool::{ExternalConverter, PoolConfig};
use crate::utils::default_workers;

#[derive(Parser)]
#[command(name = "profile-diff")]
#[command(version)]
#[command(about = "Canonicalize Quattor profiles and compare profile trees", long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert individual JSON profiles to canonical path = value text
    Convert(ConvertArgs),
    /// Convert every profile of two trees in parallel
    Translate(TranslateArgs),
    /// Translate two trees, diff them and summarize the differences
    Compare(CompareArgs),
}

/// Options shared by every command that canonicalizes documents
#[derive(Args, Debug, Clone)]
pub struct ConversionFlags {
    /// Escape path components (`_XX` for bytes outside [A-Za-z0-9_])
    #[arg(short = 'e', long, conflicts_with = "unescape")]
    pub escape: bool,

    /// Undo Quattor-style escaping in path components (heuristic)
    #[arg(short = 'u', long)]
    pub unescape: bool,

    /// Convert even if the output is newer than the input
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Do not emit lines for structural entries without a value
    #[arg(long)]
    pub hide_terminals: bool,

    /// Use `#` instead of list index numbers
    #[arg(short = 'I', long)]
    pub no_index: bool,

    /// Split values containing \n escapes into several lines
    #[arg(short = 'n', long)]
    pub multiline: bool,

    /// Repeat the resource path on continuation lines (implies --multiline)
    #[arg(short = 'p', long)]
    pub prefix_lines: bool,

    /// Suffix of canonical output files
    #[arg(short = 'O', long = "suffix", default_value = ".txt")]
    pub output_suffix: String,

    /// Input suffix replaced by the output suffix (repeatable)
    #[arg(short = 'R', long = "strip", default_values = [".json", ".xml"])]
    pub strip_suffixes: Vec<String>,

    /// Suffix of slice files
    #[arg(short = 'S', long, default_value = ".slice")]
    pub slice_suffix: String,

    /// Resource path to capture into the slice file (repeatable)
    #[arg(short = 's', long = "slice", value_name = "PATH")]
    pub slices: Vec<String>,

    /// Gzip compression level of canonical files, 0 for none
    #[arg(
        short = 'c',
        long = "compress",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(0..=MAX_COMPRESSION as i64)
    )]
    pub compression: u32,

    /// Reject values longer than this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_value_len: Option<usize>,
}

impl ConversionFlags {
    pub fn to_options(&self) -> ConvertOptions {
        let escape = if self.escape {
            EscapeMode::Escape
        } else if self.unescape {
            EscapeMode::Unescape
        } else {
            EscapeMode::None
        };
        ConvertOptions {
            escape,
            generate_indices: !self.no_index,
            show_terminals: !self.hide_terminals,
            multiline: self.multiline || self.prefix_lines,
            multiline_prefix: self.prefix_lines,
            output_suffix: self.output_suffix.clone(),
            strip_suffixes: self.strip_suffixes.clone(),
            slice_suffix: self.slice_suffix.clone(),
            compression: self.compression,
            slices: self.slices.clone(),
            force: self.force,
            limits: Limits { max_value_len: self.max_value_len, ..Limits::default() },
        }
    }
}

/// Worker pool options
#[derive(Args, Debug, Clone)]
pub struct PoolFlags {
    /// Number of parallel workers [default: CPU cores, or $PROFILE_DIFF_WORKERS]
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Do not show the progress line
    #[arg(long)]
    pub no_progress: bool,

    /// Program converting XML profiles to canonical text on stdout
    #[arg(long, value_name = "PROGRAM")]
    pub xml_converter: Option<PathBuf>,
}

impl PoolFlags {
    pub fn to_config(&self) -> PoolConfig {
        let workers = self.workers.map_or_else(default_workers, |w| w as usize);
        PoolConfig {
            workers,
            progress: !self.no_progress,
            xml_converter: self.xml_converter.as_ref().map(ExternalConverter::new),
            ..PoolConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub conversion: ConversionFlags,

    /// Write canonical files into this directory instead of next to the inputs
    #[arg(short = 'o', long, conflicts_with = "stdout")]
    pub output_dir: Option<PathBuf>,

    /// Write canonical text to stdout
    #[arg(long)]
    pub stdout: bool,

    /// Treat arguments as files listing profile paths, one per line
    #[arg(short = 'f', long)]
    pub file_list: bool,

    /// Profiles to convert (`-` reads stdin and writes stdout)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("destination").required(true).args(["in_place", "output_root"])))]
pub struct TranslateArgs {
    #[command(flatten)]
    pub conversion: ConversionFlags,

    #[command(flatten)]
    pub pool: PoolFlags,

    /// Write canonical files next to the source profiles
    #[arg(long)]
    pub in_place: bool,

    /// Write canonical trees to <ROOT>/left and <ROOT>/right
    #[arg(long, value_name = "ROOT")]
    pub output_root: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    pub dir1: PathBuf,
    pub dir2: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStyleArg {
    Gnu,
    Razor,
}

impl From<DiffStyleArg> for DiffStyle {
    fn from(style: DiffStyleArg) -> Self {
        match style {
            DiffStyleArg::Gnu => DiffStyle::Gnu,
            DiffStyleArg::Razor => DiffStyle::Razor,
        }
    }
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub conversion: ConversionFlags,

    #[command(flatten)]
    pub pool: PoolFlags,

    /// Compare the trees as they are, without translating
    #[arg(long, conflicts_with_all = ["in_place", "output_root"])]
    pub no_translate: bool,

    /// Write canonical files next to the source profiles
    #[arg(long, conflicts_with = "output_root")]
    pub in_place: bool,

    /// Keep canonical trees under <ROOT>/left and <ROOT>/right for later runs
    #[arg(long, value_name = "ROOT")]
    pub output_root: Option<PathBuf>,

    /// Resource path of the personality name, summarized per changed profile
    #[arg(long, value_name = "PATH")]
    pub personality: Option<String>,

    /// List the names of changed personalities in the summary
    #[arg(long, requires = "personality")]
    pub list_personalities: bool,

    /// Diff program [default: `diff` or `razor`, per --diff-style]
    #[arg(long, value_name = "PROGRAM")]
    pub diff_command: Option<PathBuf>,

    /// Command line flavour of the diff program
    #[arg(long, value_enum, default_value_t = DiffStyleArg::Gnu)]
    pub diff_style: DiffStyleArg,

    /// Lines of context around each change
    #[arg(short = 'U', long, default_value_t = 3)]
    pub context: u32,

    /// Filter collapsing duplicate hunks (diff on stdin, result on stdout)
    #[arg(long, value_name = "PROGRAM")]
    pub distill_command: Option<PathBuf>,

    /// Filter the final report is piped through for coloring
    #[arg(long, value_name = "PROGRAM")]
    pub colorize: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    pub dir1: PathBuf,
    pub dir2: PathBuf,
}
