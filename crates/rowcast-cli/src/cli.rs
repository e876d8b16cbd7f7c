//! CLI argument definitions using clap.

use clap::{ArgAction, Parser, Subcommand};
use rowcast::{InputFormat, OutputFormat};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Rowcast: declarative record casting
#[derive(Parser)]
#[command(name = "rowcast")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a rules file to a record file
    Apply {
        /// Path to the records (JSON, JSON Lines, CSV/TSV)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the rules file
        #[arg(short, long)]
        rules: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: json, jsonl or csv (default: from --output, else json)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Input format: json, jsonl or csv (default: from the file extension)
        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Emit every allowed field, even when missing from a record
        #[arg(long)]
        all_fields: bool,

        /// Wrap the output in a {"total", "list"} envelope (JSON only)
        #[arg(long)]
        paginate: bool,

        /// Number of records cast per chunk
        #[arg(long, default_value = "1000")]
        chunk_size: usize,

        /// Delimiter for CSV/TSV input (default: auto-detect)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// CSV/TSV input has no header row
        #[arg(long)]
        no_header: bool,
    },

    /// Validate a rules file and summarize it
    Check {
        /// Path to the rules file
        #[arg(value_name = "RULES")]
        rules: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
