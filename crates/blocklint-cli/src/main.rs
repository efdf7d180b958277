//! blocklint CLI tool.
//!
//! Usage:
//! ```bash
//! blocklint check [OPTIONS] <BLOCKS>
//! blocklint select <BLOCKS> <QUERY>
//! blocklint list-rules
//! blocklint init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Label, query and lint the blocks of an extracted document
#[derive(Parser)]
#[command(name = "blocklint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a block list
    Check {
        /// JSON array of extracted paragraphs and tables
        blocks: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Only report these issue codes (comma-separated)
        #[arg(long)]
        rules: Option<String>,
    },

    /// Classify a block list and print the blocks matching a selector
    Select {
        /// JSON array of extracted paragraphs and tables
        blocks: PathBuf,

        /// Selector, e.g. `.heading-intro + .body-intro`
        query: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List available rule types
    ListRules,

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for issues and selections.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One line per issue or block.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let source = || {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        config_resolver::resolve(&cwd, cli.config.as_deref())
    };

    match cli.command {
        Commands::Check {
            ref blocks,
            format,
            ref rules,
        } => commands::check::run(blocks, format, rules.as_deref(), &source()),
        Commands::Select {
            ref blocks,
            ref query,
            format,
        } => commands::select::run(blocks, query, format, &source()),
        Commands::ListRules => {
            commands::list_rules::run();
            Ok(())
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
