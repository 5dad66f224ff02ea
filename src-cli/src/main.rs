//! castkit command-line interface
//!
//! Inspects the capability catalog and checks capture requests against the
//! same validator the capture service uses.

mod colors;
mod commands;
mod exit_codes;

use clap::{Parser, Subcommand};
use exit_codes::ExitCode;

/// castkit - screen and audio capture tooling
#[derive(Parser, Debug)]
#[command(name = "castkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a capture request file
    Validate {
        /// Path to a JSON request in wire format
        file: String,
    },
    /// List known sources, encoders and containers
    Catalog {
        #[command(subcommand)]
        kind: CatalogKind,
    },
    /// Show the effective service configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CatalogKind {
    /// Output container formats
    Containers,
    /// Audio encoders
    AudioEncoders,
    /// Video encoders
    VideoEncoders,
    /// Audio sources
    AudioSources,
    /// Video sources
    VideoSources,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = run(cli);
    std::process::exit(exit_code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Commands::Validate { file } => commands::validate_file(&file, cli.json, cli.quiet),
        Commands::Catalog { kind } => commands::catalog(kind, cli.json),
        Commands::Config { init } => commands::show_config(init, cli.json),
        Commands::Version => {
            commands::version(cli.json);
            ExitCode::Success
        }
    }
}
