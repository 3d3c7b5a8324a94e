//! Mimeo CLI - ingest a creator's documents, recordings and captions.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Mimeo - build a searchable knowledge base and style profiles from a
/// creator's content
#[derive(Parser)]
#[command(name = "mimeo")]
#[command(version)]
#[command(about = "Creator content ingestion pipeline", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the platform default
    #[arg(short, long, global = true, env = "MIMEO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file, library directories and knowledge store
    Init,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show knowledge store contents and service availability
    Status,

    /// Ingest content into the knowledge store
    #[command(subcommand)]
    Ingest(IngestCommands),

    /// Build creator style profiles from recorded transcripts
    Profiles {
        /// Re-analyse creators that already have a profile
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Subcommand)]
enum IngestCommands {
    /// PDF and text documents under the documents root
    Documents,

    /// Recordings under the videos root, one directory per creator
    Transcripts,

    /// Captions for every video in the URL list
    Captions,

    /// Transcripts, documents, captions, then profiles
    All {
        /// Re-analyse creators that already have a profile
        #[arg(short, long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mimeo=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mimeo=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config),
            ConfigCommands::Path => commands::config::path(config),
        },
        Commands::Status => commands::status::run(config),
        Commands::Ingest(cmd) => match cmd {
            IngestCommands::Documents => commands::ingest::run(config, commands::ingest::Target::Documents),
            IngestCommands::Transcripts => commands::ingest::run(config, commands::ingest::Target::Transcripts),
            IngestCommands::Captions => commands::ingest::run(config, commands::ingest::Target::Captions),
            IngestCommands::All { force } => commands::ingest::run(config, commands::ingest::Target::All { force }),
        },
        Commands::Profiles { force } => commands::ingest::run(config, commands::ingest::Target::Profiles { force }),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
