//! Lineage CLI - Command-line interface for Lineage
//!
//! This is the main entry point for users exploring the academic
//! genealogy. It provides commands for indexing the dataset, querying
//! people and lineages, recording corrections and serving the graph.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "lineage")]
#[command(author = "Lineage Contributors")]
#[command(version)]
#[command(about = "Explore academic advisor genealogies", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory holding .lineage/ (defaults to current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Lineage in the project directory
    Init,

    /// Build the graph from the dataset and store a snapshot
    Index {
        /// Rebuild even if a snapshot exists
        #[arg(short, long)]
        force: bool,
    },

    /// Search people by name or institution
    Search {
        /// Search query
        query: String,

        /// Match institutions instead of names
        #[arg(short, long)]
        institution: bool,

        /// Maximum results to return
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show a person's dissertations, advisors and students
    Person {
        /// Person id
        id: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show a person's descendant or ancestor tree
    Lineage {
        /// Person id
        id: String,

        /// Walk up to advisors instead of down to students
        #[arg(short, long)]
        ancestors: bool,

        /// Maximum generations (0 for the maximum; defaults to config)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show descendant statistics for a person
    Stats {
        /// Person id
        id: String,
    },

    /// Record a correction for later review
    Correct {
        /// Your name
        #[arg(long)]
        submitter: String,

        /// Id of the person to correct; omit to propose a new person
        #[arg(long)]
        record: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        years: Option<String>,

        #[arg(long)]
        school: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        year: Option<String>,
    },

    /// Show index status and statistics
    Status,

    /// Start the Lineage server
    Serve {
        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Headless mode: bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = run(cli.command, &cli.root).await;

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, root: &Path) -> commands::Result<()> {
    let load = || Config::load(root);

    match command {
        Commands::Init => commands::init(root),
        Commands::Index { force } => commands::index(&load()?, force),
        Commands::Search {
            query,
            institution,
            limit,
        } => commands::search(&load()?, &query, institution, limit),
        Commands::Person { id, json } => commands::person(&load()?, &id, json),
        Commands::Lineage {
            id,
            ancestors,
            depth,
            json,
        } => commands::lineage(&load()?, &id, ancestors, depth, json),
        Commands::Stats { id } => commands::stats(&load()?, &id),
        Commands::Correct {
            submitter,
            record,
            name,
            years,
            school,
            department,
            title,
            year,
        } => commands::correct(
            &load()?,
            submitter,
            record,
            lineage_core::CorrectionDetails {
                person_name: name,
                years,
                school,
                department,
                title,
                year,
            },
        ),
        Commands::Status => commands::status(root),
        Commands::Serve { port, headless } => commands::serve(&load()?, port, headless).await,
    }
}
