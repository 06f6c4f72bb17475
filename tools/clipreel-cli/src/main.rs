//! Clipreel CLI: build bounded-length clip compilations.
//!
//! Usage:
//!   clipreel assemble [CLIPS...]   Assemble a compilation from local clips
//!   clipreel title <TEMPLATE>      Preview title bumper substitution
//!   clipreel check                 Check ffmpeg availability
//!   clipreel clean [DIR]           Delete downloaded temp clips
//!   clipreel counter               Show or bump the compilation counter

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clipreel_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipreel",
    about = "Assemble clip compilations with title bumpers and crossfades",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/clipreel/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a compilation from local clip files
    Assemble(commands::assemble::AssembleArgs),

    /// Preview a title bumper template
    Title {
        /// Template with {X}, {GAME_NAME} or {GAME_NAME_PREFIX}
        template: String,

        /// Compilation number (defaults to the next counter value)
        #[arg(short, long)]
        number: Option<u64>,

        /// Game name
        #[arg(short, long)]
        game: Option<String>,
    },

    /// Check system capabilities
    Check,

    /// Delete files in the temp clip directory
    Clean {
        /// Directory to clear (defaults to the configured temp dir)
        dir: Option<PathBuf>,
    },

    /// Show the compilation counter
    Counter {
        /// Increment the counter and print the new value
        #[arg(long)]
        increment: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipreel_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Assemble(args) => commands::assemble::run(config, args).await,
        Commands::Title {
            template,
            number,
            game,
        } => commands::title::run(&config, template, number, game),
        Commands::Check => commands::check::run(&config),
        Commands::Clean { dir } => commands::clean::run(&config, dir),
        Commands::Counter { increment } => commands::counter::run(&config, increment),
    }
}
