//! CLI frontend for the Hexweave tiling engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hw",
    about = "Hexweave: constraint-driven hex world generation",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog and print what it defines
    Check {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Also validate a world snapshot JSON file against the catalog
        #[arg(short, long)]
        world: Option<PathBuf>,
    },

    /// Generate a world with the built-in seeded oracle
    Generate {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Stop expanding once the world holds this many tiles
        #[arg(short = 'n', long, default_value = "40")]
        max_tiles: usize,

        /// Expansion rounds before giving up (at most 50)
        #[arg(long, default_value = "50")]
        max_iterations: usize,

        /// RNG seed for deterministic generation
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Plan or theme text passed to the oracle
        #[arg(short, long)]
        plan: Option<String>,

        /// Score options by exact edge matches
        #[arg(long)]
        diagnostics: bool,

        /// Print the final world snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Show every progress event
        #[arg(short, long)]
        verbose: bool,

        /// Print the oracle journal as markdown after the summary
        #[arg(long)]
        journal: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { catalog, world } => commands::check::run(&catalog, world.as_deref()),
        Commands::Generate {
            catalog,
            max_tiles,
            max_iterations,
            seed,
            plan,
            diagnostics,
            json,
            verbose,
            journal,
        } => commands::generate::run(
            &catalog,
            commands::generate::Options {
                max_tiles,
                max_iterations,
                seed,
                plan: plan.unwrap_or_default(),
                diagnostics,
                json,
                verbose,
                journal,
            },
        ),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
