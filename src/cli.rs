use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cinedex")]
#[command(author, version, about = "Media library scanner and catalog matcher")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan all configured sources and update the library
    Scan {
        /// Refresh metadata and ratings of everything already in the library
        #[arg(long)]
        force: bool,

        /// Print the scan summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List files that could not be matched against the catalog
    Unscanned,

    /// Display the movies and shows in the library
    Library {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
