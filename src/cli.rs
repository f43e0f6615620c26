use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anilib")]
#[command(author, version, about = "Anime library ingestion and browser-ready transcoding")]
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
    /// Start the HTTP API server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one library update and exit (Ctrl-C cancels)
    Scan,

    /// Remove catalog entries whose files are gone
    Sweep {
        /// Also delete source files of transcoded episodes
        #[arg(long)]
        delete_originals: bool,
    },

    /// Probe a video file and show whether it would be transcoded
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the catalog to a JSON file
    Export {
        /// Destination file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Load a JSON catalog file, skipping entries already present
    Import {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sweep_flags() {
        let cli = Cli::try_parse_from(["anilib", "-v", "sweep", "--delete-originals"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Sweep {
                delete_originals: true
            }
        ));
    }
}
