//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bookgraph - character-relationship graphs for books
#[derive(Parser)]
#[command(
    name = "bg",
    about = "Search books and generate character-relationship graphs with a local LLM",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute; the TUI starts when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up books by title and print the matches
    Search {
        /// Title or part of a title
        query: String,
    },

    /// Generate a character graph for a book and write it as SVG
    Generate {
        /// Book title
        title: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a local diagram file to sanitized SVG
    Render {
        /// Diagram description file
        file: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the system prompt sent to the model
    Prompt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["bg"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_generate_with_output() {
        let cli = Cli::try_parse_from(["bg", "-l", "debug", "generate", "Dune", "-o", "dune.svg"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Command::Generate { title, output }) => {
                assert_eq!(title, "Dune");
                assert_eq!(output, Some(PathBuf::from("dune.svg")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["bg", "search", "emma", "--config", "bg.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bg.yml")));
        assert!(matches!(cli.command, Some(Command::Search { query }) if query == "emma"));
    }
}
