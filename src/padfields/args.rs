use clap::{Parser, Subcommand};
use padfields::ProcessingMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "padfields", version)]
#[command(about = "Expand dynamic fields in plain text notes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Notes directory (defaults to $PADFIELDS_HOME or the platform data dir)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expand every placeholder and print the result
    #[command(alias = "x")]
    Expand {
        /// File path, "-" for stdin, or @<note-id>
        input: String,

        /// interactive, preview, edit, recursive or fast
        #[arg(short, long, default_value = "fast")]
        mode: ProcessingMode,

        /// Fill a field: KEY is its id, label, or 1-based position
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Override the configured snippet depth limit
        #[arg(long)]
        max_depth: Option<usize>,

        /// Copy the result to the clipboard as well
        #[arg(short, long)]
        copy: bool,
    },

    /// List the fields of a text
    #[command(alias = "ls")]
    Fields {
        /// File path, "-" for stdin, or @<note-id>
        input: String,
    },

    /// Report placeholders that are not understood (exit code 1 if any)
    Check {
        /// File path, "-" for stdin, or @<note-id>
        input: String,
    },

    /// Manage stored notes usable as snippets
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., max_recursion_depth)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotesAction {
    /// Store a new note
    Add {
        title: String,

        /// Note text (read from stdin if omitted)
        content: Option<String>,

        /// Fixed id instead of a generated one
        #[arg(long)]
        id: Option<String>,

        /// Insert this note verbatim when used as a snippet
        #[arg(long)]
        raw: bool,
    },

    /// List stored notes
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn expand_collects_repeated_sets() {
        let cli = Cli::try_parse_from([
            "padfields", "expand", "note.txt", "--set", "1=a", "-s", "Name=b", "--mode", "preview",
        ])
        .unwrap();
        match cli.command {
            Commands::Expand { input, set, mode, .. } => {
                assert_eq!(input, "note.txt");
                assert_eq!(set, vec!["1=a".to_string(), "Name=b".to_string()]);
                assert_eq!(mode, ProcessingMode::Preview);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["padfields", "expand", "-", "--mode", "loud"]).is_err());
    }
}
