use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "poll-sync")]
#[command(about = "Reconciles on-chain poll votes into the local vote ledger")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "poll-sync.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Use the in-process mock ledger regardless of the configured mode
    #[arg(long)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Merge vote-cast events from the ledger into the local store
    Sync {
        #[arg(long, default_value_t = 0)]
        from_block: u64,
    },
    /// Show the tally for a question
    Results {
        question_id: u64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Create pending questions on the ledger
    Publish {
        /// Publish (or confirm) a single question instead of every pending one
        #[arg(long)]
        question_id: Option<u64>,
    },
    /// Unlink all questions from the ledger and delete the synced votes
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Show store and ledger status
    Status,
    /// Add a question to the local store
    AddQuestion {
        #[arg(long)]
        text: String,
        #[arg(long = "choice", required = true)]
        choices: Vec<String>,
        /// Link to an existing on-chain question
        #[arg(long)]
        external_id: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync() {
        let cli =
            Cli::try_parse_from(["poll-sync", "--mock", "sync", "--from-block", "42"]).unwrap();
        assert!(cli.mock);
        assert_eq!(cli.config, "poll-sync.toml");
        assert!(matches!(cli.command, Command::Sync { from_block: 42 }));
    }

    #[test]
    fn test_parse_add_question() {
        let cli = Cli::try_parse_from([
            "poll-sync",
            "add-question",
            "--text",
            "Colour?",
            "--choice",
            "Red",
            "--choice",
            "Blue",
            "--external-id",
            "10",
        ])
        .unwrap();

        match cli.command {
            Command::AddQuestion {
                text,
                choices,
                external_id,
            } => {
                assert_eq!(text, "Colour?");
                assert_eq!(choices, vec!["Red", "Blue"]);
                assert_eq!(external_id, Some(10));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_results_format() {
        let cli = Cli::try_parse_from(["poll-sync", "results", "3", "--format", "csv"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Results {
                question_id: 3,
                format: OutputFormat::Csv
            }
        ));
        assert!(Cli::try_parse_from(["poll-sync", "results"]).is_err());
    }

    #[test]
    fn test_parse_publish_and_reset() {
        let cli = Cli::try_parse_from(["poll-sync", "publish"]).unwrap();
        assert!(matches!(cli.command, Command::Publish { question_id: None }));

        let cli = Cli::try_parse_from(["poll-sync", "publish", "--question-id", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Publish {
                question_id: Some(4)
            }
        ));

        let cli = Cli::try_parse_from(["poll-sync", "reset", "--force"]).unwrap();
        assert!(matches!(cli.command, Command::Reset { force: true }));
    }
}
