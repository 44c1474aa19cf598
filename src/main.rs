use anyhow::Context;
use clap::Parser;
use poll_sync::config::SyncConfig;
use poll_sync::config::LedgerMode;
use poll_sync::domain::model::{Choice, Question, QuestionResults};
use poll_sync::core::publish::MIN_LEDGER_CHOICES;
use poll_sync::domain::ports::QuestionRepository;
use poll_sync::utils::{logger, validation::Validate};
use poll_sync::{Cli, Command, OutputFormat, ReconcileError, Reconciler};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_CONFIG: &str = "poll-sync.toml";

fn load_config(cli: &Cli) -> poll_sync::Result<SyncConfig> {
    let mut config = if cli.config == DEFAULT_CONFIG && !Path::new(DEFAULT_CONFIG).exists() {
        SyncConfig::default()
    } else {
        SyncConfig::from_file(&cli.config)?
    };

    if cli.mock {
        config.ledger.mode = LedgerMode::Mock;
    }
    Ok(config)
}

fn print_results(results: &QuestionResults, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", results.question_text);
            for choice in &results.choices {
                println!(
                    "  {:<30} {:>6} votes ({:.1}%)",
                    choice.text, choice.votes, choice.percentage
                );
            }
            println!("Total: {} votes", results.total_votes);
            println!("Synced with ledger: {}", if results.is_synced { "yes" } else { "no" });
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["choice", "votes", "percentage"])?;
            for choice in &results.choices {
                writer.write_record([
                    choice.text.clone(),
                    choice.votes.to_string(),
                    format!("{:.1}", choice.percentage),
                ])?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn confirm_reset() -> anyhow::Result<bool> {
    print!("⚠️  This will reset sync status for ALL questions. Are you sure? [y/N]: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn run(cli: Cli, config: SyncConfig) -> anyhow::Result<()> {
    let store = Arc::new(
        config
            .store
            .open()
            .await
            .with_context(|| format!("opening store at {}", config.store.path))?,
    );
    let gateway = config.ledger.build_gateway().await?;
    let reconciler = Reconciler::new(store.clone(), store.clone(), gateway);

    match cli.command {
        Command::Sync { from_block } => {
            println!("Starting sync from block {}...", from_block);
            let report = reconciler.sync_with_report(from_block).await;
            println!("✅ Successfully synced {} votes", report.synced);
            if cli.verbose {
                println!(
                    "   fetched: {}, duplicates: {}, unmatched: {}, failed: {}",
                    report.fetched, report.duplicates, report.unmatched, report.failed
                );
            }
        }
        Command::Results { question_id, format } => {
            let results = reconciler.get_results(question_id).await?;
            print_results(&results, format)?;
        }
        Command::Publish { question_id } => {
            let report = match question_id {
                Some(question_id) => {
                    println!("🔄 Publishing question {}...", question_id);
                    reconciler.publish_question(question_id).await?
                }
                None => reconciler.publish_pending().await?,
            };
            println!("=== Publish Summary ===");
            println!("✅ Success: {}", report.submitted);
            println!("🔗 Confirmed: {}", report.confirmed);
            println!("⏳ Awaiting receipt: {}", report.pending);
            println!("❌ Errors: {}", report.failed);
        }
        Command::Reset { force } => {
            if !force && !confirm_reset()? {
                println!("Operation cancelled.");
                return Ok(());
            }
            println!("🔄 Resetting sync status...");
            let report = reconciler.reset().await?;
            println!("✅ Reset {} questions", report.questions);
            println!("✅ Deleted {} ledger votes", report.votes);
        }
        Command::Status => {
            let status = reconciler.status().await?;
            println!("=== Ledger Sync Status ===");
            println!("📊 Questions: {}", status.questions);
            println!("✅ Synced questions: {}", status.synced_questions);
            println!("⏳ Pending questions: {}", status.pending_questions);
            println!("🗳️  Votes: {}", status.votes);
            println!("🔗 Current block: {}", status.current_block);
        }
        Command::AddQuestion {
            text,
            choices,
            external_id,
        } => {
            if choices.len() < MIN_LEDGER_CHOICES {
                anyhow::bail!(
                    "a question needs at least {} choices, got {}",
                    MIN_LEDGER_CHOICES,
                    choices.len()
                );
            }
            let mut question = Question::new(text, choices.into_iter().map(Choice::new).collect());
            if let Some(external_id) = external_id {
                question.external_id = Some(external_id);
                question.is_synced = true;
            }
            let saved = store.save(question).await?;
            println!(
                "✅ Added question {} ({} choices)",
                saved.id.unwrap_or_default(),
                saved.choices.len()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.logging.json {
        logger::init_json_logger(cli.verbose, config.logging.level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, config.logging.level.as_deref());
    }

    tracing::info!("Starting poll-sync");
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(e.exit_code());
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!("❌ Command failed: {:#}", e);
        eprintln!("❌ {:#}", e);
        let exit_code = e
            .downcast_ref::<ReconcileError>()
            .map(ReconcileError::exit_code)
            .unwrap_or(3);
        std::process::exit(exit_code);
    }
}
