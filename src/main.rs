//! tempo-sync: pull Tempo worklogs or push a worklog set into Tempo.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::error;
use tempo_api::WorkLog;
use tempo_sync_lib::config::{Config, ConfigManager};
use tempo_sync_lib::secrets::{SecretsManager, TokenKind};
use tempo_sync_lib::sync::SyncOptions;

#[derive(Parser)]
#[command(name = "tempo-sync")]
#[command(version)]
#[command(about = "Synchronize worklogs with Tempo")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print Tempo worklogs for a date range as JSON
    Pull {
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: NaiveDate,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: NaiveDate,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mirror worklogs from a JSON file onto Tempo
    Push {
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: NaiveDate,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: NaiveDate,
        /// JSON array of worklogs
        #[arg(short, long)]
        input: PathBuf,
        /// Plan only, do not modify Tempo
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage API tokens in the OS keyring
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store the Jira API token
    SetJira { token: String },
    /// Store the Tempo API token
    SetTempo { token: String },
    /// Remove both tokens
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tempo_sync_lib::init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let secrets = SecretsManager::new();

    match cli.command {
        Commands::Pull { from, to, output } => {
            let config = manager.load();
            let client = tempo_sync_lib::connect(&config, &secrets).await?;
            let worklogs = tempo_sync_lib::pull(&client, from, to, config.call_deadline()).await?;
            let json = serde_json::to_string_pretty(&worklogs).map_err(|err| err.to_string())?;
            match output {
                Some(path) => fs::write(&path, json)
                    .map_err(|err| format!("Failed to write {}: {err}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Push {
            from,
            to,
            input,
            dry_run,
        } => {
            let config = manager.load();
            let content = fs::read_to_string(&input)
                .map_err(|err| format!("Failed to read {}: {err}", input.display()))?;
            let source: Vec<WorkLog> = serde_json::from_str(&content)
                .map_err(|err| format!("Invalid worklog file {}: {err}", input.display()))?;

            let client = tempo_sync_lib::connect(&config, &secrets).await?;
            let options = SyncOptions {
                dry_run,
                call_deadline: config.call_deadline(),
            };
            let report = tempo_sync_lib::push(&client, source, from, to, options).await?;
            let json = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
            println!("{json}");
            if !report.is_success() {
                return Err(format!("{} worklog operations failed", report.failed.len()));
            }
        }
        Commands::Token { action } => match action {
            TokenAction::SetJira { token } => secrets.save_token(TokenKind::Jira, &token)?,
            TokenAction::SetTempo { token } => secrets.save_token(TokenKind::Tempo, &token)?,
            TokenAction::Clear => secrets.clear()?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&manager.load())
                    .map_err(|err| err.to_string())?;
                println!("# {}\n{json}", manager.path().display());
            }
            ConfigAction::Init => {
                if manager.path().exists() {
                    println!("{} already exists", manager.path().display());
                } else {
                    manager
                        .save(&Config::default())
                        .map_err(|err| format!("Failed to write config: {err}"))?;
                    println!("Wrote {}", manager.path().display());
                }
            }
        },
    }

    Ok(())
}
