mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod exit_codes;
mod infra;
mod services;
mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::ticket::{self, CreateArgs, CredentialArgs, UpdateArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::artifacts::ArtifactStore;
use crate::infra::trello::TrelloClient;
use crate::workflow::ticket::{TicketOperation, TicketWorkflowOutcome};

#[derive(Parser)]
#[command(
    name = "trello-ticket",
    author,
    version,
    about = "Create and update Trello cards from pipeline runs"
)]
struct Cli {
    /// Trello API base URL.
    #[arg(long, global = true, env = "TRELLO_API_URL")]
    api_url: Option<String>,
    /// Folder that receives the response artifacts.
    #[arg(long, global = true, env = "TRELLO_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a card on a board list.
    Create(CreateArgs),
    /// Update an existing card.
    Update(UpdateArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(error.exit_code());
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Config(args) => return config_cmd::run(args.command),
        Commands::Create(args) => {
            let ctx = build_context(&args.credentials, cli.api_url, cli.artifacts_dir)?;
            ticket::create(&ctx, args).await?
        }
        Commands::Update(args) => {
            let ctx = build_context(&args.credentials, cli.api_url, cli.artifacts_dir)?;
            ticket::update(&ctx, args).await?
        }
    };

    report(&outcome);
    Ok(())
}

fn build_context(
    credentials: &CredentialArgs,
    api_url: Option<String>,
    artifacts_dir: Option<PathBuf>,
) -> AppResult<AppContext> {
    let mut overrides = credentials.overrides();
    overrides.api_url = api_url;
    overrides.artifacts_dir = artifacts_dir;
    let config = AppConfig::load(overrides)?;

    let artifacts = ArtifactStore::init(&config.artifacts_dir)?;
    let trello = Arc::new(TrelloClient::new(
        &config.api_url,
        config.credentials.clone(),
        config.request_timeout,
    )?);
    info!(
        api_url = %config.api_url,
        responses = %artifacts.responses_dir().display(),
        "using Trello API"
    );

    Ok(AppContext::new(trello.clone(), trello, artifacts))
}

fn report(outcome: &TicketWorkflowOutcome) {
    let card_id = outcome.card.id();
    match outcome.operation {
        TicketOperation::Create => println!("Card {card_id} created successfully"),
        TicketOperation::Update => println!("Card with id {card_id} updated successfully"),
    }
    for path in &outcome.attachments.attached {
        println!("{} was successfully attached to {card_id}", path.display());
    }
    for (path, reason) in &outcome.attachments.failed {
        warn!(file = %path.display(), "not attached: {reason}");
    }
    println!("Response saved to {}", outcome.response_path.display());
}
