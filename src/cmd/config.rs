use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{DEFAULT_API_URL, DEFAULT_ARTIFACTS_DIR, StoredConfig, config_file_path};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring trello-ticket.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt("Trello API key", &mut cfg.api_key, true)?;
    apply_prompt("Trello access token", &mut cfg.access_token, true)?;
    apply_prompt(
        &format!("Trello API URL (default {DEFAULT_API_URL})"),
        &mut cfg.api_url,
        false,
    )?;
    apply_prompt(
        &format!("Artifacts directory (default {DEFAULT_ARTIFACTS_DIR})"),
        &mut cfg.artifacts_dir,
        false,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Trello API key: {}", mask_secret(&cfg.api_key));
    println!("Trello access token: {}", mask_secret(&cfg.access_token));
    println!("Trello API URL: {}", display_value(&cfg.api_url));
    println!("Artifacts directory: {}", display_value(&cfg.artifacts_dir));

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::from_input(&input))
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let prefix: String = token.chars().take(3).collect();
            let suffix: String = token.chars().skip(token.chars().count() - 3).collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[derive(Debug, PartialEq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn from_input(input: &str) -> Self {
        match input.trim() {
            "" => PromptAction::Keep,
            "-" => PromptAction::Clear,
            value => PromptAction::Set(value.to_string()),
        }
    }
}
