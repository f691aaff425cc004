use clap::{Args, ValueEnum, builder::BoolishValueParser};
use serde_json::{Map, Value};

use crate::config::ConfigOverrides;
use crate::context::AppContext;
use crate::domain::attachment::{AttachmentSource, MatchType};
use crate::domain::ticket::TicketFields;
use crate::error::{AppError, AppResult};
use crate::workflow::ticket::{
    CreateTicketRequest, TicketWorkflowOutcome, UpdateTicketRequest, create_ticket, update_ticket,
};

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Trello API key.
    #[arg(long, env = "TRELLO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Trello access token.
    #[arg(long, env = "TRELLO_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

impl CredentialArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            access_token: self.access_token.clone(),
            ..ConfigOverrides::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct CardFieldArgs {
    /// Start date, MM/DD/YYYY.
    #[arg(long)]
    pub start_date: Option<String>,
    /// Due date, MM/DD/YYYY.
    #[arg(long)]
    pub due_date: Option<String>,
    #[arg(long, value_parser = BoolishValueParser::new())]
    pub due_complete: Option<bool>,
    /// Member names, e.g. "['ada', 'grace']".
    #[arg(long)]
    pub members: Option<String>,
    /// Label names, e.g. "['bug', 'urgent']".
    #[arg(long)]
    pub labels: Option<String>,
    #[arg(long)]
    pub url_source: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub location_name: Option<String>,
    #[arg(long)]
    pub coordinates: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum MatchTypeArg {
    #[default]
    #[value(name = "exact_match")]
    ExactMatch,
    #[value(name = "regex_match")]
    RegexMatch,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AttachmentArgs {
    /// File to attach, or a regular expression with `regex_match`.
    #[arg(long)]
    pub source_file_name: Option<String>,
    #[arg(long, default_value = "")]
    pub source_folder_name: String,
    #[arg(long, value_enum, default_value_t = MatchTypeArg::ExactMatch)]
    pub source_file_name_match_type: MatchTypeArg,
}

impl AttachmentArgs {
    fn into_source(self) -> Option<AttachmentSource> {
        let match_type = match self.source_file_name_match_type {
            MatchTypeArg::ExactMatch => MatchType::Exact,
            MatchTypeArg::RegexMatch => MatchType::Regex,
        };
        self.source_file_name.map(|file_name| AttachmentSource {
            file_name,
            folder: self.source_folder_name,
            match_type,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
    /// Card title.
    #[arg(long)]
    pub name: String,
    /// Card description.
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub board_name: String,
    #[arg(long)]
    pub list_name: String,
    #[command(flatten)]
    pub fields: CardFieldArgs,
    #[command(flatten)]
    pub attachment: AttachmentArgs,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
    /// Shortlink or id of the card to update.
    #[arg(long = "card-shortlink", visible_alias = "card-id")]
    pub card: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Move the card to this board.
    #[arg(long)]
    pub board_name: Option<String>,
    #[arg(long)]
    pub list_name: Option<String>,
    /// Extra card fields as a JSON object.
    #[arg(long)]
    pub custom_json: Option<String>,
    #[command(flatten)]
    pub fields: CardFieldArgs,
    #[command(flatten)]
    pub attachment: AttachmentArgs,
}

pub async fn create(ctx: &AppContext, args: CreateArgs) -> AppResult<TicketWorkflowOutcome> {
    let request = CreateTicketRequest {
        board_name: args.board_name,
        list_name: args.list_name,
        members: args.fields.members.as_deref().map(parse_name_list).transpose()?,
        labels: args.fields.labels.as_deref().map(parse_name_list).transpose()?,
        fields: ticket_fields(Some(args.name), Some(args.description), args.fields),
        attachment: args.attachment.into_source(),
    };
    create_ticket(ctx, request).await
}

pub async fn update(ctx: &AppContext, args: UpdateArgs) -> AppResult<TicketWorkflowOutcome> {
    let request = UpdateTicketRequest {
        card_ref: args.card,
        board_name: args.board_name,
        list_name: args.list_name,
        members: args.fields.members.as_deref().map(parse_name_list).transpose()?,
        labels: args.fields.labels.as_deref().map(parse_name_list).transpose()?,
        custom_fields: args.custom_json.as_deref().map(parse_custom_json).transpose()?,
        fields: ticket_fields(args.name, args.description, args.fields),
        attachment: args.attachment.into_source(),
    };
    update_ticket(ctx, request).await
}

fn ticket_fields(
    name: Option<String>,
    description: Option<String>,
    args: CardFieldArgs,
) -> TicketFields {
    TicketFields {
        name,
        description,
        start_date: args.start_date,
        due_date: args.due_date,
        due_complete: args.due_complete,
        url_source: args.url_source,
        address: args.address,
        location_name: args.location_name,
        coordinates: args.coordinates,
    }
}

/// Parses a list of names written as a list literal (`['a', "b"]`) or as a
/// bare comma separated list (`a, b`).
pub fn parse_name_list(input: &str) -> AppResult<Vec<String>> {
    let trimmed = input.trim();
    let inner = match (trimmed.strip_prefix('['), trimmed.ends_with(']')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (None, false) => trimmed,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "unbalanced brackets in list '{input}'"
            )));
        }
    };

    let mut names = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) if ch == '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                ',' => push_name(&mut names, &mut current),
                _ => current.push(ch),
            },
        }
    }
    if quote.is_some() {
        return Err(AppError::InvalidInput(format!(
            "unterminated quote in list '{input}'"
        )));
    }
    push_name(&mut names, &mut current);
    Ok(names)
}

fn push_name(names: &mut Vec<String>, current: &mut String) {
    let name = current.trim();
    if !name.is_empty() {
        names.push(name.to_string());
    }
    current.clear();
}

fn parse_custom_json(input: &str) -> AppResult<Map<String, Value>> {
    match serde_json::from_str(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::InvalidInput(
            "--custom-json must be a JSON object".to_string(),
        )),
        Err(err) => Err(AppError::InvalidInput(format!(
            "--custom-json is not valid JSON: {err}"
        ))),
    }
}
