use std::io;

use thiserror::Error;

use crate::exit_codes;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("you do not have the required permissions or the credentials are wrong")]
    Authorization,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("Trello responded with Bad Request: {0}")]
    BadRequest(String),
    #[error("unknown HTTP status {status}: {body}")]
    Unknown { status: u16, body: String },
    #[error("failed to call Trello: {0}")]
    Transport(String),
    #[error("unexpected Trello response: {0}")]
    UnexpectedResponse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Authorization => exit_codes::INVALID_CREDENTIALS,
            AppError::NotFound(_) | AppError::BadRequest(_) => exit_codes::BAD_REQUEST,
            AppError::Unknown { .. }
            | AppError::Transport(_)
            | AppError::UnexpectedResponse(_) => exit_codes::UNKNOWN_ERROR,
            AppError::InvalidInput(_)
            | AppError::Configuration(_)
            | AppError::Io(_)
            | AppError::Json(_) => exit_codes::INVALID_INPUT,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
