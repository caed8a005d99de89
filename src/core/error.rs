// Centralized error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised by the attendance store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Errors raised while talking to the messaging platform
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Platform rejected request ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("Failed to decode platform response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Recipient blocked the bot or the chat reference is stale
    pub fn is_recipient_unreachable(&self) -> bool {
        matches!(self, TransportError::Api { code, .. } if *code == 403 || *code == 400)
    }
}

/// Errors returned by a message handler
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl IntoResponse for MonitoringError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MonitoringError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };

        (status, message).into_response()
    }
}

/// Rejection reasons for a full-name entry
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NameError {
    #[error("Expected 2 to 4 words, got {0}")]
    WordCount(usize),

    #[error("Word '{0}' is too short")]
    ShortWord(String),
}

/// Rejection reasons for a phone entry
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Expected 11 digits, got {0}")]
    DigitCount(usize),

    #[error("Number must start with 7 or 8")]
    CountryPrefix,
}
