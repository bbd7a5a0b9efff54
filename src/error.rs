use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::{auth::repo::StoreError, mail::MailError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    DuplicateUser,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired verification code")]
    InvalidOrExpiredCode,
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Unauthorized - {0}")]
    Unauthorized(&'static str),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("mail failure: {0}")]
    Mail(#[from] MailError),
    #[error("internal failure: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// JSON body of every auth response.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub success: bool,
    pub message: String,
}

impl MessageBody {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::DuplicateUser
            | AuthError::InvalidCredentials
            | AuthError::InvalidOrExpiredCode
            | AuthError::InvalidOrExpiredToken
            | AuthError::UserNotFound => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Store(_) | AuthError::Mail(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(MessageBody::failed(message))).into_response()
    }
}
