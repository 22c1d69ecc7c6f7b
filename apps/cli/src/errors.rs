#![allow(dead_code)]

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::provider::AuthError;
use crate::models::profile::ProfileParseError;

/// Application-level error type returned by pages and the workflow driver.
///
/// Every variant is scoped to the operation that raised it: nothing here is
/// fatal to the process, and prior state is left intact by construction.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    ProfileParse(#[from] ProfileParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The message a page should print for this failure. Backend 4xx carry
    /// the server's `detail` verbatim; everything else falls back to the
    /// Display impl.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(api) => api.user_message(),
            other => other.to_string(),
        }
    }
}
