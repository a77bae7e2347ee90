//! Error types.
//!
//! Two layers, never mixed:
//!
//! - [`Error`] surfaces infrastructure failures: loading configuration,
//!   opening the database, binding the listener. It is returned from startup
//!   code and [`Server::serve`](crate::Server::serve).
//! - [`ApiError`] is what a handler returns when a request cannot be
//!   fulfilled. It always turns into an error [`Envelope`] with the matching
//!   status code, so nothing escapes the router's dispatch boundary.

use serde_json::Value;
use tracing::error;

use crate::envelope::Envelope;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// The error type returned by garage's fallible startup operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid listen address `{0}`")]
    Address(String),
}

/// A request-level failure, rendered as an error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed client input.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// No registered route pattern matches the request path.
    #[error("URL Not Found")]
    UrlNotFound,

    /// The matched route cannot supply what its handler needs.
    #[error("Handler not found")]
    HandlerNotFound,

    /// No route is registered for the request method at all.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Unavailable(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            Self::BadRequest(_) => Status::BadRequest,
            Self::NotFound(_) | Self::UrlNotFound | Self::HandlerNotFound => Status::NotFound,
            Self::MethodNotAllowed => Status::MethodNotAllowed,
            Self::Unavailable(_) => Status::ServiceUnavailable,
            Self::Database(_) => Status::InternalServerError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Driver messages can leak schema details; keep them in the log.
            Self::Database(e) => {
                error!(error = %e, "database error");
                "Internal Server Error".to_owned()
            }
            other => other.to_string(),
        };
        Envelope::<Value>::error(message).respond(status)
    }
}
