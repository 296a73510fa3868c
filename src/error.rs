//! Request errors

use actix_web::{HttpResponse, ResponseError, http::StatusCode};

/// Terminal failure of a cover request
#[derive(thiserror::Error, Debug)]
pub(crate) enum ResolveError {
    /// Missing credentials, or token exchange rejected
    #[error("{0}")]
    Auth(String),
    /// Catalog search call failed
    #[error("{detail}")]
    Upstream {
        /// Status returned by the catalog, if a response was received
        status: Option<u16>,
        /// Human readable description
        detail: String,
    },
    /// No match for query
    #[error("{0}")]
    NotFound(String),
    /// Cover image could not be fetched or converted
    #[error("{0:#}")]
    Transcode(anyhow::Error),
}

/// Error response body
#[derive(Debug, serde::Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub(crate) struct ErrorBody {
    /// Human readable error description
    pub detail: String,
}

impl ResponseError for ResolveError {
    fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::Auth(_) | ResolveError::Transcode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResolveError::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ResolveError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}
