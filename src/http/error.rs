//! Error responses at the request boundary.
//!
//! Every failure leaves the service as `{"error": <message>, "code": <CODE>}`
//! with a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::{FetchError, ResolveError};
use crate::security::dns_guard::GuardError;
use crate::security::url_guard::ValidationError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Outward error taxonomy of the service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing url query parameter")]
    MissingUrl,

    #[error("Invalid or disallowed URL")]
    InvalidUrl(#[source] ValidationError),

    #[error("Target resolves to a private or disallowed IP")]
    PrivateIp(#[source] GuardError),

    #[error("Failed to resolve target hostname")]
    DnsError(#[source] GuardError),

    #[error("Failed to fetch the target URL")]
    FetchFailed(#[source] FetchError),

    #[error("Request to target URL timed out")]
    Timeout(#[source] FetchError),

    #[error("Target URL not found")]
    NotFound(#[source] FetchError),

    #[error("Failed to fetch or parse the URL")]
    Internal(#[source] FetchError),

    #[error("Too many requests, please try again later.")]
    RateLimited,

    #[error("Route not found")]
    RouteNotFound,

    #[error("Internal server error")]
    Unexpected,
}

impl ApiError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingUrl => "MISSING_URL",
            ApiError::InvalidUrl(_) => "INVALID_URL",
            ApiError::PrivateIp(_) => "PRIVATE_IP",
            ApiError::DnsError(_) => "DNS_ERROR",
            ApiError::FetchFailed(_) => "FETCH_FAILED",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::NotFound(_) | ApiError::RouteNotFound => "NOT_FOUND",
            ApiError::Internal(_) | ApiError::Unexpected => "INTERNAL_ERROR",
            ApiError::RateLimited => "RATE_LIMITED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl
            | ApiError::InvalidUrl(_)
            | ApiError::PrivateIp(_)
            | ApiError::DnsError(_) => StatusCode::BAD_REQUEST,
            ApiError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidUrl(err)
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::PrivateAddress { .. } => ApiError::PrivateIp(err),
            GuardError::Resolution { .. } | GuardError::Timeout { .. } => ApiError::DnsError(err),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Blocked(guard) => ApiError::from(guard),
            FetchError::Status(_) | FetchError::Redirect(_) => ApiError::FetchFailed(err),
            FetchError::Timeout => ApiError::Timeout(err),
            FetchError::HostNotFound(_) => ApiError::NotFound(err),
            FetchError::Transport(_) | FetchError::Body(_) | FetchError::Client(_) => {
                ApiError::Internal(err)
            }
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Validation(e) => e.into(),
            ResolveError::Guard(e) => e.into(),
            ResolveError::Fetch(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
