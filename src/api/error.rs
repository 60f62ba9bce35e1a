// Unraid BFF — API error responses
//
// Every failure leaves the API as `{"error": ..., "detail"?: ...}` with the
// status below.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    Forbidden(&'static str),
    RateLimited,
    PayloadTooLarge,
    /// An upstream call failed while serving a resource or action.
    Upstream { context: &'static str, source: GatewayError },
    /// A connection test against a candidate endpoint failed.
    BadGateway { context: &'static str, source: GatewayError },
    Internal { context: &'static str, detail: String },
}

impl ApiError {
    pub fn upstream(context: &'static str, source: GatewayError) -> Self {
        Self::Upstream { context, source }
    }

    pub fn bad_gateway(context: &'static str, source: GatewayError) -> Self {
        Self::BadGateway { context, source }
    }

    pub fn store(context: &'static str, source: StoreError) -> Self {
        tracing::error!(context, error = %source, "Credential store failure");
        Self::Internal {
            context,
            detail: source.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(self) -> ErrorBody {
        let (error, detail) = match self {
            Self::BadRequest(message) => (message, None),
            Self::NotFound(message) | Self::Forbidden(message) => (message.to_string(), None),
            Self::RateLimited => ("Write rate limit exceeded.".to_string(), None),
            Self::PayloadTooLarge => ("Request body too large".to_string(), None),
            Self::Upstream { context, source } | Self::BadGateway { context, source } => {
                (context.to_string(), Some(source.to_string()))
            }
            Self::Internal { context, detail } => (context.to_string(), Some(detail)),
        };
        ErrorBody { error, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            if let Self::Upstream { context, source } | Self::BadGateway { context, source } = &self {
                tracing::warn!(context, error = %source, "Upstream request failed");
            }
        }
        (status, Json(self.body())).into_response()
    }
}
