//! Request-boundary errors. Every failure leaves the service as
//! `{"error": "<message>"}` with a status code; nothing here is fatal.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::aggregate::AggregateError;
use crate::metrics;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Store failure; the client only sees `public`, details go to the log.
    #[error("{public}")]
    Store {
        public: &'static str,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn store(public: &'static str, source: StoreError) -> Self {
        ApiError::Store { public, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Aggregate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Store { .. } => "store",
            ApiError::Aggregate(_) => "aggregate",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store { source, .. } => error!(error = %source, "store read failed"),
            other => warn!(error = %other, "request rejected"),
        }
        metrics::record_failure(self.kind());
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
