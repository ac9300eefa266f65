// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error mapping. Every failure leaves the service as a status code and
// a short plain-text reason; detail stays in the logs.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pagewright_core::PagewrightError;
use pagewright_core::human_errors;
use pagewright_core::types::FailureKind;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Conversion(#[from] PagewrightError),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl ApiError {
    /// Stable error code, sent in the `x-error-code` header.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conversion(err) => err.kind().code(),
            Self::RateLimited { .. } => "rate_limited",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Conversion(err) => match err.kind() {
                FailureKind::InvalidInput
                | FailureKind::SignatureMismatch
                | FailureKind::UnsupportedColorSpace
                | FailureKind::DecodeFailure
                | FailureKind::Aborted => StatusCode::BAD_REQUEST,
                FailureKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                FailureKind::Timeout => StatusCode::REQUEST_TIMEOUT,
                FailureKind::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
                FailureKind::ComposeFailure | FailureKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// The plain-text body.
    pub fn message(&self) -> String {
        match self {
            Self::Conversion(err) => human_errors::describe(err).message,
            Self::RateLimited { retry_after_secs } => {
                format!("Too many requests; retry after {retry_after_secs} seconds")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, self.message()).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert("x-error-code", HeaderValue::from_static(self.code()));
        if let Self::RateLimited { retry_after_secs } = self {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
