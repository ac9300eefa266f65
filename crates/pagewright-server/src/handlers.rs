// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP handlers: liveness and the conversion endpoint.

use std::io;

use axum::Json;
use axum::extract::State;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use pagewright_core::PagewrightError;
use serde::Serialize;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::error::ApiResult;
use crate::pipeline::{BodyLimitExceeded, ConvertedDocument};
use crate::state::AppState;

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub message: &'static str,
}

/// `GET /` and `GET /health`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "pagewright",
        message: "JPG to PDF API is running",
    })
}

/// `POST /convert`: one JPEG file part in, one A4 PDF out.
///
/// Non-file form fields are ignored. File parts are streamed straight into
/// the conversion; a second file part fails the request.
pub async fn convert(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Response> {
    let limit = state.config.max_upload_bytes;
    let mut conversion = state.pipeline.begin().await?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(conversion.fail(multipart_error(err, limit)).into()),
        };
        if field.file_name().is_none() {
            debug!(field = ?field.name(), "skipping non-file form field");
            continue;
        }
        let declared = field.content_type().unwrap_or_default().to_owned();
        let reader = StreamReader::new(Box::pin(field.map_err(field_io_error)));
        conversion.receive(&declared, reader).await?;
    }

    let converted = conversion.finish().await?;
    Ok(pdf_response(converted))
}

fn pdf_response(converted: ConvertedDocument) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", converted.name.file_name());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        converted.document.into_bytes(),
    )
        .into_response()
}

/// Classify a failure reading the multipart framing itself.
///
/// axum reports a failed body read (the client went away) as a server error;
/// anything else it flags is a framing problem in the request.
fn multipart_error(err: MultipartError, limit: usize) -> PagewrightError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => PagewrightError::PayloadTooLarge { limit },
        StatusCode::INTERNAL_SERVER_ERROR => {
            PagewrightError::Aborted(format!("request body read failed: {}", err.body_text()))
        }
        _ => PagewrightError::InvalidInput(format!(
            "malformed multipart body: {}",
            err.body_text()
        )),
    }
}

/// Carry a failure reading a file part's bytes into the I/O domain.
fn field_io_error(err: MultipartError) -> io::Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        io::Error::other(BodyLimitExceeded)
    } else {
        io::Error::new(io::ErrorKind::ConnectionAborted, err)
    }
}
