// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewright-server — HTTP surface and pipeline orchestration for Pagewright.
//
// `POST /convert` takes a multipart upload with one JPEG file part and
// answers with a single-page A4 PDF. `GET /` and `GET /health` report
// liveness.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use pipeline::{Conversion, ConvertedDocument, Pipeline};
pub use ratelimit::RateLimitState;
pub use routes::create_router;
pub use state::AppState;
