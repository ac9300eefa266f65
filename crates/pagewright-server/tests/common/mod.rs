// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Common test utilities and fixtures.

pub mod fixtures;
pub mod multipart;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use multipart::*;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pagewright_core::ServiceConfig;
use pagewright_server::{AppState, create_router};
use tower::ServiceExt;

/// Router over a default config with `edit` applied.
#[allow(dead_code)]
pub fn router_with(edit: impl FnOnce(&mut ServiceConfig)) -> Router {
    let mut config = ServiceConfig::default();
    edit(&mut config);
    create_router(AppState::new(config).expect("valid test config"))
}

#[allow(dead_code)]
pub fn router() -> Router {
    router_with(|_| {})
}

/// A collected response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// POST `parts` to `/convert`.
#[allow(dead_code)]
pub async fn post_convert(router: &Router, parts: &[Part]) -> TestResponse {
    let (content_type, body) = multipart_body(parts);
    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

#[allow(dead_code)]
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}
