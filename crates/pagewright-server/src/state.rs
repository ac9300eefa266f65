// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application state shared across handlers.

use std::sync::Arc;

use pagewright_core::PagewrightError;
use pagewright_core::ServiceConfig;

use crate::pipeline::Pipeline;
use crate::ratelimit::RateLimitState;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub pipeline: Arc<Pipeline>,
    pub rate_limit: RateLimitState,
}

impl AppState {
    /// Validate `config` and build the per-process services from it.
    pub fn new(config: ServiceConfig) -> Result<Self, PagewrightError> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            pipeline: Arc::new(Pipeline::new(Arc::clone(&config))),
            rate_limit: RateLimitState::new(&config.rate_limit),
            config,
        })
    }
}
