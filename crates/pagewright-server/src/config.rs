// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Environment overrides for `ServiceConfig`, applied once at bootstrap.

use std::str::FromStr;

use pagewright_core::{PagewrightError, ServiceConfig};

pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_MAX_UPLOAD_BYTES: &str = "PAGEWRIGHT_MAX_UPLOAD_BYTES";
pub const ENV_MAX_CONCURRENT: &str = "PAGEWRIGHT_MAX_CONCURRENT";
pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "PAGEWRIGHT_RATE_LIMIT_PER_MINUTE";
pub const ENV_CORS_ORIGINS: &str = "PAGEWRIGHT_CORS_ORIGINS";

/// Load `.env` if present, then read overrides from the process environment.
pub fn from_env() -> Result<ServiceConfig, PagewrightError> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Apply overrides from `lookup` on top of the defaults and validate.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ServiceConfig, PagewrightError> {
    let mut config = ServiceConfig::default();

    if let Some(host) = lookup(ENV_HOST) {
        config.bind_host = host;
    }
    if let Some(port) = parsed(&lookup, ENV_PORT)? {
        config.port = port;
    }
    if let Some(bytes) = parsed(&lookup, ENV_MAX_UPLOAD_BYTES)? {
        config.max_upload_bytes = bytes;
    }
    if let Some(count) = parsed(&lookup, ENV_MAX_CONCURRENT)? {
        config.max_concurrent_conversions = count;
    }
    if let Some(per_minute) = parsed::<u32>(&lookup, ENV_RATE_LIMIT_PER_MINUTE)? {
        // 0 turns throttling off.
        config.rate_limit.enabled = per_minute > 0;
        config.rate_limit.requests_per_window = per_minute;
        config.rate_limit.window_secs = 60;
    }
    if let Some(origins) = lookup(ENV_CORS_ORIGINS) {
        config.cors_allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();
    }

    config.validate()?;
    Ok(config)
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, PagewrightError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            PagewrightError::Internal(format!("{key} must be a number, got {raw:?}"))
        }),
    }
}
