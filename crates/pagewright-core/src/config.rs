// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration. Built once at bootstrap and injected into the
// pipeline and router; nothing in the pipeline reads process-wide state.

use serde::{Deserialize, Serialize};

use crate::error::PagewrightError;
use crate::types::PaperSize;

/// Minimum number of leading bytes the sniffer inspects.
pub const MIN_SNIFF_LEN: usize = 4;

/// Settings for the conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interface to bind the HTTP listener to.
    pub bind_host: String,
    /// TCP port for the HTTP listener.
    pub port: u16,
    /// Largest accepted file part, in bytes.
    pub max_upload_bytes: usize,
    /// Number of leading bytes inspected by the signature sniffer.
    pub sniff_len: usize,
    /// Page size of the output document.
    pub paper_size: PaperSize,
    /// Resolution stamped into the normalized raster.
    pub density_dpi: u16,
    /// JPEG quality used when re-encoding the normalized raster (1-100).
    pub jpeg_quality: u8,
    /// Upper bound on conversions running at once.
    pub max_concurrent_conversions: usize,
    /// How long a request may wait for a conversion slot.
    pub admission_timeout_secs: u64,
    /// How long reading the upload may take.
    pub read_timeout_secs: u64,
    /// Allowed CORS origins. Empty mirrors the request origin.
    pub cors_allowed_origins: Vec<String>,
    /// Per-client request throttling.
    pub rate_limit: RateLimitConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            port: 10000,
            max_upload_bytes: 10 * 1024 * 1024,
            sniff_len: 16,
            paper_size: PaperSize::A4,
            density_dpi: 300,
            jpeg_quality: 85,
            max_concurrent_conversions: 4,
            admission_timeout_secs: 5,
            read_timeout_secs: 30,
            cors_allowed_origins: Vec::new(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PagewrightError> {
        if self.sniff_len < MIN_SNIFF_LEN {
            return Err(PagewrightError::Internal(format!(
                "sniff_len must be at least {MIN_SNIFF_LEN}, got {}",
                self.sniff_len
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(PagewrightError::Internal(
                "max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.max_concurrent_conversions == 0 {
            return Err(PagewrightError::Internal(
                "max_concurrent_conversions must be non-zero".into(),
            ));
        }
        if self.density_dpi == 0 {
            return Err(PagewrightError::Internal("density_dpi must be non-zero".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PagewrightError::Internal(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_window == 0 || self.rate_limit.window_secs == 0)
        {
            return Err(PagewrightError::Internal(
                "rate limit window and request count must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Bounding box for the normalized raster in pixels.
    pub fn target_raster_px(&self) -> (u32, u32) {
        self.paper_size.raster_px(self.density_dpi)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Token-bucket throttling applied per client address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per window.
    pub requests_per_window: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 20,
            window_secs: 60,
        }
    }
}
