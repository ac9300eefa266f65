// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable failure messages returned to the uploader.
//
// Every pipeline error is mapped to a short plain-English reason. Internal
// detail (decoder messages, serialiser errors) stays in the logs and is never
// echoed back to the caller.

use crate::error::PagewrightError;

/// Who has to act for a retry to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The upload itself is wrong; resubmitting it unchanged will fail again.
    CallerFault,
    /// Load or a transient condition; the same upload may succeed later.
    Transient,
    /// Something broke on our side.
    ServerFault,
}

/// A caller-facing description of a failure.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short reason, used as the plain-text response body.
    pub message: String,
    /// Whether resubmitting the same request could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Describe a `PagewrightError` in terms the uploader can act on.
pub fn describe(err: &PagewrightError) -> HumanError {
    match err {
        PagewrightError::InvalidInput(detail) => HumanError {
            message: format!("Invalid upload: {detail}"),
            retriable: false,
            severity: Severity::CallerFault,
        },

        PagewrightError::PayloadTooLarge { limit } => HumanError {
            message: format!("File is too large (limit {})", readable_size(*limit)),
            retriable: false,
            severity: Severity::CallerFault,
        },

        PagewrightError::SignatureMismatch(_) => HumanError {
            message: "Invalid JPEG: file content is not a JPEG image".into(),
            retriable: false,
            severity: Severity::CallerFault,
        },

        PagewrightError::UnsupportedColorSpace(model) => HumanError {
            message: format!("{model} images are not allowed; upload an RGB or grayscale JPEG"),
            retriable: false,
            severity: Severity::CallerFault,
        },

        PagewrightError::DecodeFailure(_) => HumanError {
            message: "The image could not be decoded; it may be truncated or corrupt".into(),
            retriable: false,
            severity: Severity::CallerFault,
        },

        PagewrightError::Timeout => HumanError {
            message: "Upload took too long".into(),
            retriable: true,
            severity: Severity::CallerFault,
        },

        PagewrightError::Aborted(_) => HumanError {
            message: "Upload was interrupted".into(),
            retriable: true,
            severity: Severity::CallerFault,
        },

        PagewrightError::Overloaded => HumanError {
            message: "Server is busy; try again shortly".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        PagewrightError::ComposeFailure(_)
        | PagewrightError::Io(_)
        | PagewrightError::Internal(_) => HumanError {
            message: "PDF generation failed".into(),
            retriable: true,
            severity: Severity::ServerFault,
        },
    }
}

/// Byte count in the largest unit that keeps it above one.
fn readable_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    if bytes >= MIB {
        if bytes % MIB == 0 {
            format!("{} MB", bytes / MIB)
        } else {
            format!("{:.1} MB", bytes as f64 / MIB as f64)
        }
    } else if bytes >= KIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}
