// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewright.

use thiserror::Error;

use crate::types::{ColorModel, FailureKind};

/// Top-level error type for all Pagewright operations.
#[derive(Debug, Error)]
pub enum PagewrightError {
    // -- Request shape --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    // -- Pipeline stages --
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("unsupported color space: {0}")]
    UnsupportedColorSpace(ColorModel),

    #[error("image decode failed: {0}")]
    DecodeFailure(String),

    #[error("document composition failed: {0}")]
    ComposeFailure(String),

    // -- Transport / admission --
    #[error("upload read timed out")]
    Timeout,

    #[error("client aborted the upload: {0}")]
    Aborted(String),

    #[error("too many conversions in flight")]
    Overloaded,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PagewrightError {
    /// Classify an I/O error raised while reading an upload.
    ///
    /// A dropped or reset connection mid-body is an abort by the client, not
    /// a server fault.
    pub fn from_upload_io(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut => Self::Timeout,
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => Self::Aborted(err.to_string()),
            _ => Self::Io(err),
        }
    }

    /// Classify this error into the failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::PayloadTooLarge { .. } => FailureKind::PayloadTooLarge,
            Self::SignatureMismatch(_) => FailureKind::SignatureMismatch,
            Self::UnsupportedColorSpace(_) => FailureKind::UnsupportedColorSpace,
            Self::DecodeFailure(_) => FailureKind::DecodeFailure,
            Self::ComposeFailure(_) => FailureKind::ComposeFailure,
            Self::Timeout => FailureKind::Timeout,
            Self::Aborted(_) => FailureKind::Aborted,
            Self::Overloaded => FailureKind::Overloaded,
            Self::Io(_) | Self::Internal(_) => FailureKind::Internal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewrightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_map_to_their_kind() {
        assert_eq!(
            PagewrightError::SignatureMismatch("x".into()).kind(),
            FailureKind::SignatureMismatch
        );
        assert_eq!(
            PagewrightError::UnsupportedColorSpace(ColorModel::Cmyk).kind(),
            FailureKind::UnsupportedColorSpace
        );
        assert_eq!(
            PagewrightError::ComposeFailure("x".into()).kind(),
            FailureKind::ComposeFailure
        );
    }

    #[test]
    fn io_errors_are_internal() {
        let err: PagewrightError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), FailureKind::Internal);
    }

    #[test]
    fn dropped_connection_is_an_abort() {
        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert_eq!(PagewrightError::from_upload_io(reset).kind(), FailureKind::Aborted);
        let timed_out = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(PagewrightError::from_upload_io(timed_out).kind(), FailureKind::Timeout);
        let other = std::io::Error::other("boom");
        assert_eq!(PagewrightError::from_upload_io(other).kind(), FailureKind::Internal);
    }

    #[test]
    fn color_space_message_names_the_model() {
        let err = PagewrightError::UnsupportedColorSpace(ColorModel::Cmyk);
        assert_eq!(err.to_string(), "unsupported color space: CMYK");
    }
}
