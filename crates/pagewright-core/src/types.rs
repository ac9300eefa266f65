// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewright conversion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionId(pub Uuid);

impl ConversionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex characters, used in generated file names and logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ConversionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document types the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Jpeg,
}

impl DocumentType {
    /// Parse a caller-declared content type.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=...`. `image/jpg` is accepted as an alias for JPEG.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Channel encoding of a source raster, as declared by its frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorModel {
    Grayscale,
    Rgb,
    Cmyk,
    /// Adobe YCCK: CMYK stored with a YCbCr transform applied.
    Ycck,
    /// Any other component count.
    Other(u8),
}

impl ColorModel {
    /// Whether the output raster format can carry this model without loss.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Grayscale | Self::Rgb)
    }

    /// PDF device colour space name for supported models.
    pub fn pdf_color_space(&self) -> Option<&'static str> {
        match self {
            Self::Grayscale => Some("DeviceGray"),
            Self::Rgb => Some("DeviceRGB"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grayscale => write!(f, "grayscale"),
            Self::Rgb => write!(f, "RGB"),
            Self::Cmyk => write!(f, "CMYK"),
            Self::Ycck => write!(f, "YCCK"),
            Self::Other(n) => write!(f, "{n}-component"),
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_pt: f32, height_pt: f32 },
}

impl PaperSize {
    /// Page dimensions in PostScript points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.28, 841.89),
            Self::A3 => (841.89, 1190.55),
            Self::A5 => (419.53, 595.28),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }

    /// Pixel dimensions of a full-page raster at `dpi` (width, height).
    ///
    /// A4 at 300 DPI yields 2480 x 3508.
    pub fn raster_px(&self, dpi: u16) -> (u32, u32) {
        let (w_pt, h_pt) = self.dimensions_pt();
        let to_px = |pt: f32| (pt as f64 / 72.0 * dpi as f64).round() as u32;
        (to_px(w_pt), to_px(h_pt))
    }
}

/// Failure taxonomy for a conversion, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    InvalidInput,
    PayloadTooLarge,
    SignatureMismatch,
    UnsupportedColorSpace,
    DecodeFailure,
    ComposeFailure,
    Timeout,
    Aborted,
    Overloaded,
    Internal,
}

impl FailureKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::PayloadTooLarge => "payload_too_large",
            Self::SignatureMismatch => "signature_mismatch",
            Self::UnsupportedColorSpace => "unsupported_color_space",
            Self::DecodeFailure => "decode_failure",
            Self::ComposeFailure => "compose_failure",
            Self::Timeout => "timeout",
            Self::Aborted => "aborted",
            Self::Overloaded => "overloaded",
            Self::Internal => "internal_error",
        }
    }
}

/// Lifecycle states of one conversion.
///
/// `Received -> Sniffed -> Normalized -> Composed -> Done`, with `Failed`
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStage {
    Received,
    Sniffed,
    Normalized,
    Composed,
    Done,
    Failed(FailureKind),
}

impl ConversionStage {
    /// The stage that follows a successful completion of this one.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Sniffed),
            Self::Sniffed => Some(Self::Normalized),
            Self::Normalized => Some(Self::Composed),
            Self::Composed => Some(Self::Done),
            Self::Done | Self::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Generated name for an output document.
///
/// Format: `converted-YYYYMMDD-<8 hex>`; the `.pdf` extension is added by
/// [`OutputName::file_name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputName {
    stem: String,
}

impl OutputName {
    pub fn generate(now: DateTime<Utc>, id: &ConversionId) -> Self {
        Self {
            stem: format!("converted-{}-{}", now.format("%Y%m%d"), id.short()),
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.stem)
    }
}
