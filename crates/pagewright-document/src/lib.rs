// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewright-document — The conversion stages behind the Pagewright service.
//
// Provides the ingress sniffer (signature check over a replayable prefix),
// the image normalizer (decode, flatten, fit, re-encode), and the document
// composer (single-page PDF with the raster embedded as DCT data).

pub mod image;
pub mod integrity;
pub mod pdf;
pub mod sniff;

#[cfg(test)]
mod fixtures;

// Re-export the primary types so callers can use `pagewright_document::Composer` etc.
pub use image::normalizer::{NormalizedRaster, Normalizer};
pub use pdf::composer::{Composer, OutputDocument, Placement};
pub use sniff::{PeekReader, SignatureProbe, probe};
