// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — JPEG marker inspection and raster normalization.

pub mod header;
pub mod normalizer;

pub use header::FrameHeader;
pub use normalizer::{NormalizedRaster, Normalizer};
