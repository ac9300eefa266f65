// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JPEG marker walker — reads frame metadata without decoding any pixels.
//
// The decoder in the `image` crate silently converts CMYK to RGB and pads
// truncated scans, so colour model and completeness are read straight from
// the marker segments instead.
//
// # Layout (ITU T.81 Annex B)
//
// ```text
// SOI  FF D8
// segment*: FF <marker> <len:u16 BE, includes itself> <payload>
//   APP0  FF E0  "JFIF\0" ver:2 units:1 xdens:u16 ydens:u16 ...
//   APP14 FF EE  "Adobe" ver:2 flags0:2 flags1:2 transform:1
//   SOFn  FF C0..CF (not C4/C8/CC)  precision:1 height:u16 width:u16 nf:1 ...
//   SOS   FF DA  -> entropy-coded data follows
// EOI  FF D9
// ```

use pagewright_core::error::{PagewrightError, Result};
use pagewright_core::types::ColorModel;

const MARKER_SOI: u8 = 0xD8;
const MARKER_EOI: u8 = 0xD9;
const MARKER_SOS: u8 = 0xDA;
const MARKER_APP0: u8 = 0xE0;
const MARKER_APP14: u8 = 0xEE;
const MARKER_TEM: u8 = 0x01;

/// Adobe APP14 transform flag meaning "YCCK".
const ADOBE_TRANSFORM_YCCK: u8 = 2;

/// Bits per sample the decoder handles.
const SUPPORTED_PRECISION: u8 = 8;

/// Resolution unit stored in a JFIF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityUnit {
    /// Aspect ratio only.
    None,
    Inches,
    Centimetres,
}

/// Pixel density from a JFIF APP0 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Density {
    pub x: u16,
    pub y: u16,
    pub unit: DensityUnit,
}

/// Frame metadata read from the marker segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    pub color_model: ColorModel,
    pub progressive: bool,
    pub density: Option<Density>,
}

/// Walk the marker segments up to the first frame header.
pub fn read_frame_header(data: &[u8]) -> Result<FrameHeader> {
    if !data.starts_with(&[0xFF, MARKER_SOI]) {
        return Err(truncated("missing start-of-image marker"));
    }

    let mut pos = 2;
    let mut adobe_transform: Option<u8> = None;
    let mut density: Option<Density> = None;

    loop {
        let (marker, after_marker) = next_marker(data, pos)?;
        pos = after_marker;

        if is_standalone(marker) {
            continue;
        }
        if marker == MARKER_EOI || marker == MARKER_SOS {
            return Err(truncated("no frame header before image data"));
        }

        let payload = segment_payload(data, pos)?;
        pos += 2 + payload.len();

        match marker {
            MARKER_APP0 => density = density.or_else(|| parse_jfif_density(payload)),
            MARKER_APP14 => {
                if payload.len() >= 12 && payload.starts_with(b"Adobe") {
                    adobe_transform = Some(payload[11]);
                }
            }
            m if is_start_of_frame(m) => {
                return parse_frame(payload, m, adobe_transform, density);
            }
            _ => {}
        }
    }
}

/// Read the JFIF pixel density, if the stream carries one.
pub fn read_density(data: &[u8]) -> Option<Density> {
    read_frame_header(data).ok().and_then(|header| header.density)
}

/// Confirm the stream carries an end-of-image marker after its scan data.
///
/// Inside entropy-coded data every `FF` is followed by a stuffed `00` or a
/// restart marker, so a literal `FF D9` can only be the real EOI.
pub fn ensure_complete(data: &[u8]) -> Result<()> {
    let scan = first_scan_offset(data)?;
    if find_marker(&data[scan..], MARKER_EOI).is_some() {
        Ok(())
    } else {
        Err(truncated("missing end-of-image marker"))
    }
}

/// Offset of the first SOS marker, found by walking segment lengths so that
/// markers inside APPn payloads (EXIF thumbnails) are never mistaken for it.
fn first_scan_offset(data: &[u8]) -> Result<usize> {
    let mut pos = 2;
    loop {
        let (marker, after_marker) = next_marker(data, pos)?;
        pos = after_marker;
        if is_standalone(marker) {
            continue;
        }
        if marker == MARKER_EOI {
            return Err(truncated("no scan data"));
        }
        if marker == MARKER_SOS {
            return Ok(pos);
        }
        pos += 2 + segment_payload(data, pos)?.len();
    }
}

fn parse_frame(
    payload: &[u8],
    marker: u8,
    adobe_transform: Option<u8>,
    density: Option<Density>,
) -> Result<FrameHeader> {
    if payload.len() < 6 {
        return Err(truncated("short frame header"));
    }
    let precision = payload[0];
    let height = u16::from_be_bytes([payload[1], payload[2]]) as u32;
    let width = u16::from_be_bytes([payload[3], payload[4]]) as u32;
    let components = payload[5];

    if precision != SUPPORTED_PRECISION {
        return Err(PagewrightError::DecodeFailure(format!(
            "{precision}-bit samples are not supported"
        )));
    }
    if width == 0 || height == 0 {
        return Err(PagewrightError::DecodeFailure(format!(
            "frame declares zero dimension ({width}x{height})"
        )));
    }
    if payload.len() < 6 + 3 * components as usize {
        return Err(truncated("short component table"));
    }

    let color_model = match (components, adobe_transform) {
        (1, _) => ColorModel::Grayscale,
        (3, _) => ColorModel::Rgb,
        (4, Some(ADOBE_TRANSFORM_YCCK)) => ColorModel::Ycck,
        (4, _) => ColorModel::Cmyk,
        (n, _) => ColorModel::Other(n),
    };

    Ok(FrameHeader {
        width,
        height,
        color_model,
        progressive: matches!(marker, 0xC2 | 0xC6 | 0xCA | 0xCE),
        density,
    })
}

fn parse_jfif_density(payload: &[u8]) -> Option<Density> {
    if payload.len() < 12 || !payload.starts_with(b"JFIF\0") {
        return None;
    }
    let unit = match payload[7] {
        1 => DensityUnit::Inches,
        2 => DensityUnit::Centimetres,
        _ => DensityUnit::None,
    };
    Some(Density {
        x: u16::from_be_bytes([payload[8], payload[9]]),
        y: u16::from_be_bytes([payload[10], payload[11]]),
        unit,
    })
}

/// Locate the marker starting at or after `pos`, skipping fill bytes.
/// Returns the marker code and the offset just past it.
fn next_marker(data: &[u8], mut pos: usize) -> Result<(u8, usize)> {
    if data.get(pos) != Some(&0xFF) {
        return Err(truncated("expected marker"));
    }
    while data.get(pos) == Some(&0xFF) {
        pos += 1;
    }
    match data.get(pos) {
        Some(&marker) => Ok((marker, pos + 1)),
        None => Err(truncated("stream ends inside a marker")),
    }
}

/// Payload of the length-prefixed segment whose length field starts at `pos`.
fn segment_payload(data: &[u8], pos: usize) -> Result<&[u8]> {
    let len_bytes = data
        .get(pos..pos + 2)
        .ok_or_else(|| truncated("segment length cut off"))?;
    let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
    if len < 2 {
        return Err(PagewrightError::DecodeFailure(format!(
            "invalid segment length {len}"
        )));
    }
    data.get(pos + 2..pos + len)
        .ok_or_else(|| truncated("segment body cut off"))
}

fn find_marker(data: &[u8], marker: u8) -> Option<usize> {
    data.windows(2)
        .position(|pair| pair[0] == 0xFF && pair[1] == marker)
}

fn is_standalone(marker: u8) -> bool {
    marker == MARKER_SOI || marker == MARKER_TEM || (0xD0..=0xD7).contains(&marker)
}

fn is_start_of_frame(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn truncated(what: &str) -> PagewrightError {
    PagewrightError::DecodeFailure(format!("malformed JPEG: {what}"))
}
