// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image normalizer — metadata probe, colour-model gate, then a single
// decode/flatten/resize/re-encode pass over one owned copy of the upload.

use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder, PixelDensity};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use pagewright_core::ServiceConfig;
use pagewright_core::error::{PagewrightError, Result};
use pagewright_core::types::ColorModel;
use tracing::{debug, info, instrument, warn};

use super::header::{self, FrameHeader};

/// Sources above this pixel count are refused before decoding.
const MAX_SOURCE_PIXELS: u64 = 100_000_000;

/// A raster ready for page composition.
///
/// Always opaque, never larger than the normalizer's bounding box, and
/// encoded as a baseline JPEG carrying the stamped density.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRaster {
    width: u32,
    height: u32,
    color_model: ColorModel,
    density_dpi: u16,
    encoded: Vec<u8>,
}

impl NormalizedRaster {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_model(&self) -> ColorModel {
        self.color_model
    }

    /// Alpha is removed during normalization; kept as an explicit flag so
    /// consumers can assert on it.
    pub fn has_alpha(&self) -> bool {
        false
    }

    pub fn density_dpi(&self) -> u16 {
        self.density_dpi
    }

    /// The baseline JPEG bytes.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        width: u32,
        height: u32,
        color_model: ColorModel,
        density_dpi: u16,
        encoded: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            color_model,
            density_dpi,
            encoded,
        }
    }
}

/// Bounds and encoding parameters for normalization.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    max_width: u32,
    max_height: u32,
    density_dpi: u16,
    quality: u8,
}

impl Normalizer {
    pub fn new(max_width: u32, max_height: u32, density_dpi: u16, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
            density_dpi,
            quality: quality.clamp(1, 100),
        }
    }

    /// A4 at 300 DPI, quality 85.
    pub fn a4() -> Self {
        Self::from_config(&ServiceConfig::default())
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let (max_width, max_height) = config.target_raster_px();
        Self::new(max_width, max_height, config.density_dpi, config.jpeg_quality)
    }

    /// Normalize an uploaded JPEG held in memory.
    ///
    /// The colour model is read from the frame header first; CMYK and other
    /// unsupported models are rejected before any pixel data is decoded.
    /// The decode then runs over the same slice.
    #[instrument(skip_all, fields(source_len = source.len()))]
    pub fn normalize(&self, source: &[u8]) -> Result<NormalizedRaster> {
        let header = header::read_frame_header(source)?;
        debug!(
            width = header.width,
            height = header.height,
            color_model = %header.color_model,
            progressive = header.progressive,
            "frame header read"
        );

        if !header.color_model.is_supported() {
            warn!(color_model = %header.color_model, "rejecting unsupported colour model");
            return Err(PagewrightError::UnsupportedColorSpace(header.color_model));
        }
        check_size(&header)?;
        header::ensure_complete(source)?;

        let decoded = decode(source)?;
        self.transform(decoded, header.color_model)
    }

    /// Flatten, fit, and re-encode an already-decoded image.
    ///
    /// EXIF orientation is never applied; pixels are used exactly as stored.
    pub fn transform(&self, image: DynamicImage, model: ColorModel) -> Result<NormalizedRaster> {
        let flattened = flatten(image, model);
        let (src_w, src_h) = flattened.dimensions();
        let (width, height) = fit_within(src_w, src_h, self.max_width, self.max_height);

        let fitted = if (width, height) == (src_w, src_h) {
            flattened
        } else {
            info!(from_w = src_w, from_h = src_h, width, height, "downscaling raster");
            flattened.resize_exact(width, height, FilterType::Lanczos3)
        };

        let encoded = self.encode(&fitted)?;
        debug!(width, height, encoded_len = encoded.len(), "raster normalized");

        Ok(NormalizedRaster {
            width,
            height,
            color_model: model,
            density_dpi: self.density_dpi,
            encoded,
        })
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
        encoder.set_pixel_density(PixelDensity::dpi(self.density_dpi));
        image.write_with_encoder(encoder).map_err(|err| {
            PagewrightError::Internal(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }
}

/// Largest size with the source's aspect ratio that fits the bounds,
/// never larger than the source itself.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let fitted_w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let fitted_h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (fitted_w, fitted_h)
}

/// Drop any alpha channel and settle on 8-bit gray or RGB.
fn flatten(image: DynamicImage, model: ColorModel) -> DynamicImage {
    match model {
        ColorModel::Grayscale => DynamicImage::ImageLuma8(image.to_luma8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

fn check_size(header: &FrameHeader) -> Result<()> {
    let pixels = header.width as u64 * header.height as u64;
    if pixels > MAX_SOURCE_PIXELS {
        return Err(PagewrightError::DecodeFailure(format!(
            "{}x{} exceeds the {} pixel decode limit",
            header.width, header.height, MAX_SOURCE_PIXELS
        )));
    }
    Ok(())
}

fn decode(source: &[u8]) -> Result<DynamicImage> {
    let decoder = JpegDecoder::new(Cursor::new(source))
        .map_err(|err| PagewrightError::DecodeFailure(err.to_string()))?;
    DynamicImage::from_decoder(decoder)
        .map_err(|err| PagewrightError::DecodeFailure(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::image::header::{DensityUnit, read_density};
    use image::{GrayAlphaImage, LumaA, Rgba, RgbaImage};
    use pagewright_core::types::FailureKind;

    #[test]
    fn fit_within_keeps_small_images() {
        assert_eq!(fit_within(10, 10, 2480, 3508), (10, 10));
        assert_eq!(fit_within(2480, 3508, 2480, 3508), (2480, 3508));
    }

    #[test]
    fn fit_within_downscales_landscape_by_width() {
        assert_eq!(fit_within(4000, 3000, 2480, 3508), (2480, 1860));
    }

    #[test]
    fn fit_within_downscales_tall_images_by_height() {
        assert_eq!(fit_within(1000, 7016, 2480, 3508), (500, 3508));
    }

    #[test]
    fn fit_within_never_collapses_to_zero() {
        assert_eq!(fit_within(100_000, 1, 2480, 3508), (2480, 1));
    }

    #[test]
    fn small_red_square_stays_red_and_unscaled() {
        let source = fixtures::solid_rgb_jpeg(10, 10, [255, 0, 0]);
        let raster = Normalizer::a4().normalize(&source).unwrap();

        assert_eq!((raster.width(), raster.height()), (10, 10));
        assert_eq!(raster.color_model(), ColorModel::Rgb);
        assert!(!raster.has_alpha());

        let decoded = image::load_from_memory(raster.encoded()).unwrap();
        assert!(!decoded.color().has_alpha());
        let pixel = decoded.to_rgb8().get_pixel(5, 5).0;
        assert!(pixel[0] > 240 && pixel[1] < 20 && pixel[2] < 20, "got {pixel:?}");
    }

    #[test]
    fn output_carries_300_dpi() {
        let source = fixtures::solid_rgb_jpeg(10, 10, [255, 0, 0]);
        let raster = Normalizer::a4().normalize(&source).unwrap();

        assert_eq!(raster.density_dpi(), 300);
        let density = read_density(raster.encoded()).unwrap();
        assert_eq!(density.unit, DensityUnit::Inches);
        assert_eq!((density.x, density.y), (300, 300));
    }

    #[test]
    fn large_landscape_is_downscaled_preserving_aspect() {
        let source = fixtures::gradient_rgb_jpeg(4000, 3000);
        let raster = Normalizer::a4().normalize(&source).unwrap();
        assert_eq!((raster.width(), raster.height()), (2480, 1860));

        let decoded = image::load_from_memory(raster.encoded()).unwrap();
        assert_eq!(decoded.dimensions(), (2480, 1860));
    }

    #[test]
    fn grayscale_stays_grayscale() {
        let source = fixtures::solid_gray_jpeg(32, 16, 128);
        let raster = Normalizer::a4().normalize(&source).unwrap();
        assert_eq!(raster.color_model(), ColorModel::Grayscale);

        let decoded = image::load_from_memory(raster.encoded()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn cmyk_is_rejected_before_decoding() {
        // The fixture has a valid CMYK frame header but no decodable scan, so
        // success here proves the decoder was never reached.
        let source = fixtures::cmyk_marker_stream(16, 16);
        let err = Normalizer::a4().normalize(&source).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedColorSpace);
        assert!(err.to_string().contains("CMYK"));
    }

    #[test]
    fn truncated_body_is_a_decode_failure() {
        let source = fixtures::gradient_rgb_jpeg(64, 64);
        let truncated = &source[..source.len() / 2];
        let err = Normalizer::a4().normalize(truncated).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DecodeFailure);
    }

    #[test]
    fn garbage_after_signature_is_a_decode_failure() {
        let mut source = vec![0xFF, 0xD8, 0xFF, 0xE0];
        source.extend_from_slice(&[0xAB; 64]);
        let err = Normalizer::a4().normalize(&source).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DecodeFailure);
    }

    #[test]
    fn alpha_is_removed_deterministically() {
        let mut rgba = RgbaImage::new(8, 8);
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            *pixel = Rgba([x as u8 * 30, y as u8 * 30, 90, (x * y) as u8 * 4]);
        }
        let normalizer = Normalizer::a4();

        let first = normalizer
            .transform(DynamicImage::ImageRgba8(rgba.clone()), ColorModel::Rgb)
            .unwrap();
        let second = normalizer
            .transform(DynamicImage::ImageRgba8(rgba), ColorModel::Rgb)
            .unwrap();

        assert!(!first.has_alpha());
        let decoded = image::load_from_memory(first.encoded()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!(first, second);
    }

    #[test]
    fn gray_alpha_flattens_to_gray() {
        let gray = GrayAlphaImage::from_pixel(4, 4, LumaA([200, 10]));
        let raster = Normalizer::a4()
            .transform(DynamicImage::ImageLumaA8(gray), ColorModel::Grayscale)
            .unwrap();
        let decoded = image::load_from_memory(raster.encoded()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn identical_input_yields_identical_raster() {
        let source = fixtures::gradient_rgb_jpeg(300, 200);
        let normalizer = Normalizer::a4();
        assert_eq!(
            normalizer.normalize(&source).unwrap(),
            normalizer.normalize(&source).unwrap()
        );
    }

    #[test]
    fn custom_bounds_are_respected() {
        let source = fixtures::gradient_rgb_jpeg(400, 100);
        let raster = Normalizer::new(100, 100, 150, 90).normalize(&source).unwrap();
        assert_eq!((raster.width(), raster.height()), (100, 25));
        assert_eq!(raster.density_dpi(), 150);
    }

    #[test]
    fn exif_orientation_is_not_applied() {
        // Orientation 6 asks viewers to rotate 90 degrees clockwise.
        let source = fixtures::with_exif_orientation(&fixtures::gradient_rgb_jpeg(40, 10), 6);
        let raster = Normalizer::a4().normalize(&source).unwrap();
        assert_eq!((raster.width(), raster.height()), (40, 10));

        let decoded = image::load_from_memory(raster.encoded()).unwrap();
        assert_eq!(decoded.dimensions(), (40, 10));
    }
}
