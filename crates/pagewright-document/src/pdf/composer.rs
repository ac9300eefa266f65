// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document composer — builds a single-page PDF around a normalized raster
// using `lopdf`.
//
// The raster's JPEG bytes are embedded verbatim as a DCTDecode image XObject,
// so no second decode happens here. The page has no margin; the image is
// scaled to fit the page and centred on both axes.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pagewright_core::PaperSize;
use pagewright_core::error::{PagewrightError, Result};
use tracing::{debug, info, instrument};

use crate::image::normalizer::NormalizedRaster;
use crate::sniff::JPEG_SOI;

/// Resource name of the embedded image.
const IMAGE_RESOURCE: &str = "Im0";

/// Producer string written into the document info dictionary.
const PRODUCER: &str = "pagewright";

/// Where the image is drawn on the page, in points from the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Scale an image to fit the page, preserving aspect ratio, and centre it.
    pub fn fit_on_page(image_w: u32, image_h: u32, page_w: f32, page_h: f32) -> Self {
        let scale = (page_w / image_w as f32).min(page_h / image_h as f32);
        let width = image_w as f32 * scale;
        let height = image_h as f32 * scale;
        Self {
            x: (page_w - width) / 2.0,
            y: (page_h - height) / 2.0,
            width,
            height,
        }
    }
}

/// A serialised single-page PDF.
#[derive(Debug, Clone)]
pub struct OutputDocument {
    bytes: Vec<u8>,
    placement: Placement,
}

impl OutputDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

/// Builds single-page documents of a fixed paper size.
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    paper_size: PaperSize,
}

impl Composer {
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }

    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    /// Compose a one-page document embedding `raster`.
    ///
    /// The document is serialised exactly once into an owned buffer; an
    /// `OutputDocument` exists only if serialisation completed.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn compose(&self, raster: &NormalizedRaster, title: &str) -> Result<OutputDocument> {
        let (page_w, page_h) = self.paper_size.dimensions_pt();
        let color_space = raster.color_model().pdf_color_space().ok_or_else(|| {
            PagewrightError::ComposeFailure(format!(
                "{} raster cannot be embedded",
                raster.color_model()
            ))
        })?;
        if raster.width() == 0 || raster.height() == 0 {
            return Err(PagewrightError::ComposeFailure(
                "raster has a zero dimension".into(),
            ));
        }
        if !raster.encoded().starts_with(&JPEG_SOI) {
            return Err(PagewrightError::ComposeFailure(
                "raster is not JPEG encoded".into(),
            ));
        }

        let placement = Placement::fit_on_page(raster.width(), raster.height(), page_w, page_h);
        info!(paper = ?self.paper_size, title, "composing document");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(raster.width() as i64),
                "Height" => Object::Integer(raster.height() as i64),
                "ColorSpace" => color_space,
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "DCTDecode",
            },
            raster.encoded().to_vec(),
        )
        .with_compression(false);
        let image_id = doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placement.width.into(),
                        0.into(),
                        0.into(),
                        placement.height.into(),
                        placement.x.into(),
                        placement.y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded_content = content.encode().map_err(|err| {
            PagewrightError::ComposeFailure(format!("failed to encode page content: {}", err))
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded_content));

        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(|err| {
            PagewrightError::ComposeFailure(format!("failed to serialise document: {}", err))
        })?;

        debug!(
            output_bytes = bytes.len(),
            x = placement.x,
            y = placement.y,
            drawn_w = placement.width,
            drawn_h = placement.height,
            "document serialised"
        );

        Ok(OutputDocument {
            bytes,
            placement,
        })
    }
}
