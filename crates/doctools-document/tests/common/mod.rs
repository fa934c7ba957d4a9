// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures: small PDFs built with lopdf, and a recogniser stub.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use doctools_core::error::Result;
use doctools_document::TextRecognizer;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// One page of a fixture PDF.
pub enum FixturePage {
    /// Lines drawn in Courier, top to bottom.
    Text(Vec<&'static str>),
    /// A single 8-bit gray image and no text layer.
    Scanned,
    /// A table drawn as a grid of stroked cell rectangles, one text show per
    /// cell. Cells are 250pt wide and 20pt high from the top left corner.
    Ruled(Vec<Vec<&'static str>>),
}

/// Build a PDF from page descriptions.
pub fn build_pdf(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let (operations, resources) = match page {
            FixturePage::Text(lines) => {
                let mut ops = Vec::new();
                for (i, line) in lines.iter().enumerate() {
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
                    ops.push(Operation::new(
                        "Td",
                        vec![50.into(), (800 - 14 * i as i64).into()],
                    ));
                    ops.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                    ops.push(Operation::new("ET", vec![]));
                }
                (ops, dictionary! { "Font" => dictionary! { "F1" => font_id } })
            }
            FixturePage::Ruled(rows) => {
                let (left, top, width, height) = (50i64, 760i64, 250i64, 20i64);
                let mut ops = Vec::new();
                for (r, row) in rows.iter().enumerate() {
                    let y = top - height * (r as i64 + 1);
                    for (c, cell) in row.iter().enumerate() {
                        let x = left + width * c as i64;
                        ops.push(Operation::new(
                            "re",
                            vec![x.into(), y.into(), width.into(), height.into()],
                        ));
                        ops.push(Operation::new("S", vec![]));
                        ops.push(Operation::new("BT", vec![]));
                        ops.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
                        ops.push(Operation::new("Td", vec![(x + 4).into(), (y + 6).into()]));
                        ops.push(Operation::new("Tj", vec![Object::string_literal(*cell)]));
                        ops.push(Operation::new("ET", vec![]));
                    }
                }
                (ops, dictionary! { "Font" => dictionary! { "F1" => font_id } })
            }
            FixturePage::Scanned => {
                let (width, height) = (48i64, 32i64);
                let pixels: Vec<u8> = (0..width * height)
                    .map(|i| if (i / width) % 8 < 4 { 40 } else { 220 })
                    .collect();
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width,
                        "Height" => height,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    pixels,
                ));
                let ops = vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![480.into(), 0.into(), 0.into(), 320.into(), 50.into(), 400.into()],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ];
                (ops, dictionary! { "XObject" => dictionary! { "Im1" => image_id } })
            }
        };

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A PNG with a few dark bars, enough for the pre-processing filters.
pub fn png_bytes() -> Vec<u8> {
    let img = GrayImage::from_fn(64, 48, |_, y| if (y / 6) % 2 == 0 { Luma([30]) } else { Luma([230]) });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Recogniser that returns fixed text and counts its calls.
pub struct StubRecognizer {
    pub text: &'static str,
    pub calls: AtomicUsize,
}

impl StubRecognizer {
    pub fn new(text: &'static str) -> Self {
        Self {
            text,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for StubRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        assert!(
            matches!(image, DynamicImage::ImageLuma8(_)),
            "recogniser should receive the pre-processed grayscale image"
        );
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }

    fn name(&self) -> &str {
        "stub"
    }
}
