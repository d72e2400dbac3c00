// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixture builders for tests: small synthetic PDFs and images written to disk.

use std::path::Path;

use ::image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use super::embed::EmbeddedImage;
use super::geometry::Rect;
use super::writer::{FinishOptions, PdfAssembler};

/// Write a PDF with one page per entry of `sizes` (width, height in points).
/// Each page draws a filled rectangle so its content stream is non-empty.
pub fn write_blank_pdf(path: &Path, sizes: &[(f32, f32)]) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for &(w, h) in sizes {
        let content = Content {
            operations: vec![
                Operation::new("re", vec![10.into(), 10.into(), 20.into(), 20.into()]),
                Operation::new("f", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {},
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
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save fixture pdf");
}

/// Write a one-page PDF whose page inherits `/MediaBox` and `/Resources`
/// from the root node and `/Rotate 90` from an intermediate node.
pub fn nested_tree_pdf(path: &Path) {
    let mut doc = Document::with_version("1.7");
    let root_id = doc.new_object_id();
    let middle_id = doc.new_object_id();

    let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => middle_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        middle_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Rotate" => 90,
        }),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![middle_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 400.into(), 500.into()],
            "Resources" => dictionary! {},
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => root_id });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save fixture pdf");
}

/// Write an AES-256 protected PDF of `pages` 100×100 pt pages.
pub fn write_encrypted_pdf(path: &Path, pages: u32, password: &str) {
    let image = EmbeddedImage::lossless(&DynamicImage::new_rgb8(10, 10));
    let mut assembler = PdfAssembler::new();
    for _ in 0..pages {
        assembler
            .add_image_page(&image, (100.0, 100.0), Rect::sized(100.0, 100.0))
            .expect("add fixture page");
    }
    let options = FinishOptions {
        password: Some(password),
        ..Default::default()
    };
    assembler.save(path, &options).expect("save fixture pdf");
}

/// Write an RGB image of the given pixel size. The format follows the
/// file extension.
pub fn write_test_image(path: &Path, width: u32, height: u32) {
    let img = ::image::RgbImage::from_fn(width, height, |x, y| {
        ::image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).expect("save fixture image");
}

/// Write an RGBA PNG with a transparent left half.
pub fn write_transparent_png(path: &Path, width: u32, height: u32) {
    let img = ::image::RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        ::image::Rgba([200, 30, 30, alpha])
    });
    img.save(path).expect("save fixture image");
}
