// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-document crate: JPEG re-encoding of a
// photo-sized image and assembly of a multi-page output document.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, RgbImage};

use folio_core::types::DocumentMetadata;
use folio_document::pdf::geometry::Rect;
use folio_document::{EmbeddedImage, FinishOptions, PdfAssembler};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A gradient stands in for a photo; flat fills compress unrealistically well.
fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Re-encode a 1024x768 image at the default quality.
fn bench_jpeg_reencode(c: &mut Criterion) {
    let img = gradient(1024, 768);
    c.bench_function("jpeg_reencode (1024x768, q80)", |b| {
        b.iter(|| {
            let embedded = EmbeddedImage::jpeg(black_box(img.clone()), 80).expect("encode");
            black_box(embedded.data.len());
        });
    });
}

/// Assemble and compress a ten-page document from one shared image.
fn bench_assemble(c: &mut Criterion) {
    let embedded = EmbeddedImage::lossless(&gradient(256, 256));
    let options = FinishOptions {
        metadata: DocumentMetadata::default(),
        password: None,
    };
    c.bench_function("assemble (10 pages, 256x256)", |b| {
        b.iter(|| {
            let mut assembler = PdfAssembler::new();
            for _ in 0..10 {
                assembler
                    .add_image_page(&embedded, (256.0, 256.0), Rect::sized(256.0, 256.0))
                    .expect("add page");
            }
            black_box(assembler.finish(&options).expect("finish").len());
        });
    });
}

criterion_group!(benches, bench_jpeg_reencode, bench_assemble);
criterion_main!(benches);
