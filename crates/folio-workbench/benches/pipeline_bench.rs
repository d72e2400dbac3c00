// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-workbench crate: converting a small
// synthetic worklist of images and PDF pages end to end.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use folio_core::types::{ConversionParameters, PageSize};
use folio_document::NoRasterizer;
use folio_document::pdf::testing::{write_blank_pdf, write_test_image};
use folio_workbench::{NoPrompt, Pipeline, Worklist};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Four images and a five-page PDF onto A4, with and without recompression.
fn bench_convert(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut paths = Vec::new();
    for i in 0..4 {
        let path = dir.path().join(format!("photo{i}.png"));
        write_test_image(&path, 640, 480);
        paths.push(path);
    }
    let pdf = dir.path().join("report.pdf");
    write_blank_pdf(&pdf, &[(595.0, 842.0); 5]);
    paths.push(pdf);

    let mut list = Worklist::new();
    list.add(paths, &mut NoPrompt);
    let snapshot = list.snapshot();
    let pipeline = Pipeline::new(Arc::new(NoRasterizer));
    let out = dir.path().join("out.pdf");

    let mut group = c.benchmark_group("convert (9 pages)");
    for compress in [false, true] {
        let params = ConversionParameters {
            page_size: PageSize::A4,
            compress,
            ..Default::default()
        };
        let label = if compress { "a4_jpeg" } else { "a4_lossless" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let summary = pipeline
                    .run(black_box(&snapshot), &params, &out, &mut |_| {})
                    .expect("convert");
                black_box(summary.bytes_written);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
