// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Document building blocks for the Folio converter.
//
// Provides PDF reading (with password authentication), output assembly
// (image pages, imported pages, re-placed pages, AES-256 encryption), image
// transforms (grayscale, alpha flattening, thumbnails), and page
// rasterisation behind a pluggable renderer.

pub mod image;
pub mod pdf;
pub mod raster;

// Re-export the primary structs so callers can use `folio_document::PdfAssembler` etc.
pub use image::processor::ImageProcessor;
pub use pdf::embed::EmbeddedImage;
pub use pdf::reader::{PageGeometry, SourceDocument};
pub use pdf::writer::{FinishOptions, PdfAssembler};
pub use raster::{HIGH_RES_SCALE, NoRasterizer, PageRasterizer, RenderScale, default_rasterizer};
