// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterisation — turn one page of a PDF into a bitmap.
//
// The renderer sits behind the `PageRasterizer` trait so the conversion
// pipeline and the thumbnail worker can run against a fake in tests, and the
// application still starts (with flattening and PDF thumbnails disabled) on
// machines without the pdfium library.

#[cfg(feature = "pdfium")]
pub mod pdfium;

use std::path::Path;
use std::sync::Arc;

use ::image::DynamicImage;
use folio_core::error::FolioError;
use tracing::warn;

/// Scale factor for flattened pages: 300 dpi over the 72 dpi PDF user space.
pub const HIGH_RES_SCALE: f32 = 300.0 / 72.0;

/// How large the rendered bitmap should be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderScale {
    /// Pixels per PDF point.
    Factor(f32),
    /// Fit the longest edge to this many pixels.
    MaxEdge(u32),
}

impl RenderScale {
    /// Bitmap size for a page whose displayed size is `page_pt` points.
    pub fn pixel_size(self, page_pt: (f32, f32)) -> (u32, u32) {
        let (w, h) = page_pt;
        let factor = match self {
            Self::Factor(f) => f,
            Self::MaxEdge(edge) => edge as f32 / w.max(h).max(1.0),
        };
        (
            ((w * factor).round() as u32).max(1),
            ((h * factor).round() as u32).max(1),
        )
    }
}

/// Renders single PDF pages to images.
pub trait PageRasterizer: Send + Sync {
    /// Render the zero-based page `index` of the PDF at `path`.
    ///
    /// The page's own `/Rotate` is applied, so the bitmap is upright as a
    /// viewer would display it.
    fn render(
        &self,
        path: &Path,
        password: Option<&str>,
        index: u32,
        scale: RenderScale,
    ) -> Result<DynamicImage, FolioError>;
}

/// Stand-in used when no rendering library is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRasterizer;

impl PageRasterizer for NoRasterizer {
    fn render(
        &self,
        _path: &Path,
        _password: Option<&str>,
        _index: u32,
        _scale: RenderScale,
    ) -> Result<DynamicImage, FolioError> {
        Err(FolioError::RasterizerUnavailable)
    }
}

/// The best rasteriser this build and machine support.
pub fn default_rasterizer() -> Arc<dyn PageRasterizer> {
    #[cfg(feature = "pdfium")]
    match pdfium::PdfiumRasterizer::new() {
        Ok(rasterizer) => return Arc::new(rasterizer),
        Err(err) => warn!(%err, "pdfium unavailable; page rendering disabled"),
    }
    #[cfg(not(feature = "pdfium"))]
    warn!("Built without pdfium; page rendering disabled");

    Arc::new(NoRasterizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_edge_keeps_aspect() {
        assert_eq!(RenderScale::MaxEdge(120).pixel_size((612.0, 792.0)), (93, 120));
        assert_eq!(RenderScale::MaxEdge(120).pixel_size((792.0, 612.0)), (120, 93));
    }

    #[test]
    fn high_res_factor_is_300_dpi() {
        assert_eq!(
            RenderScale::Factor(HIGH_RES_SCALE).pixel_size((72.0, 144.0)),
            (300, 600)
        );
    }

    #[test]
    fn no_rasterizer_reports_unavailable() {
        let result = NoRasterizer.render(Path::new("x.pdf"), None, 0, RenderScale::MaxEdge(10));
        assert!(matches!(result, Err(FolioError::RasterizerUnavailable)));
    }
}
