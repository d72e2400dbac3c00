// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfium-backed page renderer.

use std::path::Path;

use ::image::DynamicImage;
use folio_core::error::FolioError;
use pdfium_render::prelude::*;
use tracing::{debug, instrument};

use super::{PageRasterizer, RenderScale};

/// Renders pages with the system pdfium library.
///
/// The library is bound per call: pdfium keeps global state, and the
/// `thread_safe` feature serialises access between the conversion thread and
/// the thumbnail worker.
#[derive(Debug)]
pub struct PdfiumRasterizer {
    _private: (),
}

impl PdfiumRasterizer {
    /// Check that pdfium can be loaded on this machine.
    pub fn new() -> Result<Self, FolioError> {
        bind()?;
        Ok(Self { _private: () })
    }
}

fn bind() -> Result<Pdfium, FolioError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|err| FolioError::Rasterize(format!("cannot load pdfium: {:?}", err)))
}

impl PageRasterizer for PdfiumRasterizer {
    #[instrument(skip(self, password), fields(path = %path.display()))]
    fn render(
        &self,
        path: &Path,
        password: Option<&str>,
        index: u32,
        scale: RenderScale,
    ) -> Result<DynamicImage, FolioError> {
        let pdfium = bind()?;
        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let detail = format!("{:?}", e);
            if detail.contains("Password") || detail.contains("password") {
                if password.is_some() {
                    FolioError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    FolioError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                FolioError::Rasterize(format!("cannot open {}: {}", path.display(), detail))
            }
        })?;

        let pages = document.pages();
        let page = pages.get(index as u16).map_err(|e| FolioError::SourceChanged {
            path: path.to_path_buf(),
            detail: format!("page {} unavailable: {:?}", index + 1, e),
        })?;

        let config = match scale {
            RenderScale::Factor(factor) => PdfRenderConfig::new().scale_page_by_factor(factor),
            RenderScale::MaxEdge(edge) => PdfRenderConfig::new()
                .set_target_width(edge as i32)
                .set_maximum_height(edge as i32),
        }
        .render_form_data(true);

        let bitmap = page.render_with_config(&config).map_err(|e| {
            FolioError::Rasterize(format!("page {}: {:?}", index + 1, e))
        })?;
        let image = bitmap.as_image();
        debug!(
            page = index + 1,
            width = image.width(),
            height = image.height(),
            "Rendered page"
        );
        Ok(image)
    }
}
