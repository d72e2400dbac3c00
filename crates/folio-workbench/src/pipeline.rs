// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion pipeline — walk a worklist snapshot in order and lay every
// source out onto output pages, then finalise and save the document.
//
// Each output page is planned as a `SourcePlan`: the source kind crossed with
// how it is rendered. The pipeline opens its own handles to every source; it
// never shares the worklist's cached documents.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_core::error::{FolioError, Result};
use folio_core::types::{ConversionParameters, ConversionSummary, Progress, SourceKind};
use folio_document::pdf::geometry::placement;
use folio_document::{
    EmbeddedImage, FinishOptions, HIGH_RES_SCALE, ImageProcessor, PageRasterizer, PdfAssembler,
    RenderScale, SourceDocument,
};
use tracing::{debug, info, instrument};

use crate::worklist::{WorklistEntry, WorklistSnapshot};

/// How an image source is turned into page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTransform {
    /// Embed the original data (JPEG as-is, anything else lossless).
    Passthrough,
    /// Decode, then apply grayscale and/or JPEG recompression.
    Reencode,
}

/// How one page of a source document is turned into an output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Copy the page object unchanged at its native size.
    Import,
    /// Draw the page as a Form XObject on a page of the target size.
    Place,
    /// Rasterise the page and place the bitmap like an image.
    Flatten,
}

/// What to do for one output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePlan {
    Image { transform: ImageTransform },
    DocumentPage { index: u32, mode: PageMode },
}

impl SourcePlan {
    pub fn for_image(params: &ConversionParameters) -> Self {
        let transform = if params.transforms_raster() {
            ImageTransform::Reencode
        } else {
            ImageTransform::Passthrough
        };
        Self::Image { transform }
    }

    pub fn for_page(index: u32, params: &ConversionParameters) -> Self {
        let mode = if params.flatten {
            PageMode::Flatten
        } else if params.page_size.dimensions_pt().is_none() {
            PageMode::Import
        } else {
            PageMode::Place
        };
        Self::DocumentPage { index, mode }
    }
}

/// Runs conversions with a given page renderer.
pub struct Pipeline {
    rasterizer: Arc<dyn PageRasterizer>,
}

impl Pipeline {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self { rasterizer }
    }

    /// Convert `snapshot` into one PDF at `destination`.
    ///
    /// `progress` is called after every output page. Any error aborts the
    /// whole run and leaves `destination` untouched.
    #[instrument(skip_all, fields(entries = snapshot.entries.len(), destination = %destination.display()))]
    pub fn run(
        &self,
        snapshot: &WorklistSnapshot,
        params: &ConversionParameters,
        destination: &Path,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<ConversionSummary> {
        if snapshot.entries.is_empty() {
            return Err(FolioError::EmptyWorklist);
        }
        let password = params.encryption_password();
        if params.encrypt && password.is_none() {
            return Err(FolioError::MissingPassword);
        }

        let pages_total = snapshot.page_total();
        info!(pages_total, "Conversion started");

        let mut run = Run {
            pipeline: self,
            params,
            snapshot,
            assembler: PdfAssembler::new(),
            documents: HashMap::new(),
            pages_done: 0,
            pages_total,
            progress,
        };
        for entry in &snapshot.entries {
            run.entry(entry)?;
        }

        let pages = run.pages_done;
        let options = FinishOptions {
            metadata: params.metadata.clone(),
            password,
        };
        let bytes_written = run.assembler.save(destination, &options)?;

        info!(pages, bytes_written, "Conversion finished");
        Ok(ConversionSummary {
            output: destination.to_path_buf(),
            pages,
            bytes_written,
            encrypted: password.is_some(),
        })
    }
}

/// State of one conversion in flight.
struct Run<'a> {
    pipeline: &'a Pipeline,
    params: &'a ConversionParameters,
    snapshot: &'a WorklistSnapshot,
    assembler: PdfAssembler,
    /// Private handles, opened on first use.
    documents: HashMap<PathBuf, SourceDocument>,
    pages_done: u32,
    pages_total: u32,
    progress: &'a mut dyn FnMut(Progress),
}

impl Run<'_> {
    fn entry(&mut self, entry: &WorklistEntry) -> Result<()> {
        let plans = match entry.kind {
            SourceKind::Image => vec![SourcePlan::for_image(self.params)],
            SourceKind::Document => self
                .page_indices(entry)?
                .into_iter()
                .map(|index| SourcePlan::for_page(index, self.params))
                .collect(),
        };
        for plan in plans {
            match plan {
                SourcePlan::Image { transform } => self.image(&entry.source_path, transform)?,
                SourcePlan::DocumentPage { index, mode } => {
                    self.document_page(&entry.source_path, index, mode)?
                }
            }
            self.page_emitted();
        }
        Ok(())
    }

    fn page_emitted(&mut self) {
        self.pages_done += 1;
        (self.progress)(Progress {
            pages_done: self.pages_done,
            pages_total: self.pages_total,
        });
    }

    /// Pages an entry expands to, checked against the document on disk.
    fn page_indices(&mut self, entry: &WorklistEntry) -> Result<Vec<u32>> {
        let count = open_cached(&mut self.documents, self.snapshot, &entry.source_path)?.page_count();
        let drift = |detail: String| FolioError::SourceChanged {
            path: entry.source_path.clone(),
            detail,
        };
        match entry.page_index {
            None if count != entry.page_count => Err(drift(format!(
                "had {} pages when added, now has {}",
                entry.page_count, count
            ))),
            None => Ok((0..count).collect()),
            Some(index) if index >= count => Err(drift(format!(
                "page {} no longer exists ({} pages)",
                index + 1,
                count
            ))),
            Some(index) => Ok(vec![index]),
        }
    }

    // -- Images ---------------------------------------------------------------

    fn image(&mut self, path: &Path, transform: ImageTransform) -> Result<()> {
        debug!(path = %path.display(), ?transform, "Image page");

        let embedded = match transform {
            ImageTransform::Passthrough => {
                let passthrough = if is_jpeg_path(path) {
                    EmbeddedImage::jpeg_passthrough(std::fs::read(path)?)
                } else {
                    None
                };
                match passthrough {
                    Some(embedded) => embedded,
                    None => EmbeddedImage::lossless(ImageProcessor::open(path)?.as_dynamic()),
                }
            }
            ImageTransform::Reencode => self.encode(ImageProcessor::open(path)?)?,
        };

        let native = (embedded.width as f32, embedded.height as f32);
        self.place_raster(&embedded, native)
    }

    /// Apply grayscale, then recompress or store losslessly.
    fn encode(&self, processor: ImageProcessor) -> Result<EmbeddedImage> {
        let processor = if self.params.grayscale {
            processor.grayscale()
        } else {
            processor
        };
        if self.params.compress {
            EmbeddedImage::jpeg(processor.into_dynamic(), self.params.effective_quality())
        } else {
            Ok(EmbeddedImage::lossless(processor.as_dynamic()))
        }
    }

    /// Put a raster on its own page. `native` is its natural size in points.
    fn place_raster(&mut self, embedded: &EmbeddedImage, native: (f32, f32)) -> Result<()> {
        let page = self.params.target_for(native.0, native.1).unwrap_or(native);
        let rect = placement(native, page, self.params.scale_mode);
        self.assembler.add_image_page(embedded, page, rect)?;
        Ok(())
    }

    // -- Document pages -------------------------------------------------------

    fn document_page(&mut self, path: &Path, index: u32, mode: PageMode) -> Result<()> {
        debug!(path = %path.display(), page = index + 1, ?mode, "Document page");

        let doc = open_cached(&mut self.documents, self.snapshot, path)?;
        match mode {
            PageMode::Import => {
                self.assembler.import_page(doc, index)?;
            }
            PageMode::Place => {
                let (w, h) = doc.page_geometry(index)?.visible_size();
                let page = self.params.target_for(w, h).unwrap_or((w, h));
                self.assembler
                    .place_page(doc, index, page, self.params.scale_mode)?;
            }
            PageMode::Flatten => {
                let native = doc.page_geometry(index)?.visible_size();
                let bitmap = self.pipeline.rasterizer.render(
                    path,
                    self.snapshot.passwords.get(path),
                    index,
                    RenderScale::Factor(HIGH_RES_SCALE),
                )?;
                let processor = ImageProcessor::from_dynamic(bitmap).flatten_alpha();
                let embedded = self.encode(processor)?;
                self.place_raster(&embedded, native)?;
            }
        }
        Ok(())
    }
}

/// The run's private handle for `path`, opened on first use with the
/// snapshot's password.
fn open_cached<'d>(
    documents: &'d mut HashMap<PathBuf, SourceDocument>,
    snapshot: &WorklistSnapshot,
    path: &Path,
) -> Result<&'d SourceDocument> {
    match documents.entry(path.to_path_buf()) {
        Entry::Occupied(slot) => Ok(slot.into_mut()),
        Entry::Vacant(slot) => {
            let doc = SourceDocument::open(path, snapshot.passwords.get(path))?;
            Ok(slot.insert(doc))
        }
    }
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}
