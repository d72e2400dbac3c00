// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading source documents and assembling the output document.

pub mod embed;
pub mod geometry;
pub mod graft;
pub mod reader;
pub mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use embed::EmbeddedImage;
pub use reader::{PageGeometry, SourceDocument};
pub use writer::{FinishOptions, PdfAssembler};
