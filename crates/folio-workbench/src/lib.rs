// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-workbench — Everything between the UI and the document library.
//
// Owns the worklist (with its password store and open-document cache), turns
// a worklist snapshot into one PDF, runs that conversion in the background,
// and renders list thumbnails on a dedicated thread.

pub mod doc_cache;
pub mod passwords;
pub mod pipeline;
pub mod runner;
pub mod session;
pub mod thumbnails;
pub mod worklist;

pub use pipeline::{ImageTransform, PageMode, Pipeline, SourcePlan};
pub use runner::{ConversionJob, run_in_background};
pub use session::Session;
pub use thumbnails::{ThumbnailCache, ThumbnailReady, ThumbnailWorker};
pub use worklist::{
    AddReport, Direction, NoPrompt, PageRange, PasswordPrompt, SkipReason, Worklist,
    WorklistEntry, WorklistSnapshot,
};
