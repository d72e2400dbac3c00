// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Source errors --
    #[error("unsupported source file: {0}")]
    UnsupportedSource(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("page rasterisation failed: {0}")]
    Rasterize(String),

    #[error("no page rasteriser is available in this build")]
    RasterizerUnavailable,

    #[error("{} is password protected", path.display())]
    PasswordRequired { path: PathBuf },

    #[error("wrong password for {}", path.display())]
    WrongPassword { path: PathBuf },

    #[error("{} changed since it was added: {detail}", path.display())]
    SourceChanged { path: PathBuf, detail: String },

    // -- Output errors --
    #[error("encryption failed: {0}")]
    Encryption(String),

    // -- Request validation --
    #[error("the worklist is empty")]
    EmptyWorklist,

    #[error("encryption was requested without a password")]
    MissingPassword,

    #[error("no destination file was chosen")]
    NoDestination,

    #[error("a conversion is already in progress")]
    ConversionInProgress,

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Background work --
    #[error("background worker failed: {0}")]
    Worker(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
