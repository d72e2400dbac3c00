// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application session — the worklist plus the conversion state machine.
//
//   Idle ──begin──▶ Converting ──finish──▶ Succeeded | Failed ──acknowledge──▶ Idle
//
// While a conversion runs the worklist is read-only.

use std::path::PathBuf;

use folio_core::error::{FolioError, Result};
use folio_core::types::{ConversionParameters, ConversionState, ConversionSummary};
use tracing::{info, warn};

use crate::runner::ConversionJob;
use crate::thumbnails::ThumbnailCache;
use crate::worklist::Worklist;

pub struct Session {
    worklist: Worklist,
    state: ConversionState,
    thumbnails: ThumbnailCache,
}

impl Session {
    pub fn new(thumbnails: ThumbnailCache) -> Self {
        Self {
            worklist: Worklist::new(),
            state: ConversionState::Idle,
            thumbnails,
        }
    }

    pub fn worklist(&self) -> &Worklist {
        &self.worklist
    }

    /// Mutable access to the worklist, refused while converting.
    pub fn worklist_mut(&mut self) -> Result<&mut Worklist> {
        if self.state.is_converting() {
            return Err(FolioError::ConversionInProgress);
        }
        Ok(&mut self.worklist)
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn is_converting(&self) -> bool {
        self.state.is_converting()
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Remove entries and drop the thumbnails of paths that left the list.
    pub fn remove(&mut self, indices: &[usize]) -> Result<()> {
        let orphaned = self.worklist_mut()?.remove(indices)?;
        for path in &orphaned {
            self.thumbnails.evict_path(path);
        }
        Ok(())
    }

    /// Empty the worklist and the thumbnail cache.
    pub fn clear(&mut self) -> Result<()> {
        self.worklist_mut()?.clear();
        self.thumbnails.clear();
        Ok(())
    }

    // -- Conversion -----------------------------------------------------------

    /// Check a conversion request and, if it is complete, enter `Converting`.
    ///
    /// A destination without an extension gets `.pdf`.
    pub fn begin_conversion(
        &mut self,
        params: &ConversionParameters,
        destination: Option<PathBuf>,
    ) -> Result<ConversionJob> {
        if self.state.is_converting() {
            return Err(FolioError::ConversionInProgress);
        }
        if self.worklist.is_empty() {
            return Err(FolioError::EmptyWorklist);
        }
        if params.encrypt && params.encryption_password().is_none() {
            return Err(FolioError::MissingPassword);
        }
        let mut destination = destination
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(FolioError::NoDestination)?;
        if destination.extension().is_none() {
            destination.set_extension("pdf");
        }

        info!(
            entries = self.worklist.len(),
            pages = self.worklist.page_total(),
            destination = %destination.display(),
            "Conversion starting"
        );
        self.state = ConversionState::Converting;
        Ok(ConversionJob {
            snapshot: self.worklist.snapshot(),
            params: params.clone(),
            destination,
        })
    }

    /// Record the outcome of the running conversion.
    pub fn finish_conversion(&mut self, result: Result<ConversionSummary>) -> &ConversionState {
        if !self.state.is_converting() {
            warn!(state = ?self.state, "Conversion result arrived while not converting");
        }
        self.state = match result {
            Ok(summary) => ConversionState::Succeeded(summary),
            Err(err) => ConversionState::Failed {
                message: err.to_string(),
            },
        };
        &self.state
    }

    /// Return from a finished conversion to `Idle`.
    pub fn acknowledge(&mut self) {
        if matches!(
            self.state,
            ConversionState::Succeeded(_) | ConversionState::Failed { .. }
        ) {
            self.state = ConversionState::Idle;
        }
    }
}
