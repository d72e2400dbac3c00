// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Global application state — reactive signals for the Dioxus UI.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use folio_core::AppConfig;
use folio_core::human_errors::HumanError;
use folio_core::types::{ConversionParameters, ConversionSummary, EntryId, Progress};

use crate::services::app_services::{AppServices, ListRow};

/// Where the conversion panel is.
#[derive(Debug, Clone)]
pub enum ConvertStatus {
    Idle,
    Running(Progress),
    Done(ConversionSummary),
    Failed(HumanError),
}

/// Shared state accessible to all pages via `use_context`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Worklist rows as last read from the session.
    pub rows: Vec<ListRow>,
    pub page_total: u32,
    /// Selected rows, by id so selection survives reordering.
    pub selected: HashSet<EntryId>,
    /// PNG previews as `data:` URLs.
    pub thumbnails: HashMap<EntryId, String>,
    /// Protected PDFs waiting for a password, oldest first.
    pub locked: Vec<PathBuf>,
    /// Options for the next conversion.
    pub params: ConversionParameters,
    pub convert: ConvertStatus,
    /// Application settings.
    pub config: AppConfig,
    /// Status message for user feedback.
    pub status_message: Option<String>,
}

impl AppState {
    /// Create initial state from the backend services.
    pub fn new(svc: &AppServices) -> Self {
        let config = svc.config();
        Self {
            rows: svc.rows(),
            page_total: svc.page_total(),
            selected: HashSet::new(),
            thumbnails: HashMap::new(),
            locked: Vec::new(),
            params: config.default_parameters.clone(),
            convert: ConvertStatus::Idle,
            config,
            status_message: None,
        }
    }

    /// Re-read the rows after a worklist change and drop what no longer
    /// matches a row.
    pub fn reload(&mut self, svc: &AppServices) {
        self.rows = svc.rows();
        self.page_total = svc.page_total();
        let live: HashSet<EntryId> = self.rows.iter().map(|r| r.id).collect();
        self.selected.retain(|id| live.contains(id));
        self.thumbnails.retain(|id, _| live.contains(id));
    }

    /// Indices of the selected rows, in list order.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.selected.contains(&row.id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Replace the selection with the rows at `indices`.
    pub fn select_indices(&mut self, indices: &[usize]) {
        self.selected = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).map(|r| r.id))
            .collect();
    }

    pub fn is_converting(&self) -> bool {
        matches!(self.convert, ConvertStatus::Running(_))
    }

    pub fn set_thumbnail(&mut self, id: EntryId, png: &[u8]) {
        self.thumbnails.insert(id, png_data_url(png));
    }
}

/// Encode PNG bytes for an `img` `src`.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> ListRow {
        ListRow {
            id: EntryId::new(),
            name: name.into(),
            kind_label: "PNG".into(),
            pages: "1".into(),
            folder: String::new(),
            expandable: false,
        }
    }

    fn state_with(rows: Vec<ListRow>) -> AppState {
        AppState {
            rows,
            page_total: 0,
            selected: HashSet::new(),
            thumbnails: HashMap::new(),
            locked: Vec::new(),
            params: ConversionParameters::default(),
            convert: ConvertStatus::Idle,
            config: AppConfig::default(),
            status_message: None,
        }
    }

    #[test]
    fn selection_follows_list_order() {
        let mut state = state_with(vec![row("a"), row("b"), row("c")]);
        state.select_indices(&[2, 0, 9]);
        assert_eq!(state.selected_indices(), vec![0, 2]);

        state.rows.swap(0, 1);
        assert_eq!(state.selected_indices(), vec![1, 2]);
    }

    #[test]
    fn data_url_is_base64_png() {
        assert_eq!(png_data_url(b"abc"), "data:image/png;base64,YWJj");
    }
}
