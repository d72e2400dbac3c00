// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the Dioxus UI to the folio backend crates.
//
// The UI calls these methods directly; each returns data the UI can display
// without further lookups.

pub mod app_services;
pub mod data_dir;
