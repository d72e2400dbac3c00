// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Files page — the worklist: add, order, expand and remove sources, unlock
// protected PDFs, then convert everything into one PDF.

use std::path::PathBuf;

use dioxus::prelude::*;

use folio_core::error::Result;
use folio_core::human_errors::humanize_error;
use folio_core::types::{Progress, SUPPORTED_EXTENSIONS};
use folio_workbench::Direction;

use crate::services::app_services::{AppServices, ListRow};
use crate::state::{AppState, ConvertStatus};

const BUTTON: &str = "padding: 6px 12px; border-radius: 6px; border: 1px solid #ccc; background: white; font-size: 13px;";

#[component]
pub fn Worklist() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();

    let converting = state.read().is_converting();
    let rows = state.read().rows.clone();
    let has_selection = !state.read().selected.is_empty();
    let can_expand = rows
        .iter()
        .any(|r| r.expandable && state.read().selected.contains(&r.id));
    let all_selected = !rows.is_empty() && state.read().selected.len() == rows.len();
    let page_total = state.read().page_total;
    let locked = state.read().locked.first().cloned();

    rsx! {
        div {
            h1 { "Folio" }
            p { style: "color: #666;", "Combine images and PDF pages into one PDF" }

            // Toolbar
            div { style: "display: flex; flex-wrap: wrap; gap: 6px; margin: 16px 0;",
                button {
                    style: "padding: 6px 12px; border-radius: 6px; border: 1px solid #007aff; color: #007aff; background: white; font-size: 13px;",
                    disabled: converting,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            #[cfg(not(any(target_os = "ios", target_os = "android")))]
                            {
                                if let Some(paths) = rfd::FileDialog::new()
                                    .add_filter("Images and PDFs", SUPPORTED_EXTENSIONS)
                                    .pick_files()
                                {
                                    add_files(state, &svc, paths);
                                }
                            }
                            #[cfg(any(target_os = "ios", target_os = "android"))]
                            {
                                state.write().status_message = Some("File picker not available on this platform".into());
                            }
                        }
                    },
                    "Add Files"
                }
                button {
                    style: BUTTON,
                    disabled: converting || !can_expand,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let indices = state.read().selected_indices();
                            let result = svc
                                .expand(&indices)
                                .map(|n| Some(format!("Split into {n} pages.")));
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Expand Pages"
                }
                button {
                    style: BUTTON,
                    disabled: converting || !has_selection,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let indices = state.read().selected_indices();
                            let result = svc.move_selection(&indices, Direction::Up).map(|_| None);
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Move Up"
                }
                button {
                    style: BUTTON,
                    disabled: converting || !has_selection,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let indices = state.read().selected_indices();
                            let result = svc.move_selection(&indices, Direction::Down).map(|_| None);
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Move Down"
                }
                button {
                    style: BUTTON,
                    disabled: converting || rows.len() < 2,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let result = svc.sort(false).map(|_| None);
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Sort A-Z"
                }
                button {
                    style: BUTTON,
                    disabled: converting || rows.len() < 2,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let result = svc.sort(true).map(|_| None);
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Sort Z-A"
                }
                button {
                    style: BUTTON,
                    disabled: converting || !has_selection,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let indices = state.read().selected_indices();
                            let result = svc.remove(&indices).map(|_| None);
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Remove"
                }
                button {
                    style: BUTTON,
                    disabled: converting || rows.is_empty(),
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let result = svc.clear().map(|_| Some("List cleared.".to_string()));
                            state.write().locked.clear();
                            apply_edit(state, &svc, result);
                        }
                    },
                    "Clear"
                }
            }

            if let Some(path) = locked {
                PasswordPanel { key: "{path.display()}", path: path.clone() }
            }

            // The list
            if rows.is_empty() {
                p { style: "color: #888; padding: 24px 0; text-align: center;",
                    "No files yet. Add images or PDFs to get started."
                }
            } else {
                div { style: "display: flex; align-items: center; gap: 8px; padding: 8px 0; border-bottom: 1px solid #e0e0e0; font-size: 13px; color: #666;",
                    input {
                        r#type: "checkbox",
                        checked: all_selected,
                        disabled: converting,
                        onchange: move |evt| {
                            let mut s = state.write();
                            if evt.checked() {
                                let every: Vec<usize> = (0..s.rows.len()).collect();
                                s.select_indices(&every);
                            } else {
                                s.selected.clear();
                            }
                        },
                    }
                    span { "{rows.len()} items, {page_total} pages" }
                }
                for row in rows.iter() {
                    EntryRow {
                        key: "{row.id}",
                        selected: state.read().selected.contains(&row.id),
                        thumbnail: state.read().thumbnails.get(&row.id).cloned(),
                        disabled: converting,
                        row: row.clone(),
                    }
                }
            }

            if let Some(ref msg) = state.read().status_message {
                p { style: "color: #555; font-size: 14px; margin-top: 12px; white-space: pre-line;", "{msg}" }
            }

            ConvertPanel {}
        }
    }
}

#[component]
fn EntryRow(row: ListRow, selected: bool, thumbnail: Option<String>, disabled: bool) -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let id = row.id;

    rsx! {
        div { style: "display: flex; align-items: center; gap: 12px; padding: 8px 0; border-bottom: 1px solid #f0f0f0;",
            input {
                r#type: "checkbox",
                checked: selected,
                disabled: disabled,
                onchange: move |evt| {
                    if evt.checked() {
                        state.write().selected.insert(id);
                    } else {
                        state.write().selected.remove(&id);
                    }
                },
            }
            if let Some(url) = thumbnail {
                img { style: "width: 48px; height: 48px; object-fit: contain; background: #f5f5f5;", src: "{url}" }
            } else {
                div { style: "width: 48px; height: 48px; background: #f0f0f0;" }
            }
            div { style: "flex: 1; min-width: 0;",
                div { style: "font-weight: 500; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;", "{row.name}" }
                div { style: "color: #888; font-size: 12px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;", "{row.folder}" }
            }
            span { style: "color: #666; font-size: 12px; width: 48px;", "{row.kind_label}" }
            span { style: "color: #666; font-size: 12px; width: 64px; text-align: right;", "p. {row.pages}" }
        }
    }
}

/// Password form for the oldest locked PDF.
#[component]
fn PasswordPanel(path: PathBuf) -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let mut password = use_signal(String::new);
    let mut wrong = use_signal(|| false);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    rsx! {
        div { style: "padding: 12px; margin: 8px 0; border-radius: 8px; background: #fff3cd;",
            p { style: "margin: 0 0 8px 0;", "\"{name}\" is password protected." }
            if *wrong.read() {
                p { style: "color: #721c24; font-size: 13px; margin: 0 0 8px 0;", "That password didn't work. Try again." }
            }
            div { style: "display: flex; gap: 8px;",
                input {
                    r#type: "password",
                    style: "flex: 1; padding: 6px; border: 1px solid #ccc; border-radius: 4px;",
                    value: "{password}",
                    oninput: move |evt| password.set(evt.value()),
                }
                button {
                    style: BUTTON,
                    onclick: {
                        let path = path.clone();
                        let name = name.clone();
                        move |_| {
                            let attempt = password.read().clone();
                            match svc.unlock(&path, &attempt) {
                                Ok(true) => {
                                    let mut s = state.write();
                                    s.locked.retain(|p| p != &path);
                                    s.status_message = Some(format!("Unlocked {name}."));
                                    s.reload(&svc);
                                }
                                Ok(false) => {
                                    wrong.set(true);
                                    password.set(String::new());
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, path = %path.display(), "unlock failed");
                                    let mut s = state.write();
                                    s.locked.retain(|p| p != &path);
                                    s.status_message = Some(format!("{name}: {}", humanize_error(&e).message));
                                }
                            }
                        }
                    },
                    "Unlock"
                }
                button {
                    style: BUTTON,
                    onclick: {
                        let path = path.clone();
                        let name = name.clone();
                        move |_| {
                            let mut s = state.write();
                            s.locked.retain(|p| p != &path);
                            s.status_message = Some(format!("Skipped {name}."));
                        }
                    },
                    "Skip"
                }
            }
        }
    }
}

/// Convert button, progress bar and result.
#[component]
fn ConvertPanel() -> Element {
    let state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let status = state.read().convert.clone();
    let empty = state.read().rows.is_empty();

    let body = match status {
        ConvertStatus::Idle => rsx! {
            button {
                style: "width: 100%; padding: 12px; border-radius: 8px; border: none; background: #007aff; color: white; font-size: 16px;",
                disabled: empty,
                onclick: move |_| start_conversion(state, svc.clone()),
                "Convert to PDF"
            }
        },
        ConvertStatus::Running(progress) => rsx! {
            p { "Converting page {progress.pages_done} of {progress.pages_total}..." }
            div { style: "height: 8px; border-radius: 4px; background: #e0e0e0; overflow: hidden;",
                div { style: "height: 100%; width: {progress.percent()}%; background: #007aff;" }
            }
        },
        ConvertStatus::Done(summary) => {
            let protected = if summary.encrypted { ", password protected" } else { "" };
            rsx! {
                div { style: "padding: 12px; border-radius: 8px; background: #d4edda; color: #155724;",
                    p { style: "margin: 0;", "Saved {summary.pages} pages to {summary.output.display()}" }
                    p { style: "margin: 4px 0 0 0; font-size: 13px;", "{summary.bytes_written} bytes{protected}" }
                }
                AcknowledgeButton {}
            }
        }
        ConvertStatus::Failed(human) => rsx! {
            div { style: "padding: 12px; border-radius: 8px; background: #f8d7da; color: #721c24;",
                p { style: "margin: 0; font-weight: 500;", "{human.message}" }
                p { style: "margin: 4px 0 0 0; font-size: 13px;", "{human.suggestion}" }
            }
            AcknowledgeButton {}
        },
    };

    rsx! {
        section { style: "margin: 24px 0;", {body} }
    }
}

#[component]
fn AcknowledgeButton() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();

    rsx! {
        button {
            style: "margin-top: 8px; {BUTTON}",
            onclick: move |_| {
                svc.acknowledge();
                state.write().convert = ConvertStatus::Idle;
            },
            "OK"
        }
    }
}

/// Ask for a destination and run the conversion, streaming progress into
/// the state.
fn start_conversion(mut state: Signal<AppState>, svc: AppServices) {
    let params = state.read().params.clone();
    let start_dir = state.read().config.last_output_dir.clone();
    let destination = pick_destination(start_dir);
    let total = state.read().page_total;
    state.write().convert = ConvertStatus::Running(Progress {
        pages_done: 0,
        pages_total: total,
    });

    spawn(async move {
        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel();
        let pump = async move {
            while let Some(progress) = progress_rx.recv().await {
                state.write().convert = ConvertStatus::Running(progress);
            }
        };
        let (outcome, ()) = tokio::join!(svc.convert(params, destination, progress_tx), pump);

        let status = match outcome {
            Ok(summary) => {
                tracing::info!(output = %summary.output.display(), pages = summary.pages, "conversion finished");
                state.write().config = svc.config();
                ConvertStatus::Done(summary)
            }
            Err(human) => ConvertStatus::Failed(human),
        };
        state.write().convert = status;
    });
}

#[cfg(not(any(target_os = "ios", target_os = "android")))]
fn pick_destination(start_dir: Option<PathBuf>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .add_filter("PDF", &["pdf"])
        .set_file_name("output.pdf");
    if let Some(dir) = start_dir {
        dialog = dialog.set_directory(dir);
    }
    dialog.save_file()
}

#[cfg(any(target_os = "ios", target_os = "android"))]
fn pick_destination(_start_dir: Option<PathBuf>) -> Option<PathBuf> {
    None
}

fn add_files(mut state: Signal<AppState>, svc: &AppServices, paths: Vec<PathBuf>) {
    match svc.add_files(paths) {
        Ok(outcome) => {
            let mut lines = vec![format!("Added {} files.", outcome.added)];
            lines.extend(outcome.problems);
            let mut s = state.write();
            for path in outcome.locked {
                if !s.locked.contains(&path) {
                    s.locked.push(path);
                }
            }
            s.status_message = Some(lines.join("\n"));
            s.reload(svc);
        }
        Err(e) => apply_edit(state, svc, Err(e)),
    }
}

/// Re-read the rows after a worklist edit and show its message or error.
fn apply_edit(mut state: Signal<AppState>, svc: &AppServices, result: Result<Option<String>>) {
    let mut s = state.write();
    match result {
        Ok(message) => s.status_message = message,
        Err(e) => {
            tracing::warn!(error = %e, "worklist edit refused");
            s.status_message = Some(humanize_error(&e).message);
        }
    }
    s.reload(svc);
}
