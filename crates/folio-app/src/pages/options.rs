// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Options page — page size and layout, image handling, encryption and
// document metadata for the next conversion.

use dioxus::prelude::*;

use folio_core::types::{MAX_QUALITY, MIN_QUALITY, Orientation, PageSize, ScaleMode};

use crate::pages::settings::SettingRow;
use crate::services::app_services::AppServices;
use crate::state::AppState;

const FIELD: &str = "padding: 4px 8px; border: 1px solid #ccc; border-radius: 4px;";
const ROW: &str = "display: flex; justify-content: space-between; align-items: center; padding: 12px 0; border-bottom: 1px solid #f0f0f0;";
const CUSTOM_LABEL: &str = "Custom";

#[component]
pub fn Options() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let mut save_msg = use_signal(|| Option::<String>::None);

    let params = state.read().params.clone();
    let converting = state.read().is_converting();
    let (custom_w, custom_h) = match params.page_size {
        PageSize::Custom {
            width_pt,
            height_pt,
        } => (width_pt, height_pt),
        _ => (0.0, 0.0),
    };
    let is_custom = matches!(params.page_size, PageSize::Custom { .. });
    let password = params.owner_password.clone().unwrap_or_default();

    rsx! {
        div {
            h1 { "Options" }
            if converting {
                p { style: "color: #856404; background: #fff3cd; padding: 8px; border-radius: 6px;",
                    "A conversion is running. Changes apply to the next one."
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "Pages" }
                div { style: ROW,
                    span { "Page size" }
                    select {
                        style: FIELD,
                        value: params.page_size.label(),
                        onchange: move |evt| {
                            let label = evt.value();
                            if label == CUSTOM_LABEL {
                                let (w, h) = state.read().params.oriented_target().unwrap_or((595.27, 841.89));
                                state.write().params.page_size = PageSize::Custom { width_pt: w, height_pt: h };
                            } else if let Some(size) = PageSize::from_label(&label) {
                                state.write().params.page_size = size;
                            }
                        },
                        for preset in PageSize::PRESETS {
                            option { value: preset.label(), "{preset.label()}" }
                        }
                        option { value: CUSTOM_LABEL, "{CUSTOM_LABEL}" }
                    }
                }
                if is_custom {
                    div { style: ROW,
                        span { "Width x height (points)" }
                        div { style: "display: flex; gap: 4px;",
                            input {
                                r#type: "number",
                                style: "width: 80px; {FIELD}",
                                value: "{custom_w}",
                                onchange: move |evt| {
                                    if let Ok(w) = evt.value().parse::<f32>()
                                        && w > 0.0
                                    {
                                        state.write().params.page_size = PageSize::Custom { width_pt: w, height_pt: custom_h };
                                    }
                                },
                            }
                            input {
                                r#type: "number",
                                style: "width: 80px; {FIELD}",
                                value: "{custom_h}",
                                onchange: move |evt| {
                                    if let Ok(h) = evt.value().parse::<f32>()
                                        && h > 0.0
                                    {
                                        state.write().params.page_size = PageSize::Custom { width_pt: custom_w, height_pt: h };
                                    }
                                },
                            }
                        }
                    }
                }
                div { style: ROW,
                    span { "Orientation" }
                    select {
                        style: FIELD,
                        value: orientation_label(params.orientation),
                        onchange: move |evt| {
                            state.write().params.orientation = match evt.value().as_str() {
                                "Landscape" => Orientation::Landscape,
                                _ => Orientation::Portrait,
                            };
                        },
                        option { value: "Portrait", "Portrait" }
                        option { value: "Landscape", "Landscape" }
                    }
                }
                div { style: ROW,
                    span { "Placement" }
                    select {
                        style: FIELD,
                        value: scale_mode_label(params.scale_mode),
                        onchange: move |evt| {
                            state.write().params.scale_mode = match evt.value().as_str() {
                                "Preserve" => ScaleMode::Preserve,
                                _ => ScaleMode::Fill,
                            };
                        },
                        option { value: "Fill", "Fit to page" }
                        option { value: "Preserve", "Keep original size" }
                    }
                }
                SettingRow {
                    label: "Rotate pages to match content",
                    checked: params.auto_rotate,
                    on_toggle: move |v: bool| { state.write().params.auto_rotate = v; },
                }
                SettingRow {
                    label: "Flatten PDF pages into images",
                    checked: params.flatten,
                    on_toggle: move |v: bool| { state.write().params.flatten = v; },
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "Images" }
                SettingRow {
                    label: "Grayscale",
                    checked: params.grayscale,
                    on_toggle: move |v: bool| { state.write().params.grayscale = v; },
                }
                SettingRow {
                    label: "Compress images (JPEG)",
                    checked: params.compress,
                    on_toggle: move |v: bool| { state.write().params.compress = v; },
                }
                if params.compress {
                    div { style: ROW,
                        span { "Quality ({MIN_QUALITY}-{MAX_QUALITY})" }
                        input {
                            r#type: "number",
                            style: "width: 80px; text-align: right; {FIELD}",
                            min: "{MIN_QUALITY}",
                            max: "{MAX_QUALITY}",
                            value: "{params.quality}",
                            onchange: move |evt| {
                                if let Ok(q) = evt.value().parse::<u8>() {
                                    state.write().params.quality = q.clamp(MIN_QUALITY, MAX_QUALITY);
                                }
                            },
                        }
                    }
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "Security" }
                SettingRow {
                    label: "Protect the PDF with a password",
                    checked: params.encrypt,
                    on_toggle: move |v: bool| { state.write().params.encrypt = v; },
                }
                if params.encrypt {
                    div { style: ROW,
                        span { "Password" }
                        input {
                            r#type: "password",
                            style: FIELD,
                            value: "{password}",
                            oninput: move |evt| {
                                let value = evt.value();
                                state.write().params.owner_password = (!value.is_empty()).then_some(value);
                            },
                        }
                    }
                    if password.is_empty() {
                        p { style: "color: #721c24; font-size: 13px;", "Enter a password to encrypt the PDF." }
                    }
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "Document Info" }
                MetadataField {
                    label: "Title",
                    value: params.metadata.title.clone(),
                    on_change: move |v: String| { state.write().params.metadata.title = v; },
                }
                MetadataField {
                    label: "Author",
                    value: params.metadata.author.clone(),
                    on_change: move |v: String| { state.write().params.metadata.author = v; },
                }
                MetadataField {
                    label: "Subject",
                    value: params.metadata.subject.clone(),
                    on_change: move |v: String| { state.write().params.metadata.subject = v; },
                }
                MetadataField {
                    label: "Keywords",
                    value: params.metadata.keywords.clone(),
                    on_change: move |v: String| { state.write().params.metadata.keywords = v; },
                }
            }

            div { style: "display: flex; gap: 8px; margin-top: 8px;",
                button {
                    style: "flex: 1; padding: 12px; border-radius: 8px; border: none; background: #007aff; color: white; font-size: 16px;",
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let mut config = state.read().config.clone();
                            config.default_parameters = state.read().params.clone();
                            config.default_parameters.owner_password = None;
                            match svc.save_config(&config) {
                                Ok(()) => {
                                    tracing::info!("default options saved");
                                    state.write().config = config;
                                    save_msg.set(Some("Saved as defaults. Passwords are never saved.".into()));
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "failed to save default options");
                                    save_msg.set(Some(format!("Save failed: {e}")));
                                }
                            }
                        }
                    },
                    "Save as Defaults"
                }
                button {
                    style: "flex: 1; padding: 12px; border-radius: 8px; border: 1px solid #ccc; background: white; font-size: 16px;",
                    onclick: move |_| {
                        let defaults = state.read().config.default_parameters.clone();
                        state.write().params = defaults;
                        save_msg.set(None);
                    },
                    "Reset"
                }
            }
            if let Some(ref msg) = *save_msg.read() {
                p { style: "color: #34c759; font-size: 14px; text-align: center; margin-top: 8px;",
                    "{msg}"
                }
            }
        }
    }
}

#[component]
fn MetadataField(label: &'static str, value: String, on_change: EventHandler<String>) -> Element {
    rsx! {
        div { style: ROW,
            span { "{label}" }
            input {
                r#type: "text",
                style: "width: 60%; {FIELD}",
                value: "{value}",
                oninput: move |evt| on_change.call(evt.value()),
            }
        }
    }
}

fn orientation_label(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Portrait => "Portrait",
        Orientation::Landscape => "Landscape",
    }
}

fn scale_mode_label(mode: ScaleMode) -> &'static str {
    match mode {
        ScaleMode::Fill => "Fill",
        ScaleMode::Preserve => "Preserve",
    }
}
