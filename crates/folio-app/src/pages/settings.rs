// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings page — persistent app configuration.

use dioxus::prelude::*;

use crate::services::app_services::AppServices;
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[component]
pub fn Settings() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let mut save_msg = use_signal(|| Option::<String>::None);
    let last_dir = state
        .read()
        .config
        .last_output_dir
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "None yet".into());

    rsx! {
        div {
            h1 { "Settings" }

            section { style: "margin: 16px 0;",
                h3 { "Saving" }
                SettingRow {
                    label: "Open the folder after saving",
                    checked: state.read().config.open_folder_after_save,
                    on_toggle: move |v: bool| { state.write().config.open_folder_after_save = v; },
                }
                div { style: "display: flex; justify-content: space-between; align-items: center; padding: 12px 0; border-bottom: 1px solid #f0f0f0;",
                    span { "Last output folder" }
                    span { style: "color: #888; font-size: 13px;", "{last_dir}" }
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "List" }
                // Thumbnail size
                div { style: "display: flex; justify-content: space-between; align-items: center; padding: 12px 0; border-bottom: 1px solid #f0f0f0;",
                    span { "Thumbnail size (px, after restart)" }
                    input {
                        r#type: "number",
                        style: "width: 80px; padding: 4px 8px; border: 1px solid #ccc; border-radius: 4px; text-align: right;",
                        value: "{state.read().config.thumbnail_edge_px}",
                        onchange: move |evt| {
                            if let Ok(edge) = evt.value().parse::<u32>()
                                && (16..=512).contains(&edge)
                            {
                                state.write().config.thumbnail_edge_px = edge;
                            }
                        },
                    }
                }
            }

            // Save button
            button {
                style: "width: 100%; padding: 12px; border-radius: 8px; border: none; background: #007aff; color: white; font-size: 16px; margin-top: 8px;",
                onclick: {
                    let svc = svc.clone();
                    move |_| {
                        let config = state.read().config.clone();
                        match svc.save_config(&config) {
                            Ok(()) => {
                                tracing::info!("settings saved");
                                save_msg.set(Some("Settings saved.".into()));
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "failed to save settings");
                                save_msg.set(Some(format!("Save failed: {e}")));
                            }
                        }
                    }
                },
                "Save Settings"
            }
            if let Some(ref msg) = *save_msg.read() {
                p { style: "color: #34c759; font-size: 14px; text-align: center; margin-top: 8px;",
                    "{msg}"
                }
            }

            section { style: "margin: 24px 0;",
                h3 { "About" }
                p { style: "color: #666; font-size: 14px;",
                    "Folio v{VERSION}"
                    br {}
                    "Combine images and PDF pages into one PDF"
                    br {}
                    "PMPL-1.0-or-later"
                }
            }
        }
    }
}

#[component]
pub fn SettingRow(label: &'static str, checked: bool, on_toggle: EventHandler<bool>) -> Element {
    rsx! {
        div { style: "display: flex; justify-content: space-between; align-items: center; padding: 12px 0; border-bottom: 1px solid #f0f0f0;",
            span { "{label}" }
            input {
                r#type: "checkbox",
                checked: checked,
                onchange: move |evt| {
                    on_toggle.call(evt.checked());
                },
            }
        }
    }
}
