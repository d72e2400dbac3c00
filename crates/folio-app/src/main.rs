// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — Assemble one PDF from images and PDF pages
//
// Entry point. Initialises logging, backend services, app state, and launches
// the Dioxus UI.

mod pages;
mod services;
mod state;

use dioxus::prelude::*;

use pages::options::Options;
use pages::settings::Settings;
use pages::worklist::Worklist;

use services::app_services::AppServices;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Folio starting");

    dioxus::launch(app);
}

/// Top-level route enum.
#[derive(Debug, Clone, Routable, PartialEq)]
enum Route {
    #[layout(TabLayout)]
    #[route("/")]
    Worklist {},
    #[route("/options")]
    Options {},
    #[route("/settings")]
    Settings {},
}

/// Root component.
fn app() -> Element {
    // Initialise backend services (session, rasteriser, thumbnail worker)
    let svc = use_hook(|| match AppServices::init() {
        Ok(s) => {
            tracing::info!("backend services initialised");
            s
        }
        Err(e) => {
            tracing::error!(error = %e, "startup failed, using defaults in a temporary folder");
            AppServices::fallback().expect("even fallback init failed")
        }
    });

    // Provide services and state as context for all pages
    use_context_provider(|| svc.clone());
    let mut state = use_context_provider(|| Signal::new(state::AppState::new(&svc)));

    // Deliver rendered thumbnails to the list as they arrive
    let thumbs = svc.clone();
    use_future(move || {
        let svc = thumbs.clone();
        async move {
            let Some(mut rx) = svc.take_thumbnail_receiver() else {
                return;
            };
            while let Some(ready) = rx.recv().await {
                state.write().set_thumbnail(ready.handle, &ready.png);
            }
            tracing::debug!("thumbnail channel closed");
        }
    });

    rsx! {
        Router::<Route> {}
    }
}

/// Persistent bottom tab layout wrapping all pages.
#[component]
fn TabLayout() -> Element {
    rsx! {
        div { class: "app-container",
            style: "display: flex; flex-direction: column; height: 100vh; font-family: system-ui, -apple-system, sans-serif;",

            // Page content
            div { class: "page-content",
                style: "flex: 1; overflow-y: auto; padding: 16px;",
                Outlet::<Route> {}
            }

            // Bottom tab bar
            nav { class: "tab-bar",
                style: "display: flex; justify-content: space-around; padding: 8px 0; border-top: 1px solid #e0e0e0; background: #fafafa;",
                TabButton { to: Route::Worklist {}, label: "Files", icon: "F" }
                TabButton { to: Route::Options {}, label: "Options", icon: "O" }
                TabButton { to: Route::Settings {}, label: "Settings", icon: "S" }
            }
        }
    }
}

#[component]
fn TabButton(to: Route, label: &'static str, icon: &'static str) -> Element {
    rsx! {
        Link { to: to,
            style: "display: flex; flex-direction: column; align-items: center; text-decoration: none; color: #333; font-size: 12px;",
            span { style: "font-size: 20px;", "{icon}" }
            span { "{label}" }
        }
    }
}
