// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — owns the session, the thumbnail worker and the
// rasteriser, and provides methods for the Dioxus UI to call.
//
// The session is `Send` but not `Sync`, so it is wrapped in `Arc<Mutex<>>`
// for sharing across the Dioxus task pool. Every call under the lock is
// short; the conversion itself runs on tokio's blocking pool against a
// snapshot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use folio_core::AppConfig;
use folio_core::error::{FolioError, Result};
use folio_core::human_errors::{HumanError, humanize_error};
use folio_core::types::{ConversionParameters, ConversionSummary, EntryId, Progress, SourceKind};
use folio_document::{PageRasterizer, default_rasterizer};
use folio_workbench::{
    Direction, Session, SkipReason, ThumbnailCache, ThumbnailReady, ThumbnailWorker,
    run_in_background,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info, warn};

use super::data_dir;

/// One worklist row, ready for the list view.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub id: EntryId,
    pub name: String,
    pub kind_label: String,
    /// Output pages this row produces, e.g. `"3"` or `"3 ~ 5"`.
    pub pages: String,
    pub folder: String,
    /// A whole PDF that can be split into pages.
    pub expandable: bool,
}

/// What happened to one batch of added files.
#[derive(Debug, Clone, Default)]
pub struct AddOutcome {
    pub added: usize,
    /// Protected PDFs waiting for a password.
    pub locked: Vec<PathBuf>,
    /// One line per skipped file.
    pub problems: Vec<String>,
}

/// Shared application services accessible from all Dioxus components via
/// `use_context::<AppServices>()`.
///
/// All fields are cheaply cloneable (Arc-wrapped) so that the struct can be
/// passed into closures and async blocks without lifetime issues.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<Mutex<Session>>,
    thumbnails: Arc<ThumbnailWorker>,
    thumbnail_rx: Arc<Mutex<Option<UnboundedReceiver<ThumbnailReady>>>>,
    rasterizer: Arc<dyn PageRasterizer>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl AppServices {
    /// Initialise all services. Call once at app startup.
    ///
    /// Loads the persisted config, picks a page rasteriser and starts the
    /// thumbnail worker.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir();
        let config = load_config(&dir).unwrap_or_default();
        Self::start(dir, config)
    }

    /// Start with default settings in a temporary directory.
    pub fn fallback() -> Result<Self> {
        let dir = std::env::temp_dir().join("folio");
        std::fs::create_dir_all(&dir)?;
        Self::start(dir, AppConfig::default())
    }

    fn start(dir: PathBuf, config: AppConfig) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");

        let rasterizer = default_rasterizer();
        let cache = ThumbnailCache::new();
        let (ready_tx, ready_rx) = unbounded_channel();
        let worker = ThumbnailWorker::spawn(
            cache.clone(),
            Arc::clone(&rasterizer),
            config.thumbnail_edge_px,
            ready_tx,
        )?;

        info!("app services initialised");

        Ok(Self {
            session: Arc::new(Mutex::new(Session::new(cache))),
            thumbnails: Arc::new(worker),
            thumbnail_rx: Arc::new(Mutex::new(Some(ready_rx))),
            rasterizer,
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        })
    }

    // -- Worklist ------------------------------------------------------------

    /// Current rows for the list view.
    pub fn rows(&self) -> Vec<ListRow> {
        let session = self.session.lock().expect("session lock poisoned");
        let list = session.worklist();
        list.entries()
            .iter()
            .zip(list.page_ranges())
            .map(|(entry, range)| ListRow {
                id: entry.id,
                name: entry.display_name(),
                kind_label: SourceKind::label_for(&entry.source_path),
                pages: range.to_string(),
                folder: entry
                    .source_path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                expandable: entry.kind == SourceKind::Document && entry.is_whole(),
            })
            .collect()
    }

    /// Total output pages of the current worklist.
    pub fn page_total(&self) -> u32 {
        self.session
            .lock()
            .expect("session lock poisoned")
            .worklist()
            .page_total()
    }

    /// Add files picked by the user.
    ///
    /// Protected PDFs are not prompted for here; they come back in
    /// [`AddOutcome::locked`] so the UI can ask for each password.
    pub fn add_files(&self, paths: Vec<PathBuf>) -> Result<AddOutcome> {
        let mut locked = Vec::new();
        let report = {
            let mut session = self.session.lock().expect("session lock poisoned");
            let mut defer = |path: &Path, _rejected: bool| -> Option<String> {
                locked.push(path.to_path_buf());
                None
            };
            session.worklist_mut()?.add(paths, &mut defer)
        };

        let problems = report
            .skipped
            .iter()
            .filter_map(|(path, reason)| {
                let name = path.display();
                match reason {
                    SkipReason::Unsupported => Some(format!("{name}: not a supported file type")),
                    SkipReason::Duplicate => Some(format!("{name}: already in the list")),
                    SkipReason::Unreadable(detail) => Some(format!("{name}: {detail}")),
                    SkipReason::Abandoned => None,
                }
            })
            .collect();

        info!(added = report.added.len(), locked = locked.len(), "files added");
        self.refresh_thumbnails();
        Ok(AddOutcome {
            added: report.added.len(),
            locked,
            problems,
        })
    }

    /// Try `password` on a protected PDF left over from [`Self::add_files`].
    ///
    /// Returns `Ok(false)` when the password is wrong.
    pub fn unlock(&self, path: &Path, password: &str) -> Result<bool> {
        let mut offered = false;
        let mut rejected = false;
        let report = {
            let mut session = self.session.lock().expect("session lock poisoned");
            let mut once = |_: &Path, was_rejected: bool| -> Option<String> {
                if was_rejected {
                    rejected = true;
                }
                if offered {
                    return None;
                }
                offered = true;
                Some(password.to_owned())
            };
            session.worklist_mut()?.add([path], &mut once)
        };

        if rejected {
            info!(path = %path.display(), "password rejected");
            return Ok(false);
        }
        if let Some((_, SkipReason::Unreadable(detail))) = report.skipped.first() {
            return Err(FolioError::PdfError(detail.clone()));
        }
        self.refresh_thumbnails();
        Ok(!report.added.is_empty())
    }

    /// Split the selected whole PDFs into one row per page.
    pub fn expand(&self, indices: &[usize]) -> Result<usize> {
        let added = {
            let mut session = self.session.lock().expect("session lock poisoned");
            session.worklist_mut()?.expand_many(indices)?
        };
        self.refresh_thumbnails();
        Ok(added.len())
    }

    /// Move the selected rows one step. Returns their new indices.
    pub fn move_selection(&self, indices: &[usize], direction: Direction) -> Result<Vec<usize>> {
        let moved = {
            let mut session = self.session.lock().expect("session lock poisoned");
            session.worklist_mut()?.move_selection(indices, direction)?
        };
        self.refresh_thumbnails();
        Ok(moved)
    }

    /// Sort the rows by file name.
    pub fn sort(&self, descending: bool) -> Result<()> {
        {
            let mut session = self.session.lock().expect("session lock poisoned");
            session.worklist_mut()?.sort(descending);
        }
        self.refresh_thumbnails();
        Ok(())
    }

    pub fn remove(&self, indices: &[usize]) -> Result<()> {
        self.session
            .lock()
            .expect("session lock poisoned")
            .remove(indices)?;
        self.refresh_thumbnails();
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.session.lock().expect("session lock poisoned").clear()?;
        self.thumbnails.invalidate_pending();
        Ok(())
    }

    // -- Thumbnails ----------------------------------------------------------

    /// Drop queued previews and ask for one per current row.
    ///
    /// Cached previews come straight back, so this runs after every change
    /// to the list.
    pub fn refresh_thumbnails(&self) {
        self.thumbnails.invalidate_pending();
        let session = self.session.lock().expect("session lock poisoned");
        let list = session.worklist();
        for entry in list.entries() {
            self.thumbnails
                .request(entry, list.passwords().get(&entry.source_path));
        }
    }

    /// Hand the preview channel to the UI task. Only the first call gets it.
    pub fn take_thumbnail_receiver(&self) -> Option<UnboundedReceiver<ThumbnailReady>> {
        self.thumbnail_rx
            .lock()
            .expect("thumbnail receiver lock poisoned")
            .take()
    }

    // -- Conversion ----------------------------------------------------------

    pub fn is_converting(&self) -> bool {
        self.session
            .lock()
            .expect("session lock poisoned")
            .is_converting()
    }

    /// Convert the worklist into `destination`, streaming progress.
    ///
    /// The worklist is locked until the conversion finishes. Errors come
    /// back ready for display.
    pub async fn convert(
        &self,
        params: ConversionParameters,
        destination: Option<PathBuf>,
        progress_tx: UnboundedSender<Progress>,
    ) -> std::result::Result<ConversionSummary, HumanError> {
        let job = self
            .session
            .lock()
            .expect("session lock poisoned")
            .begin_conversion(&params, destination)
            .map_err(|e| humanize_error(&e))?;

        let output_dir = job.destination.parent().map(Path::to_path_buf);
        let outcome = run_in_background(job, Arc::clone(&self.rasterizer), progress_tx).await;
        let human = outcome.as_ref().err().map(humanize_error);
        let summary = outcome.as_ref().ok().cloned();

        self.session
            .lock()
            .expect("session lock poisoned")
            .finish_conversion(outcome);

        let Some(summary) = summary else {
            return Err(human.unwrap_or_else(|| humanize_error(&FolioError::Worker(
                "conversion ended without a result".into(),
            ))));
        };

        let mut config = self.config();
        if config.last_output_dir != output_dir {
            config.last_output_dir = output_dir;
            if let Err(e) = self.save_config(&config) {
                warn!(error = %e, "failed to remember output folder");
            }
        }
        if config.open_folder_after_save
            && let Some(folder) = summary.output.parent()
        {
            open_folder(folder);
        }

        Ok(summary)
    }

    /// Return from a finished conversion to idle.
    pub fn acknowledge(&self) {
        self.session
            .lock()
            .expect("session lock poisoned")
            .acknowledge();
    }

    // -- Config Persistence --------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config.lock().expect("config lock poisoned") = config.clone();
        persist_config(&self.data_dir, config)
    }
}

/// Open `folder` in the platform file manager.
fn open_folder(folder: &Path) {
    #[cfg(target_os = "macos")]
    let command = "open";
    #[cfg(target_os = "windows")]
    let command = "explorer";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let command = "xdg-open";

    match std::process::Command::new(command).arg(folder).spawn() {
        Ok(_) => info!(folder = %folder.display(), "opened output folder"),
        Err(e) => error!(error = %e, command, "failed to open output folder"),
    }
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
