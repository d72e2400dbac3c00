// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thumbnail worker — a background thread that renders small PNG previews of
// worklist entries and hands them back to the UI task.
//
// The worker opens its own handle to every source and never touches the
// worklist's cached documents. Passwords arrive inside each request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use folio_core::error::Result;
use folio_core::types::{EntryId, SourceKind};
use folio_document::{ImageProcessor, PageRasterizer, RenderScale};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::worklist::WorklistEntry;

/// Default longest edge of a thumbnail, in pixels.
pub const THUMBNAIL_EDGE_PX: u32 = 120;

/// Cache key: source path and zero-based page.
pub type ThumbnailKey = (PathBuf, u32);

/// Rendered thumbnails shared between the worker and the session.
///
/// Entries are only evicted when their path leaves the worklist.
#[derive(Clone, Default)]
pub struct ThumbnailCache {
    inner: Arc<Mutex<CacheInner>>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<ThumbnailKey, Arc<Vec<u8>>>,
    /// Bumped by every eviction.
    epoch: u64,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().expect("thumbnail cache lock poisoned")
    }

    pub fn get(&self, key: &ThumbnailKey) -> Option<Arc<Vec<u8>>> {
        self.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: ThumbnailKey, png: Vec<u8>) -> Arc<Vec<u8>> {
        let png = Arc::new(png);
        self.lock().entries.insert(key, Arc::clone(&png));
        png
    }

    /// Eviction counter, read before a render starts.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Store `png` only if nothing was evicted since `epoch` was read.
    pub fn insert_since(&self, epoch: u64, key: ThumbnailKey, png: Vec<u8>) -> Arc<Vec<u8>> {
        let png = Arc::new(png);
        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.entries.insert(key, Arc::clone(&png));
        }
        png
    }

    /// Drop every page of `path`.
    pub fn evict_path(&self, path: &Path) {
        let mut inner = self.lock();
        inner.entries.retain(|(p, _), _| p != path);
        inner.epoch += 1;
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.epoch += 1;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One preview to render.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub handle: EntryId,
    pub source_path: PathBuf,
    pub kind: SourceKind,
    pub page_index: u32,
    pub password: Option<String>,
    pub generation: u64,
}

impl ThumbnailRequest {
    pub fn key(&self) -> ThumbnailKey {
        (self.source_path.clone(), self.page_index)
    }
}

/// A rendered preview, addressed to the row that asked for it.
#[derive(Debug, Clone)]
pub struct ThumbnailReady {
    pub handle: EntryId,
    pub key: ThumbnailKey,
    pub png: Arc<Vec<u8>>,
}

enum Command {
    Render(ThumbnailRequest),
    Shutdown,
}

/// Handle to the background thumbnail thread. Dropping it stops the thread.
pub struct ThumbnailWorker {
    commands: mpsc::Sender<Command>,
    generation: Arc<AtomicU64>,
    cache: ThumbnailCache,
    thread: Option<JoinHandle<()>>,
}

impl ThumbnailWorker {
    /// Start the worker. Previews are delivered through `ready`.
    pub fn spawn(
        cache: ThumbnailCache,
        rasterizer: Arc<dyn PageRasterizer>,
        edge_px: u32,
        ready: UnboundedSender<ThumbnailReady>,
    ) -> Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            inbox,
            generation: Arc::clone(&generation),
            cache: cache.clone(),
            rasterizer,
            edge_px: edge_px.max(1),
            ready,
        };
        let thread = std::thread::Builder::new()
            .name("folio-thumbnails".into())
            .spawn(move || worker.run())?;

        info!(edge_px, "Thumbnail worker started");
        Ok(Self {
            commands,
            generation,
            cache,
            thread: Some(thread),
        })
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    /// Queue a preview of `entry`. Whole documents preview their first page.
    pub fn request(&self, entry: &WorklistEntry, password: Option<&str>) {
        let request = ThumbnailRequest {
            handle: entry.id,
            source_path: entry.source_path.clone(),
            kind: entry.kind,
            page_index: entry.page_index.unwrap_or(0),
            password: password.map(str::to_owned),
            generation: self.generation.load(Ordering::SeqCst),
        };
        if self.commands.send(Command::Render(request)).is_err() {
            warn!("Thumbnail worker is gone; request dropped");
        }
    }

    /// Drop every request queued so far. Called when the list is rebuilt.
    pub fn invalidate_pending(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Pending thumbnail requests invalidated");
    }
}

impl Drop for ThumbnailWorker {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("Thumbnail worker panicked");
        }
    }
}

/// State owned by the worker thread.
struct Worker {
    inbox: mpsc::Receiver<Command>,
    generation: Arc<AtomicU64>,
    cache: ThumbnailCache,
    rasterizer: Arc<dyn PageRasterizer>,
    edge_px: u32,
    ready: UnboundedSender<ThumbnailReady>,
}

impl Worker {
    fn run(self) {
        while let Ok(command) = self.inbox.recv() {
            let request = match command {
                Command::Render(request) => request,
                Command::Shutdown => break,
            };
            if self.is_stale(&request) {
                debug!(handle = %request.handle, "Stale thumbnail request skipped");
                continue;
            }

            let key = request.key();
            let png = match self.cache.get(&key) {
                Some(png) => png,
                None => {
                    let epoch = self.cache.epoch();
                    let bytes = match self.render(&request) {
                        Ok(bytes) => bytes,
                        Err(err) => {
                            warn!(path = %request.source_path.display(), %err, "Thumbnail failed");
                            continue;
                        }
                    };
                    // The list may have been rebuilt while rendering.
                    if self.is_stale(&request) {
                        debug!(handle = %request.handle, "Thumbnail outdated while rendering");
                        continue;
                    }
                    self.cache.insert_since(epoch, key.clone(), bytes)
                }
            };

            let ready = ThumbnailReady {
                handle: request.handle,
                key,
                png,
            };
            if self.ready.send(ready).is_err() {
                debug!("Thumbnail receiver closed");
                break;
            }
        }
        debug!("Thumbnail worker stopped");
    }

    fn is_stale(&self, request: &ThumbnailRequest) -> bool {
        request.generation < self.generation.load(Ordering::SeqCst)
    }

    fn render(&self, request: &ThumbnailRequest) -> Result<Vec<u8>> {
        let processor = match request.kind {
            SourceKind::Image => ImageProcessor::open(&request.source_path)?,
            SourceKind::Document => ImageProcessor::from_dynamic(self.rasterizer.render(
                &request.source_path,
                request.password.as_deref(),
                request.page_index,
                RenderScale::MaxEdge(self.edge_px),
            )?),
        };
        processor.thumbnail(self.edge_px).to_png_bytes()
    }
}
