// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cache of opened source documents, keyed by path.
//
// The worklist opens each PDF once when it is added and reuses the handle
// for expansion. The conversion pipeline and the thumbnail worker never use
// these handles; they open their own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use folio_core::error::Result;
use folio_document::SourceDocument;
use tracing::debug;

#[derive(Default)]
pub struct DocumentCache {
    documents: Mutex<HashMap<PathBuf, Arc<SourceDocument>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `path`, opening it with `password` on a
    /// miss. Failed opens are not cached.
    pub fn open(&self, path: &Path, password: Option<&str>) -> Result<Arc<SourceDocument>> {
        if let Some(doc) = self.get(path) {
            return Ok(doc);
        }

        // Opened outside the lock; a racing open of the same path just
        // replaces an identical handle.
        let doc = Arc::new(SourceDocument::open(path, password)?);
        self.documents
            .lock()
            .expect("document cache lock poisoned")
            .insert(path.to_path_buf(), Arc::clone(&doc));
        debug!(path = %path.display(), pages = doc.page_count(), "Document cached");
        Ok(doc)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<SourceDocument>> {
        self.documents
            .lock()
            .expect("document cache lock poisoned")
            .get(path)
            .cloned()
    }

    pub fn evict(&self, path: &Path) {
        self.documents
            .lock()
            .expect("document cache lock poisoned")
            .remove(path);
    }

    pub fn clear(&self) {
        self.documents
            .lock()
            .expect("document cache lock poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .expect("document cache lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_document::pdf::testing::write_blank_pdf;

    #[test]
    fn second_open_hits_the_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.pdf");
        write_blank_pdf(&path, &[(100.0, 100.0)]);

        let cache = DocumentCache::new();
        let first = cache.open(&path, None).expect("open");
        let second = cache.open(&path, None).expect("open again");
        assert!(Arc::ptr_eq(&first, &second));

        cache.evict(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_opens_are_not_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.pdf");

        let cache = DocumentCache::new();
        assert!(cache.open(&path, None).is_err());
        assert!(cache.is_empty());
    }
}
