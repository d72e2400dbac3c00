// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Accepted open passwords for protected source documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maps a source path to the password that last opened it.
///
/// Only passwords that authenticated successfully are stored. Values are
/// never logged or persisted.
#[derive(Clone, Default)]
pub struct PasswordStore {
    passwords: HashMap<PathBuf, String>,
}

impl std::fmt::Debug for PasswordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordStore")
            .field("paths", &self.passwords.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PasswordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.passwords.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, password: impl Into<String>) {
        self.passwords.insert(path.into(), password.into());
    }

    pub fn remove(&mut self, path: &Path) -> Option<String> {
        self.passwords.remove(path)
    }

    pub fn clear(&mut self) {
        self.passwords.clear();
    }

    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    /// A copy holding only the passwords for `paths`.
    pub fn subset<'p>(&self, paths: impl IntoIterator<Item = &'p Path>) -> Self {
        let passwords = paths
            .into_iter()
            .filter_map(|p| self.passwords.get(p).map(|pw| (p.to_path_buf(), pw.clone())))
            .collect();
        Self { passwords }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_keeps_only_requested_paths() {
        let mut store = PasswordStore::new();
        store.insert("/a.pdf", "one");
        store.insert("/b.pdf", "two");

        let subset = store.subset([Path::new("/b.pdf"), Path::new("/c.pdf")]);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.get(Path::new("/b.pdf")), Some("two"));
        assert_eq!(subset.get(Path::new("/a.pdf")), None);
    }

    #[test]
    fn debug_output_hides_values() {
        let mut store = PasswordStore::new();
        store.insert("/a.pdf", "hunter2");
        assert!(!format!("{store:?}").contains("hunter2"));
    }
}
