// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worklist model — the ordered list of images, documents, and single pages
// that becomes the output document, one entry after another.
//
// The worklist owns the password store and the open-document cache, and
// reclaims both for a path once no entry refers to it any more.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_core::error::{FolioError, Result};
use folio_core::types::{EntryId, SourceKind};
use folio_document::{ImageProcessor, SourceDocument};
use tracing::{debug, info, instrument, warn};

use crate::doc_cache::DocumentCache;
use crate::passwords::PasswordStore;

/// One row of the worklist.
#[derive(Debug, Clone, PartialEq)]
pub struct WorklistEntry {
    pub id: EntryId,
    pub source_path: PathBuf,
    pub kind: SourceKind,
    /// `None` for a whole image or document; `Some(i)` for the zero-based
    /// page `i` of an expanded document.
    pub page_index: Option<u32>,
    /// Output pages this entry produces. Always 1 for a single page.
    pub page_count: u32,
}

impl WorklistEntry {
    fn whole(path: PathBuf, kind: SourceKind, page_count: u32) -> Self {
        Self {
            id: EntryId::new(),
            source_path: path,
            kind,
            page_index: None,
            page_count,
        }
    }

    fn page(path: PathBuf, index: u32) -> Self {
        Self {
            id: EntryId::new(),
            source_path: path,
            kind: SourceKind::Document,
            page_index: Some(index),
            page_count: 1,
        }
    }

    pub fn is_whole(&self) -> bool {
        self.page_index.is_none()
    }

    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Name shown in the list: the file name, plus the page for expanded pages.
    pub fn display_name(&self) -> String {
        match self.page_index {
            Some(i) => format!("{} (page {})", self.file_name(), i + 1),
            None => self.file_name(),
        }
    }
}

/// 1-based span of output pages produced by one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{} ~ {}", self.first, self.last)
        }
    }
}

/// Asks the user for a document's open password.
pub trait PasswordPrompt {
    /// Return a password to try for `path`, or `None` to abandon the file.
    /// `rejected` is true when the previous attempt was wrong.
    fn ask(&mut self, path: &Path, rejected: bool) -> Option<String>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&Path, bool) -> Option<String>,
{
    fn ask(&mut self, path: &Path, rejected: bool) -> Option<String> {
        self(path, rejected)
    }
}

/// Prompt that always abandons; protected documents are skipped.
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn ask(&mut self, _path: &Path, _rejected: bool) -> Option<String> {
        None
    }
}

/// Why a path was not added.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Extension not on the allow-list.
    Unsupported,
    /// A whole entry for this path already exists.
    Duplicate,
    /// The file could not be read.
    Unreadable(String),
    /// The user gave up on the password prompt.
    Abandoned,
}

/// Outcome of [`Worklist::add`].
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<EntryId>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

/// Direction for [`Worklist::move_selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Immutable copy of the worklist taken when a conversion starts.
#[derive(Debug, Clone, Default)]
pub struct WorklistSnapshot {
    pub entries: Vec<WorklistEntry>,
    pub passwords: PasswordStore,
}

impl WorklistSnapshot {
    /// Total output pages.
    pub fn page_total(&self) -> u32 {
        self.entries.iter().map(|e| e.page_count).sum()
    }
}

#[derive(Default)]
pub struct Worklist {
    entries: Vec<WorklistEntry>,
    passwords: PasswordStore,
    documents: DocumentCache,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Inspection -----------------------------------------------------------

    pub fn entries(&self) -> &[WorklistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passwords(&self) -> &PasswordStore {
        &self.passwords
    }

    /// Total output pages.
    pub fn page_total(&self) -> u32 {
        self.entries.iter().map(|e| e.page_count).sum()
    }

    /// Output page span of every entry, in list order.
    pub fn page_ranges(&self) -> Vec<PageRange> {
        let mut next = 1;
        self.entries
            .iter()
            .map(|entry| {
                let range = PageRange {
                    first: next,
                    last: next + entry.page_count.max(1) - 1,
                };
                next += entry.page_count;
                range
            })
            .collect()
    }

    pub fn snapshot(&self) -> WorklistSnapshot {
        WorklistSnapshot {
            entries: self.entries.clone(),
            passwords: self
                .passwords
                .subset(self.entries.iter().map(|e| e.source_path.as_path())),
        }
    }

    // -- Adding ---------------------------------------------------------------

    /// Append one entry per acceptable path.
    ///
    /// Protected documents without a cached password go through `prompt`
    /// until a password is accepted or the user abandons the file. Problems
    /// with one path never stop the rest of the batch.
    #[instrument(skip_all)]
    pub fn add<I, P>(&mut self, paths: I, prompt: &mut dyn PasswordPrompt) -> AddReport
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut report = AddReport::default();

        for path in paths {
            let path: PathBuf = path.into();
            let Some(kind) = SourceKind::from_path(&path) else {
                debug!(path = %path.display(), "Unsupported file type");
                report.skipped.push((path, SkipReason::Unsupported));
                continue;
            };
            if self.has_whole_entry(&path) {
                report.skipped.push((path, SkipReason::Duplicate));
                continue;
            }

            let page_count = match kind {
                SourceKind::Image => ImageProcessor::probe_dimensions(&path).map(|_| Some(1)),
                SourceKind::Document => self
                    .open_with_prompt(&path, prompt)
                    .map(|doc| doc.map(|d| d.page_count())),
            };

            match page_count {
                Ok(Some(count)) => {
                    let entry = WorklistEntry::whole(path, kind, count);
                    info!(path = %entry.source_path.display(), pages = count, "Added to worklist");
                    report.added.push(entry.id);
                    self.entries.push(entry);
                }
                Ok(None) => {
                    info!(path = %path.display(), "Password prompt abandoned");
                    report.skipped.push((path, SkipReason::Abandoned));
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "Skipping unreadable file");
                    report
                        .skipped
                        .push((path, SkipReason::Unreadable(err.to_string())));
                }
            }
        }

        report
    }

    /// Open a document through the cache, prompting for a password as long
    /// as the document rejects the current one. `Ok(None)` means abandoned.
    fn open_with_prompt(
        &mut self,
        path: &Path,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<Option<Arc<SourceDocument>>> {
        let mut password = self.passwords.get(path).map(str::to_owned);
        loop {
            match self.documents.open(path, password.as_deref()) {
                Ok(doc) => {
                    if let Some(pw) = password {
                        self.passwords.insert(path, pw);
                    }
                    return Ok(Some(doc));
                }
                Err(FolioError::PasswordRequired { .. }) => {
                    password = prompt.ask(path, false);
                }
                Err(FolioError::WrongPassword { .. }) => {
                    debug!(path = %path.display(), "Password rejected");
                    password = prompt.ask(path, true);
                }
                Err(other) => return Err(other),
            }
            if password.is_none() {
                return Ok(None);
            }
        }
    }

    fn has_whole_entry(&self, path: &Path) -> bool {
        self.entries
            .iter()
            .any(|e| e.is_whole() && e.source_path == path)
    }

    // -- Expansion ------------------------------------------------------------

    /// Replace the whole-document entry at `index` with one entry per page.
    ///
    /// Images and already-expanded pages are left alone. Returns the ids of
    /// the new entries (empty when nothing changed).
    #[instrument(skip(self))]
    pub fn expand(&mut self, index: usize) -> Result<Vec<EntryId>> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| FolioError::InvalidSelection(format!("no entry at {}", index)))?;
        if entry.kind != SourceKind::Document || !entry.is_whole() {
            return Ok(Vec::new());
        }

        let path = entry.source_path.clone();
        let doc = self.documents.open(&path, self.passwords.get(&path))?;
        let pages: Vec<WorklistEntry> = (0..doc.page_count())
            .map(|i| WorklistEntry::page(path.clone(), i))
            .collect();
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let ids = pages.iter().map(|e| e.id).collect();
        info!(path = %path.display(), pages = pages.len(), "Expanded document");
        self.entries.splice(index..=index, pages);
        Ok(ids)
    }

    /// Expand several entries. Works from the highest index down so the
    /// remaining indices stay valid.
    pub fn expand_many(&mut self, indices: &[usize]) -> Result<Vec<EntryId>> {
        let mut sorted = self.validated(indices)?;
        sorted.reverse();
        let mut ids = Vec::new();
        for index in sorted {
            let mut added = self.expand(index)?;
            added.append(&mut ids);
            ids = added;
        }
        Ok(ids)
    }

    // -- Reordering -----------------------------------------------------------

    /// Shift the selected entries one step, keeping their relative order.
    ///
    /// Does nothing when the selection already touches the boundary in the
    /// direction of travel. Returns the selection's new indices.
    pub fn move_selection(&mut self, indices: &[usize], direction: Direction) -> Result<Vec<usize>> {
        let selection = self.validated(indices)?;
        let (Some(&first), Some(&last)) = (selection.first(), selection.last()) else {
            return Ok(selection);
        };

        match direction {
            Direction::Up => {
                if first == 0 {
                    return Ok(selection);
                }
                for &i in &selection {
                    self.entries.swap(i - 1, i);
                }
                Ok(selection.iter().map(|i| i - 1).collect())
            }
            Direction::Down => {
                if last + 1 >= self.entries.len() {
                    return Ok(selection);
                }
                for &i in selection.iter().rev() {
                    self.entries.swap(i, i + 1);
                }
                Ok(selection.iter().map(|i| i + 1).collect())
            }
        }
    }

    /// Stable sort by case-insensitive file name. Equal names keep whole
    /// entries first, then pages in ascending order, in both directions.
    pub fn sort(&mut self, descending: bool) {
        self.entries.sort_by(|a, b| {
            let name_a = a.file_name().to_lowercase();
            let name_b = b.file_name().to_lowercase();
            let by_name = if descending {
                name_b.cmp(&name_a)
            } else {
                name_a.cmp(&name_b)
            };
            by_name.then_with(|| a.page_index.cmp(&b.page_index))
        });
    }

    // -- Removal --------------------------------------------------------------

    /// Remove the selected entries. Returns the paths no entry refers to any
    /// more; their passwords and cached handles are already dropped.
    pub fn remove(&mut self, indices: &[usize]) -> Result<Vec<PathBuf>> {
        let selection = self.validated(indices)?;
        let mut removed_paths = Vec::new();
        for &i in selection.iter().rev() {
            removed_paths.push(self.entries.remove(i).source_path);
        }

        let still_used: HashSet<&Path> = self.entries.iter().map(|e| e.source_path.as_path()).collect();
        let mut orphaned: Vec<PathBuf> = removed_paths
            .into_iter()
            .filter(|p| !still_used.contains(p.as_path()))
            .collect();
        orphaned.sort();
        orphaned.dedup();

        for path in &orphaned {
            self.passwords.remove(path);
            self.documents.evict(path);
        }
        debug!(removed = selection.len(), reclaimed = orphaned.len(), "Entries removed");
        Ok(orphaned)
    }

    /// Remove everything. Returns every path that was referenced.
    pub fn clear(&mut self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.drain(..).map(|e| e.source_path).collect();
        paths.sort();
        paths.dedup();
        self.passwords.clear();
        self.documents.clear();
        paths
    }

    /// Sorted, de-duplicated copy of `indices`, all in range.
    fn validated(&self, indices: &[usize]) -> Result<Vec<usize>> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if let Some(&bad) = sorted.iter().find(|&&i| i >= self.entries.len()) {
            return Err(FolioError::InvalidSelection(format!(
                "index {} out of range ({} entries)",
                bad,
                self.entries.len()
            )));
        }
        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_document::pdf::testing::{write_blank_pdf, write_encrypted_pdf, write_test_image};
    use tempfile::TempDir;

    /// Replays a fixed list of answers and records each call.
    struct ScriptedPrompt {
        answers: Vec<Option<String>>,
        calls: Vec<bool>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[Option<&str>]) -> Self {
            Self {
                answers: answers.iter().rev().map(|a| a.map(str::to_owned)).collect(),
                calls: Vec::new(),
            }
        }
    }

    impl PasswordPrompt for ScriptedPrompt {
        fn ask(&mut self, _path: &Path, rejected: bool) -> Option<String> {
            self.calls.push(rejected);
            self.answers.pop().flatten()
        }
    }

    fn fixture() -> (TempDir, Worklist) {
        let dir = tempfile::tempdir().expect("tempdir");
        write_test_image(&dir.path().join("b.png"), 20, 10);
        write_test_image(&dir.path().join("A.jpg"), 10, 20);
        write_blank_pdf(&dir.path().join("c.pdf"), &[(100.0, 100.0); 3]);
        (dir, Worklist::new())
    }

    fn names(list: &Worklist) -> Vec<String> {
        list.entries().iter().map(|e| e.display_name()).collect()
    }

    #[test]
    fn add_filters_and_counts_pages() {
        let (dir, mut list) = fixture();
        let report = list.add(
            [
                dir.path().join("b.png"),
                dir.path().join("notes.txt"),
                dir.path().join("c.pdf"),
                dir.path().join("b.png"),
            ],
            &mut NoPrompt,
        );

        assert_eq!(report.added.len(), 2);
        assert_eq!(
            report.skipped.iter().map(|(_, r)| r.clone()).collect::<Vec<_>>(),
            vec![SkipReason::Unsupported, SkipReason::Duplicate]
        );
        assert_eq!(list.page_total(), 4);
    }

    #[test]
    fn unreadable_files_do_not_abort_the_batch() {
        let (dir, mut list) = fixture();
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"nope").expect("write");

        let report = list.add([broken, dir.path().join("A.jpg")], &mut NoPrompt);
        assert_eq!(report.added.len(), 1);
        assert!(matches!(report.skipped[0].1, SkipReason::Unreadable(_)));
    }

    #[test]
    fn wrong_password_twice_then_correct() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.pdf");
        write_encrypted_pdf(&path, 2, "right");

        let mut list = Worklist::new();
        let mut prompt = ScriptedPrompt::new(&[Some("nope"), Some("still no"), Some("right")]);
        let report = list.add([path.clone()], &mut prompt);

        assert_eq!(report.added.len(), 1);
        assert_eq!(list.len(), 1);
        assert_eq!(prompt.calls, vec![false, true, true]);
        assert_eq!(list.passwords().get(&path), Some("right"));

        // Expansion reuses the cached password without prompting.
        let ids = list.expand(0).expect("expand");
        assert_eq!(ids.len(), 2);
        assert_eq!(prompt.calls.len(), 3);
    }

    #[test]
    fn abandoned_prompt_skips_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.pdf");
        write_encrypted_pdf(&path, 1, "right");

        let mut list = Worklist::new();
        let report = list.add([path], &mut ScriptedPrompt::new(&[Some("bad"), None]));
        assert!(list.is_empty());
        assert_eq!(report.skipped[0].1, SkipReason::Abandoned);
        assert!(list.passwords().is_empty());
    }

    #[test]
    fn expand_replaces_document_with_pages_in_order() {
        let (dir, mut list) = fixture();
        list.add([dir.path().join("b.png"), dir.path().join("c.pdf")], &mut NoPrompt);

        let ids = list.expand(1).expect("expand");
        assert_eq!(ids.len(), 3);
        let pages: Vec<_> = list.entries()[1..].iter().map(|e| (e.page_index, e.page_count)).collect();
        assert_eq!(pages, vec![(Some(0), 1), (Some(1), 1), (Some(2), 1)]);
        assert_eq!(list.page_total(), 4);

        // Images and expanded pages are left alone.
        assert!(list.expand(0).expect("image").is_empty());
        assert!(list.expand(2).expect("page").is_empty());
        assert_eq!(list.len(), 4);

        // The whole document may be re-added next to its pages.
        let report = list.add([dir.path().join("c.pdf")], &mut NoPrompt);
        assert_eq!(report.added.len(), 1);
    }

    #[test]
    fn expand_many_keeps_indices_valid() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_blank_pdf(&dir.path().join("x.pdf"), &[(10.0, 10.0); 2]);
        write_blank_pdf(&dir.path().join("y.pdf"), &[(10.0, 10.0); 3]);
        let mut list = Worklist::new();
        list.add([dir.path().join("x.pdf"), dir.path().join("y.pdf")], &mut NoPrompt);

        let ids = list.expand_many(&[0, 1]).expect("expand");
        assert_eq!(ids.len(), 5);
        assert_eq!(list.entries()[..ids.len()].iter().map(|e| e.id).collect::<Vec<_>>(), ids);
        assert_eq!(
            names(&list),
            vec![
                "x.pdf (page 1)",
                "x.pdf (page 2)",
                "y.pdf (page 1)",
                "y.pdf (page 2)",
                "y.pdf (page 3)",
            ]
        );
    }

    #[test]
    fn move_keeps_relative_order_and_stops_at_boundaries() {
        let (dir, mut list) = fixture();
        list.add(
            [dir.path().join("A.jpg"), dir.path().join("b.png"), dir.path().join("c.pdf")],
            &mut NoPrompt,
        );
        let before = names(&list);

        assert_eq!(list.move_selection(&[0, 1], Direction::Up).expect("up"), vec![0, 1]);
        assert_eq!(names(&list), before);
        assert_eq!(list.move_selection(&[2], Direction::Down).expect("down"), vec![2]);
        assert_eq!(names(&list), before);

        assert_eq!(list.move_selection(&[1, 2], Direction::Up).expect("up"), vec![0, 1]);
        assert_eq!(names(&list), vec!["b.png", "c.pdf", "A.jpg"]);
        assert_eq!(list.move_selection(&[0, 1], Direction::Down).expect("down"), vec![1, 2]);
        assert_eq!(names(&list), before);
    }

    #[test]
    fn move_rejects_out_of_range_selection() {
        let (dir, mut list) = fixture();
        list.add([dir.path().join("A.jpg")], &mut NoPrompt);
        assert!(matches!(
            list.move_selection(&[3], Direction::Up),
            Err(FolioError::InvalidSelection(_))
        ));
    }

    #[test]
    fn sort_is_case_insensitive_with_page_tiebreak() {
        let (dir, mut list) = fixture();
        list.add([dir.path().join("c.pdf"), dir.path().join("b.png")], &mut NoPrompt);
        list.expand(0).expect("expand");
        list.add([dir.path().join("c.pdf"), dir.path().join("A.jpg")], &mut NoPrompt);
        list.move_selection(&[0], Direction::Down).expect("shuffle");

        list.sort(false);
        assert_eq!(
            names(&list),
            vec!["A.jpg", "b.png", "c.pdf", "c.pdf (page 1)", "c.pdf (page 2)", "c.pdf (page 3)"]
        );

        list.sort(true);
        assert_eq!(
            names(&list),
            vec!["c.pdf", "c.pdf (page 1)", "c.pdf (page 2)", "c.pdf (page 3)", "b.png", "A.jpg"]
        );
    }

    #[test]
    fn remove_reclaims_unreferenced_paths_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.pdf");
        write_encrypted_pdf(&path, 2, "pw");
        let mut list = Worklist::new();
        list.add([path.clone()], &mut ScriptedPrompt::new(&[Some("pw")]));
        list.expand(0).expect("expand");

        assert!(list.remove(&[0]).expect("remove").is_empty());
        assert_eq!(list.passwords().get(&path), Some("pw"));

        assert_eq!(list.remove(&[0]).expect("remove"), vec![path.clone()]);
        assert!(list.passwords().is_empty());
        assert!(list.is_empty());
    }

    #[test]
    fn page_ranges_follow_page_counts() {
        let (dir, mut list) = fixture();
        list.add(
            [dir.path().join("A.jpg"), dir.path().join("c.pdf"), dir.path().join("b.png")],
            &mut NoPrompt,
        );
        let ranges: Vec<String> = list.page_ranges().iter().map(|r| r.to_string()).collect();
        assert_eq!(ranges, vec!["1", "2 ~ 4", "5"]);
    }

    #[test]
    fn snapshot_carries_needed_passwords() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.pdf");
        write_encrypted_pdf(&path, 1, "pw");
        let mut list = Worklist::new();
        list.add([path.clone()], &mut ScriptedPrompt::new(&[Some("pw")]));

        let snapshot = list.snapshot();
        assert_eq!(snapshot.entries, list.entries());
        assert_eq!(snapshot.passwords.get(&path), Some("pw"));
        assert_eq!(snapshot.page_total(), 1);

        assert_eq!(list.clear(), vec![path]);
        assert!(list.passwords().is_empty());
    }
}
