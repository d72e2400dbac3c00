// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source PDF reader — open (and authenticate) input documents and inspect
// their pages using the `lopdf` crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use folio_core::error::FolioError;
use lopdf::{Dictionary, Document, Object, ObjectId, Reader};
use tracing::{debug, info, instrument};

use super::geometry::Rect;

/// Maximum `/Parent` hops followed when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, the PDF default when a page has no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Page attributes that a page may inherit from its ancestors in the tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Resolved geometry of one source page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// The visible box (`/CropBox` clipped to `/MediaBox`), unrotated.
    pub bounds: Rect,
    /// Display rotation in degrees, normalised to 0/90/180/270.
    pub rotation: i64,
}

impl PageGeometry {
    /// Displayed size after applying `/Rotate`.
    pub fn visible_size(&self) -> (f32, f32) {
        let (w, h) = (self.bounds.width(), self.bounds.height());
        if self.rotation % 180 == 90 {
            (h, w)
        } else {
            (w, h)
        }
    }
}

/// An opened, authenticated input PDF.
pub struct SourceDocument {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in page order.
    pages: Vec<ObjectId>,
    /// Where the document was loaded from.
    path: PathBuf,
}

impl SourceDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem, authenticating with `password` when
    /// the document is protected.
    ///
    /// Returns `PasswordRequired` if the document needs a password and none
    /// was given, and `WrongPassword` if the given one was rejected.
    #[instrument(skip(password), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, password: Option<&str>) -> Result<Self, FolioError> {
        let path = path.as_ref();
        info!("Opening PDF");

        let bytes = std::fs::read(path)?;
        let mut document = Document::load_mem(&bytes).map_err(|err| load_error(path, err))?;

        // The loader decrypts on its own only when the empty password opens
        // the document. Anything else comes back with its objects unread.
        if document.is_encrypted() && document.encryption_state.is_none() {
            let Some(pw) = password else {
                return Err(FolioError::PasswordRequired {
                    path: path.to_path_buf(),
                });
            };
            if document.authenticate_password(pw).is_err() {
                return Err(FolioError::WrongPassword {
                    path: path.to_path_buf(),
                });
            }
            document = load_protected(&bytes, pw).map_err(|err| load_error(path, err))?;
            debug!("PDF decrypted");
        }

        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = pages.len(), "PDF loaded");

        Ok(Self {
            document,
            pages,
            path: path.to_path_buf(),
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the zero-based page `index`.
    pub(crate) fn page_id(&self, index: u32) -> Result<ObjectId, FolioError> {
        self.pages.get(index as usize).copied().ok_or_else(|| {
            FolioError::SourceChanged {
                path: self.path.clone(),
                detail: format!(
                    "page {} out of range (document has {} pages)",
                    index + 1,
                    self.pages.len()
                ),
            }
        })
    }

    /// Visible box and rotation of the zero-based page `index`.
    pub fn page_geometry(&self, index: u32) -> Result<PageGeometry, FolioError> {
        let page_id = self.page_id(index)?;

        let media = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| self.rect_from(obj))
            .filter(|r| !r.is_degenerate())
            .unwrap_or(DEFAULT_MEDIA_BOX);

        // The crop box is intersected with the media box.
        let bounds = self
            .inherited(page_id, b"CropBox")
            .and_then(|obj| self.rect_from(obj))
            .map(|crop| {
                Rect::new(
                    crop.x0.max(media.x0),
                    crop.y0.max(media.y0),
                    crop.x1.min(media.x1),
                    crop.y1.min(media.y1),
                )
            })
            .filter(|r| !r.is_degenerate())
            .unwrap_or(media);

        let rotation = self
            .inherited(page_id, b"Rotate")
            .and_then(|obj| self.resolve(obj).as_i64().ok())
            .map(|deg| (deg / 90 * 90).rem_euclid(360))
            .unwrap_or(0);

        Ok(PageGeometry { bounds, rotation })
    }

    /// Decoded, concatenated content stream of the zero-based page `index`.
    pub(crate) fn page_content(&self, index: u32) -> Result<Vec<u8>, FolioError> {
        let page_id = self.page_id(index)?;
        self.document.get_page_content(page_id).map_err(|err| {
            FolioError::PdfError(format!(
                "cannot read content of page {} in {}: {}",
                index + 1,
                self.path.display(),
                err
            ))
        })
    }

    /// The page's `/Resources` (possibly inherited), as stored.
    pub(crate) fn page_resources(&self, index: u32) -> Result<Option<&Object>, FolioError> {
        let page_id = self.page_id(index)?;
        Ok(self.inherited(page_id, b"Resources"))
    }

    /// The page dictionary with every inheritable attribute materialised, so
    /// it stands on its own once detached from this document's page tree.
    pub(crate) fn detached_page(&self, index: u32) -> Result<Dictionary, FolioError> {
        let page_id = self.page_id(index)?;
        let mut page = self
            .document
            .get_dictionary(page_id)
            .map_err(|err| {
                FolioError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
            })?
            .clone();

        for key in INHERITABLE {
            if page.get(key).is_err()
                && let Some(value) = self.inherited(page_id, key)
            {
                page.set(key.to_vec(), value.clone());
            }
        }
        Ok(page)
    }

    // -- Helpers --------------------------------------------------------------

    /// Look up `key` on the page, then on its ancestors.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Follow a reference (if any) to the object it points at.
    fn resolve<'o>(&'o self, object: &'o Object) -> &'o Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }

    fn rect_from(&self, object: &Object) -> Option<Rect> {
        let array = self.resolve(object).as_array().ok()?;
        if array.len() != 4 {
            return None;
        }
        let mut n = [0f32; 4];
        for (slot, value) in n.iter_mut().zip(array) {
            *slot = self.resolve(value).as_float().ok()?;
        }
        Some(Rect::new(n[0], n[1], n[2], n[3]))
    }
}

fn load_error(path: &Path, err: lopdf::Error) -> FolioError {
    FolioError::PdfError(format!("failed to open {}: {}", path.display(), err))
}

/// Trailer key standing in for `/Encrypt` while a protected file is parsed.
const HIDDEN_ENCRYPT: &[u8] = b"EncrypX";

/// Object-stream type name used while a protected file is parsed.
const HIDDEN_OBJSTM: &[u8] = b"ObjStX";

/// Parse a protected document and decrypt it with `password`.
///
/// The trailer's `/Encrypt` reference is renamed in a copy of the bytes so the
/// reader parses every object as stored. Object streams are kept whole since
/// their content is still ciphertext at that point. Both are restored before
/// `decrypt`, which decodes every object and then unpacks the object streams.
fn load_protected(bytes: &[u8], password: &str) -> lopdf::Result<Document> {
    let mut masked = bytes.to_vec();
    hide_encrypt_refs(&mut masked);

    let filter: fn(ObjectId, &mut Object) -> Option<(ObjectId, Object)> = hide_object_stream;
    let mut document = Reader {
        buffer: &masked,
        document: Document::new(),
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    }
    .read(Some(filter))?;

    if let Some(encrypt) = document.trailer.remove(HIDDEN_ENCRYPT) {
        document.trailer.set("Encrypt", encrypt);
    }
    for object in document.objects.values_mut() {
        if let Ok(stream) = object.as_stream_mut()
            && stream.dict.has_type(HIDDEN_OBJSTM)
        {
            stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        }
    }

    document.decrypt(password)?;
    Ok(document)
}

/// Rename each `/Encrypt <num> <gen> R` entry to [`HIDDEN_ENCRYPT`], in place.
/// The name keeps its length so every xref offset stays valid.
fn hide_encrypt_refs(bytes: &mut [u8]) {
    const KEY: &[u8] = b"/Encrypt";
    let mut at = 0;
    while let Some(found) = bytes[at..].windows(KEY.len()).position(|w| w == KEY) {
        let start = at + found;
        let end = start + KEY.len();
        if is_reference(&bytes[end..]) {
            bytes[start + 1..end].copy_from_slice(HIDDEN_ENCRYPT);
        }
        at = end;
    }
}

/// Whether `rest` starts with an indirect reference such as ` 12 0 R`.
fn is_reference(rest: &[u8]) -> bool {
    let skip_ws = |from: usize| {
        from + rest[from..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace() || **b == 0)
            .count()
    };
    let mut i = skip_ws(0);
    for _ in 0..2 {
        let digits = rest[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return false;
        }
        i = skip_ws(i + digits);
    }
    rest.get(i) == Some(&b'R')
}

fn hide_object_stream(id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Ok(stream) = object.as_stream_mut()
        && stream.dict.has_type(b"ObjStm")
    {
        stream.dict.set("Type", Object::Name(HIDDEN_OBJSTM.to_vec()));
    }
    // The reader only keeps the returned object for object-stream members,
    // and none are unpacked in this pass.
    Some((id, Object::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{nested_tree_pdf, write_blank_pdf, write_encrypted_pdf};

    #[test]
    fn page_count_and_sizes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("three.pdf");
        write_blank_pdf(&path, &[(200.0, 300.0), (300.0, 200.0), (100.0, 100.0)]);

        let doc = SourceDocument::open(&path, None).expect("open");
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.page_geometry(1).expect("geometry").visible_size(), (300.0, 200.0));
    }

    #[test]
    fn inherited_attributes_are_resolved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested.pdf");
        nested_tree_pdf(&path);

        let doc = SourceDocument::open(&path, None).expect("open");
        let geometry = doc.page_geometry(0).expect("geometry");
        // MediaBox 400×500 inherited from the root, rotation 90 from the
        // intermediate node.
        assert_eq!(geometry.rotation, 90);
        assert_eq!(geometry.visible_size(), (500.0, 400.0));

        let detached = doc.detached_page(0).expect("detached");
        assert!(detached.get(b"MediaBox").is_ok());
        assert!(detached.get(b"Resources").is_ok());
    }

    #[test]
    fn out_of_range_page_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("one.pdf");
        write_blank_pdf(&path, &[(100.0, 100.0)]);

        let doc = SourceDocument::open(&path, None).expect("open");
        assert!(matches!(
            doc.page_geometry(4),
            Err(FolioError::SourceChanged { .. })
        ));
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("junk.pdf");
        std::fs::write(&path, b"definitely not a pdf").expect("write");
        assert!(matches!(
            SourceDocument::open(&path, None),
            Err(FolioError::PdfError(_))
        ));
    }

    #[test]
    fn protected_document_opens_with_its_password() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("locked.pdf");
        write_encrypted_pdf(&path, 2, "hunter2");

        assert!(matches!(
            SourceDocument::open(&path, None),
            Err(FolioError::PasswordRequired { .. })
        ));
        assert!(matches!(
            SourceDocument::open(&path, Some("nope")),
            Err(FolioError::WrongPassword { .. })
        ));

        let doc = SourceDocument::open(&path, Some("hunter2")).expect("open");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_geometry(1).expect("geometry").visible_size(), (100.0, 100.0));
        assert!(!doc.page_content(0).expect("content").is_empty());
        assert!(doc.page_resources(0).expect("resources").is_some());
    }

    #[test]
    fn only_encrypt_references_are_hidden() {
        let mut bytes =
            b"<< /Encrypt 12 0 R /Root 1 0 R >> << /EncryptMetadata true /Encrypt /None >>".to_vec();
        hide_encrypt_refs(&mut bytes);
        let text = String::from_utf8(bytes).expect("ascii");
        assert_eq!(
            text,
            "<< /EncrypX 12 0 R /Root 1 0 R >> << /EncryptMetadata true /Encrypt /None >>"
        );
    }

    #[test]
    fn reference_shapes() {
        assert!(is_reference(b" 7 0 R"));
        assert!(is_reference(b"\n12\r\n0 R>>"));
        assert!(!is_reference(b" 7 R"));
        assert!(!is_reference(b"Metadata true"));
    }
}
