// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler — build the output document page by page with `lopdf`, then
// finalise it: metadata, compaction, optional AES-256 encryption, and a
// single atomic write to the destination.
//
// Pages are appended in call order. Nothing touches the filesystem until
// `PdfAssembler::save`, so a failed conversion leaves no partial output.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use folio_core::error::FolioError;
use folio_core::types::{DocumentMetadata, ScaleMode};
use lopdf::content::{Content, Operation};
use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions,
    Stream, StringFormat, dictionary,
};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use super::embed::EmbeddedImage;
use super::geometry::{Affine, Rect, overflows, page_to_rect, placement};
use super::graft::Grafter;
use super::reader::SourceDocument;

/// Application name stamped into `/Creator`.
pub const CREATOR: &str = "Folio";
/// Library stamp written into `/Producer`.
pub const PRODUCER: &str = "Folio (lopdf)";

/// Options applied when the document is finalised.
#[derive(Debug, Clone, Default)]
pub struct FinishOptions<'a> {
    pub metadata: DocumentMetadata,
    /// Encrypt with AES-256, using this string as both user and owner
    /// password.
    pub password: Option<&'a str>,
}

/// Builds a new PDF from images and pages of existing PDFs.
pub struct PdfAssembler {
    /// The document under construction.
    document: Document,
    /// Reserved id of the root `/Pages` node, written at finish time.
    pages_id: ObjectId,
    /// Page object ids in output order.
    kids: Vec<ObjectId>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> u32 {
        self.kids.len() as u32
    }

    // -- Images ---------------------------------------------------------------

    /// Append a page of `page_size` points showing `image` inside `rect`.
    ///
    /// The image is stretched to `rect`; callers compute `rect` with
    /// [`placement`] so the aspect ratio is already right. Content outside
    /// the page is clipped.
    pub fn add_image_page(
        &mut self,
        image: &EmbeddedImage,
        page_size: (f32, f32),
        rect: Rect,
    ) -> Result<ObjectId, FolioError> {
        let smask_id = image
            .smask_stream()
            .map(|stream| self.document.add_object(stream));
        let image_id = self.document.add_object(image.to_stream(smask_id));

        let matrix = Affine([rect.width(), 0.0, 0.0, rect.height(), rect.x0, rect.y0]);
        let resources = dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        };

        debug!(
            width = image.width,
            height = image.height,
            page_w = page_size.0,
            page_h = page_size.1,
            "Image placed on page"
        );
        self.push_drawing_page(page_size, &rect, matrix, "Im0", resources)
    }

    // -- Pages from existing documents -----------------------------------------

    /// Append page `index` of `source` unchanged, at its native size.
    #[instrument(skip(self, source), fields(path = %source.path().display()))]
    pub fn import_page(&mut self, source: &SourceDocument, index: u32) -> Result<ObjectId, FolioError> {
        let page = source.detached_page(index)?;

        let mut grafter = Grafter::new(source.document());
        // Register the source page id first so annotation back-links land on
        // the imported page rather than on a second copy.
        let source_page_id = source.page_id(index)?;
        let page_id = self.document.new_object_id();
        grafter.seed(source_page_id, page_id);

        let mut copied = match grafter.graft(&mut self.document, &Object::Dictionary(page)) {
            Object::Dictionary(dict) => dict,
            _ => Dictionary::new(),
        };
        copied.set("Parent", Object::Reference(self.pages_id));
        self.document.objects.insert(page_id, Object::Dictionary(copied));
        self.kids.push(page_id);
        Ok(page_id)
    }

    /// Append page `index` of `source` re-rendered onto a new page of
    /// `page_size` points, positioned per `mode`.
    ///
    /// The source content becomes a Form XObject, so it stays vector data.
    /// Annotations are not carried over.
    #[instrument(skip(self, source), fields(path = %source.path().display()))]
    pub fn place_page(
        &mut self,
        source: &SourceDocument,
        index: u32,
        page_size: (f32, f32),
        mode: ScaleMode,
    ) -> Result<ObjectId, FolioError> {
        let geometry = source.page_geometry(index)?;
        let content = source.page_content(index)?;

        let mut grafter = Grafter::new(source.document());
        let resources = match source.page_resources(index)? {
            Some(res) => grafter.graft(&mut self.document, res),
            None => Object::Dictionary(Dictionary::new()),
        };

        let b = geometry.bounds;
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![b.x0.into(), b.y0.into(), b.x1.into(), b.y1.into()],
                "Resources" => resources,
            },
            content,
        );
        let form_id = self.document.add_object(form);

        let rect = placement(geometry.visible_size(), page_size, mode);
        let matrix = page_to_rect(&geometry.bounds, geometry.rotation, &rect);
        let page_resources = dictionary! {
            "XObject" => dictionary! { "Fm0" => form_id },
        };
        self.push_drawing_page(page_size, &rect, matrix, "Fm0", page_resources)
    }

    /// Append a page that draws one XObject through `matrix`.
    fn push_drawing_page(
        &mut self,
        page_size: (f32, f32),
        rect: &Rect,
        matrix: Affine,
        xobject: &str,
        resources: Dictionary,
    ) -> Result<ObjectId, FolioError> {
        let (pw, ph) = page_size;

        let mut operations = vec![Operation::new("q", vec![])];
        if overflows(rect, page_size) {
            operations.push(Operation::new(
                "re",
                vec![0.into(), 0.into(), pw.into(), ph.into()],
            ));
            operations.push(Operation::new("W", vec![]));
            operations.push(Operation::new("n", vec![]));
        }
        operations.push(Operation::new(
            "cm",
            matrix.0.iter().map(|&v| Object::Real(v)).collect(),
        ));
        operations.push(Operation::new("Do", vec![Object::Name(xobject.as_bytes().to_vec())]));
        operations.push(Operation::new("Q", vec![]));

        let encoded = Content { operations }.encode().map_err(|err| {
            FolioError::PdfError(format!("failed to encode page content: {}", err))
        })?;
        let content_id = self.document.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), pw.into(), ph.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id);
        Ok(page_id)
    }

    // -- Finalisation ---------------------------------------------------------

    /// Finalise the document and return its serialised bytes.
    #[instrument(skip_all, fields(pages = self.kids.len(), encrypt = options.password.is_some()))]
    pub fn finish(mut self, options: &FinishOptions<'_>) -> Result<Vec<u8>, FolioError> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let created = Utc::now();
        let info_id = self
            .document
            .add_object(info_dictionary(&options.metadata, created));
        self.document.trailer.set("Info", info_id);

        // Compaction: drop unreachable objects, renumber, deflate streams.
        self.document.prune_objects();
        self.document.delete_zero_length_streams();
        self.document.renumber_objects();
        self.document.compress();

        let id = document_id(&options.metadata, count, created.timestamp_nanos_opt());
        debug!(id = %hex::encode(&id), "Document identifier assigned");
        self.document.trailer.set(
            "ID",
            vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ],
        );

        if let Some(password) = options.password {
            encrypt(&mut self.document, password)?;
        }

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            FolioError::PdfError(format!("failed to serialise output PDF: {}", err))
        })?;

        info!(pages = count, bytes = output.len(), "PDF assembled");
        Ok(output)
    }

    /// Finalise and write to `destination` in one step.
    ///
    /// The bytes go to a temporary file next to the destination which is then
    /// renamed over it, so the destination either keeps its old content or
    /// holds the complete new document.
    pub fn save(
        self,
        destination: impl AsRef<Path>,
        options: &FinishOptions<'_>,
    ) -> Result<u64, FolioError> {
        let destination = destination.as_ref();
        let bytes = self.finish(options)?;

        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staging = tempfile::NamedTempFile::new_in(dir)?;
        staging.write_all(&bytes)?;
        staging.as_file().sync_all()?;
        staging
            .persist(destination)
            .map_err(|err| FolioError::Io(err.error))?;

        info!("Wrote PDF to {}", destination.display());
        Ok(bytes.len() as u64)
    }
}

/// Build the `/Info` dictionary. Empty fields are left out.
fn info_dictionary(metadata: &DocumentMetadata, created: chrono::DateTime<Utc>) -> Dictionary {
    let mut info = Dictionary::new();
    let fields = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
    ];
    for (key, value) in fields {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            info.set(key, pdf_text_string(trimmed));
        }
    }
    info.set("Creator", Object::string_literal(CREATOR));
    info.set("Producer", Object::string_literal(PRODUCER));
    let date = created.format("D:%Y%m%d%H%M%SZ").to_string();
    info.set("CreationDate", Object::string_literal(date.clone()));
    info.set("ModDate", Object::string_literal(date));
    info
}

/// Encode a text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
fn pdf_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// First 16 bytes of a SHA-256 over the metadata, page count, and time.
fn document_id(metadata: &DocumentMetadata, pages: i64, nanos: Option<i64>) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(metadata.title.as_bytes());
    hasher.update(metadata.author.as_bytes());
    hasher.update(pages.to_be_bytes());
    hasher.update(nanos.unwrap_or_default().to_be_bytes());
    hasher.finalize()[..16].to_vec()
}

/// Encrypt with the AES-256 standard security handler (revision 6), using
/// `password` as both user and owner password.
fn encrypt(document: &mut Document, password: &str) -> Result<(), FolioError> {
    let mut file_key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut file_key)
        .map_err(|_| FolioError::Encryption("system randomness unavailable".into()))?;

    let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
    let version = EncryptionVersion::V5 {
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), crypt_filter)]),
        file_encryption_key: &file_key,
        stream_filter: b"StdCF".to_vec(),
        string_filter: b"StdCF".to_vec(),
        owner_password: password,
        user_password: password,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| FolioError::Encryption(format!("{}", err)))?;
    document
        .encrypt(&state)
        .map_err(|err| FolioError::Encryption(format!("{}", err)))?;
    document.version = "2.0".to_string();

    info!("Output encrypted with AES-256");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::embed::EmbeddedImage;
    use crate::pdf::testing::write_blank_pdf;
    use ::image::DynamicImage;

    fn reopen(bytes: &[u8]) -> Document {
        Document::load_mem(bytes).expect("reload output")
    }

    fn media_box(doc: &Document, page: ObjectId) -> Vec<f32> {
        doc.get_dictionary(page)
            .expect("page")
            .get(b"MediaBox")
            .and_then(|o| o.as_array())
            .expect("media box")
            .iter()
            .map(|v| v.as_float().expect("number"))
            .collect()
    }

    #[test]
    fn image_page_has_requested_size() {
        let mut assembler = PdfAssembler::new();
        let image = EmbeddedImage::lossless(&DynamicImage::new_rgb8(30, 60));
        assembler
            .add_image_page(&image, (30.0, 60.0), Rect::sized(30.0, 60.0))
            .expect("add");

        let doc = reopen(&assembler.finish(&FinishOptions::default()).expect("finish"));
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(media_box(&doc, pages[&1]), vec![0.0, 0.0, 30.0, 60.0]);
    }

    #[test]
    fn imported_and_placed_pages_keep_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("src.pdf");
        write_blank_pdf(&path, &[(100.0, 200.0), (300.0, 100.0)]);
        let source = SourceDocument::open(&path, None).expect("open");

        let mut assembler = PdfAssembler::new();
        assembler.import_page(&source, 1).expect("import");
        assembler
            .place_page(&source, 0, (595.27, 841.89), ScaleMode::Fill)
            .expect("place");
        assert_eq!(assembler.page_count(), 2);

        let doc = reopen(&assembler.finish(&FinishOptions::default()).expect("finish"));
        let pages = doc.get_pages();
        assert_eq!(media_box(&doc, pages[&1]), vec![0.0, 0.0, 300.0, 100.0]);
        let placed = media_box(&doc, pages[&2]);
        assert!((placed[2] - 595.27).abs() < 0.01 && (placed[3] - 841.89).abs() < 0.01, "{placed:?}");
    }

    #[test]
    fn metadata_is_written() {
        let mut assembler = PdfAssembler::new();
        let image = EmbeddedImage::lossless(&DynamicImage::new_rgb8(4, 4));
        assembler
            .add_image_page(&image, (4.0, 4.0), Rect::sized(4.0, 4.0))
            .expect("add");
        let options = FinishOptions {
            metadata: DocumentMetadata {
                title: "Holiday".into(),
                author: "Jo".into(),
                ..Default::default()
            },
            password: None,
        };
        let doc = reopen(&assembler.finish(&options).expect("finish"));

        let info_id = doc
            .trailer
            .get(b"Info")
            .and_then(|o| o.as_reference())
            .expect("info ref");
        let info = doc.get_dictionary(info_id).expect("info");
        let title = info.get(b"Title").and_then(|o| o.as_str()).expect("title");
        assert_eq!(title, b"Holiday");
        assert!(info.get(b"Subject").is_err());
        assert!(info.get(b"Producer").is_ok());
    }

    #[test]
    fn encrypted_output_needs_the_password() {
        let mut assembler = PdfAssembler::new();
        let image = EmbeddedImage::lossless(&DynamicImage::new_rgb8(4, 4));
        assembler
            .add_image_page(&image, (4.0, 4.0), Rect::sized(4.0, 4.0))
            .expect("add");

        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("locked.pdf");
        let options = FinishOptions {
            metadata: DocumentMetadata::default(),
            password: Some("secret"),
        };
        assembler.save(&out, &options).expect("save");

        assert!(matches!(
            SourceDocument::open(&out, None),
            Err(FolioError::PasswordRequired { .. })
        ));
        assert!(matches!(
            SourceDocument::open(&out, Some("wrong")),
            Err(FolioError::WrongPassword { .. })
        ));
        let opened = SourceDocument::open(&out, Some("secret")).expect("open with password");
        assert_eq!(opened.page_count(), 1);
    }

    #[test]
    fn save_replaces_destination_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out.pdf");
        std::fs::write(&out, b"old").expect("seed");

        let mut assembler = PdfAssembler::new();
        let image = EmbeddedImage::lossless(&DynamicImage::new_rgb8(2, 2));
        assembler
            .add_image_page(&image, (2.0, 2.0), Rect::sized(2.0, 2.0))
            .expect("add");
        let written = assembler.save(&out, &FinishOptions::default()).expect("save");

        let bytes = std::fs::read(&out).expect("read");
        assert_eq!(bytes.len() as u64, written);
        assert!(bytes.starts_with(b"%PDF-"));
        // Only the destination remains; the staging file was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).expect("ls").count(), 1);
    }

    #[test]
    fn non_ascii_titles_use_utf16() {
        match pdf_text_string("Résumé") {
            Object::String(bytes, _) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("unexpected object: {other:?}"),
        }
    }
}
