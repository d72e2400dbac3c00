// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Folio.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable handle for a worklist row, used by the list view and the thumbnail
/// worker to address an entry independently of its current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of input file accepted into the worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// A single raster image (JPEG, PNG, BMP, TIFF).
    Image,
    /// A PDF document of one or more pages.
    Document,
}

/// Extensions accepted by the file picker and by `Worklist::add`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "pdf"];

impl SourceKind {
    /// Infer the source kind from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Document),
            "jpg" | "jpeg" | "png" | "bmp" | "tif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }

    /// Infer the source kind from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Upper-case label for the list view's "type" column.
    pub fn label_for(path: &Path) -> String {
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_uppercase())
            .unwrap_or_default()
    }
}

/// Output page size.
///
/// Named presets carry the exact point dimensions used by common document
/// tools; `Native` keeps every source at its own size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum PageSize {
    #[default]
    Native,
    A3,
    A4,
    A5,
    A6,
    B4,
    B5,
    Letter,
    Legal,
    Tabloid,
    Photo4x6,
    Photo5x7,
    Custom { width_pt: f32, height_pt: f32 },
}

impl PageSize {
    /// Every preset, in the order the size picker lists them.
    pub const PRESETS: [PageSize; 12] = [
        PageSize::Native,
        PageSize::A3,
        PageSize::A4,
        PageSize::A5,
        PageSize::A6,
        PageSize::B4,
        PageSize::B5,
        PageSize::Letter,
        PageSize::Legal,
        PageSize::Tabloid,
        PageSize::Photo4x6,
        PageSize::Photo5x7,
    ];

    /// Portrait dimensions in points (width, height), or `None` for `Native`.
    pub fn dimensions_pt(&self) -> Option<(f32, f32)> {
        match self {
            Self::Native => None,
            Self::A3 => Some((841.89, 1190.55)),
            Self::A4 => Some((595.27, 841.89)),
            Self::A5 => Some((419.53, 595.27)),
            Self::A6 => Some((297.64, 419.53)),
            Self::B4 => Some((708.66, 1000.63)),
            Self::B5 => Some((498.90, 708.66)),
            Self::Letter => Some((612.0, 792.0)),
            Self::Legal => Some((612.0, 1008.0)),
            Self::Tabloid => Some((792.0, 1224.0)),
            Self::Photo4x6 => Some((288.0, 432.0)),
            Self::Photo5x7 => Some((360.0, 504.0)),
            Self::Custom {
                width_pt,
                height_pt,
            } => Some((*width_pt, *height_pt)),
        }
    }

    /// Label shown in the size picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Native => "Original size",
            Self::A3 => "A3 (297 x 420 mm)",
            Self::A4 => "A4 (210 x 297 mm)",
            Self::A5 => "A5 (148 x 210 mm)",
            Self::A6 => "A6 (105 x 148 mm)",
            Self::B4 => "B4 (250 x 353 mm)",
            Self::B5 => "B5 (176 x 250 mm)",
            Self::Letter => "Letter (8.5 x 11 in)",
            Self::Legal => "Legal (8.5 x 14 in)",
            Self::Tabloid => "Tabloid (11 x 17 in)",
            Self::Photo4x6 => "4 x 6 in (photo)",
            Self::Photo5x7 => "5 x 7 in (photo)",
            Self::Custom { .. } => "Custom",
        }
    }

    /// Reverse of [`PageSize::label`] for the named presets.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::PRESETS.into_iter().find(|p| p.label() == label)
    }
}

/// Requested page orientation for a configured target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// How placed content relates to the output page rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleMode {
    /// Fit the content into the full page, keeping its aspect ratio, centred.
    #[default]
    Fill,
    /// Keep the content at its native size, anchored at the top-left corner.
    Preserve,
}

/// Document-level metadata written to the output `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
}

/// Lowest and highest accepted JPEG quality.
pub const MIN_QUALITY: u8 = 10;
pub const MAX_QUALITY: u8 = 100;

/// Everything the pipeline needs to know besides the worklist itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParameters {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub scale_mode: ScaleMode,
    /// Recompress raster content as JPEG at `quality`.
    pub compress: bool,
    pub quality: u8,
    pub grayscale: bool,
    /// Swap the target width/height per page when the item's aspect disagrees.
    pub auto_rotate: bool,
    /// Rasterise document pages before placing them.
    pub flatten: bool,
    pub encrypt: bool,
    /// Never persisted.
    #[serde(skip)]
    pub owner_password: Option<String>,
    pub metadata: DocumentMetadata,
}

impl Default for ConversionParameters {
    fn default() -> Self {
        Self {
            page_size: PageSize::Native,
            orientation: Orientation::Portrait,
            scale_mode: ScaleMode::Fill,
            compress: false,
            quality: 80,
            grayscale: false,
            auto_rotate: false,
            flatten: false,
            encrypt: false,
            owner_password: None,
            metadata: DocumentMetadata::default(),
        }
    }
}

impl ConversionParameters {
    /// JPEG quality clamped to the accepted range.
    pub fn effective_quality(&self) -> u8 {
        self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
    }

    /// Target size mapped to the configured orientation, or `None` for native.
    pub fn oriented_target(&self) -> Option<(f32, f32)> {
        let (w, h) = self.page_size.dimensions_pt()?;
        let (short, long) = if w <= h { (w, h) } else { (h, w) };
        Some(match self.orientation {
            Orientation::Portrait => (short, long),
            Orientation::Landscape => (long, short),
        })
    }

    /// Target size for one item of the given size, applying auto-rotate.
    ///
    /// The decision is per item: only this page is swapped.
    pub fn target_for(&self, item_width: f32, item_height: f32) -> Option<(f32, f32)> {
        let (tw, th) = self.oriented_target()?;
        if self.auto_rotate && ((item_width > item_height) != (tw > th)) {
            Some((th, tw))
        } else {
            Some((tw, th))
        }
    }

    /// Whether raster content has to be decoded and re-encoded.
    pub fn transforms_raster(&self) -> bool {
        self.grayscale || self.compress
    }

    /// The encryption password if encryption is on and one was given.
    pub fn encryption_password(&self) -> Option<&str> {
        if !self.encrypt {
            return None;
        }
        self.owner_password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Incremental conversion progress, reported after every output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub pages_done: u32,
    pub pages_total: u32,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.pages_total == 0 {
            return 1.0;
        }
        (self.pages_done as f32 / self.pages_total as f32).min(1.0)
    }

    /// Whole percent for progress bars.
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub pages: u32,
    pub bytes_written: u64,
    pub encrypted: bool,
}

/// Lifecycle of the (single) conversion slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversionState {
    #[default]
    Idle,
    Converting,
    Succeeded(ConversionSummary),
    Failed { message: String },
}

impl ConversionState {
    pub fn is_converting(&self) -> bool {
        matches!(self, Self::Converting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(SourceKind::from_extension("PDF"), Some(SourceKind::Document));
        assert_eq!(SourceKind::from_extension("JpEg"), Some(SourceKind::Image));
        assert_eq!(SourceKind::from_extension("gif"), None);
        assert_eq!(
            SourceKind::from_path(Path::new("/x/scan.TIFF")),
            Some(SourceKind::Image)
        );
        assert_eq!(SourceKind::from_path(Path::new("/x/noext")), None);
    }

    #[test]
    fn defaults_keep_every_transform_off() {
        let params = ConversionParameters::default();
        assert!(!params.auto_rotate);
        assert!(!params.compress && !params.grayscale && !params.flatten && !params.encrypt);
        assert_eq!(params.scale_mode, ScaleMode::Fill);
        assert_eq!(params.orientation, Orientation::Portrait);
    }

    #[test]
    fn native_has_no_target() {
        let params = ConversionParameters::default();
        assert_eq!(params.oriented_target(), None);
        assert_eq!(params.target_for(100.0, 50.0), None);
    }

    #[test]
    fn landscape_swaps_preset() {
        let params = ConversionParameters {
            page_size: PageSize::A4,
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        assert_eq!(params.oriented_target(), Some((841.89, 595.27)));
    }

    #[test]
    fn auto_rotate_is_per_item() {
        let params = ConversionParameters {
            page_size: PageSize::A4,
            auto_rotate: true,
            ..Default::default()
        };
        assert_eq!(params.target_for(1000.0, 2000.0), Some((595.27, 841.89)));
        assert_eq!(params.target_for(2000.0, 1000.0), Some((841.89, 595.27)));

        let fixed = ConversionParameters {
            auto_rotate: false,
            ..params
        };
        assert_eq!(fixed.target_for(2000.0, 1000.0), Some((595.27, 841.89)));
    }

    #[test]
    fn quality_is_clamped() {
        let mut params = ConversionParameters {
            quality: 3,
            ..Default::default()
        };
        assert_eq!(params.effective_quality(), MIN_QUALITY);
        params.quality = 250;
        assert_eq!(params.effective_quality(), MAX_QUALITY);
    }

    #[test]
    fn empty_password_does_not_count() {
        let params = ConversionParameters {
            encrypt: true,
            owner_password: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(params.encryption_password(), None);
    }

    #[test]
    fn password_is_never_serialized() {
        let params = ConversionParameters {
            encrypt: true,
            owner_password: Some("secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&params).expect("serialize");
        assert!(!json.contains("secret"));
        let back: ConversionParameters = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.owner_password, None);
        assert!(back.encrypt);
    }

    #[test]
    fn preset_labels_round_trip() {
        for preset in PageSize::PRESETS {
            assert_eq!(PageSize::from_label(preset.label()), Some(preset));
        }
    }

    #[test]
    fn progress_fraction() {
        let p = Progress {
            pages_done: 1,
            pages_total: 4,
        };
        assert_eq!(p.percent(), 25);
        let empty = Progress {
            pages_done: 0,
            pages_total: 0,
        };
        assert_eq!(empty.fraction(), 1.0);
    }
}
