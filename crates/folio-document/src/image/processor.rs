// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — grayscale, alpha flattening, thumbnailing, and JPEG/PNG
// re-encoding of source images and rasterised pages, using the `image` crate.

use std::path::Path;

use folio_core::error::FolioError;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Every transformation consumes `self` and returns a new `ImageProcessor`,
/// so steps chain:
///
/// ```ignore
/// let jpeg = ImageProcessor::open("scan.png")?
///     .grayscale()
///     .flatten_alpha()
///     .to_jpeg_bytes(80)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FolioError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            FolioError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        debug!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, FolioError> {
        let img = image::load_from_memory(data)
            .map_err(|err| FolioError::ImageError(format!("failed to decode image: {}", err)))?;
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Read an image file's pixel size from its header without decoding it.
    pub fn probe_dimensions(path: impl AsRef<Path>) -> Result<(u32, u32), FolioError> {
        image::image_dimensions(path.as_ref()).map_err(|err| {
            FolioError::ImageError(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the image carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Whether the image carries colour (as opposed to luma only).
    pub fn has_color(&self) -> bool {
        self.image.color().has_color()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Convert the image to grayscale, keeping any alpha channel.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        info!("Converting to grayscale");
        let image = if self.image.color().has_alpha() {
            DynamicImage::ImageLumaA8(self.image.to_luma_alpha8())
        } else {
            DynamicImage::ImageLuma8(self.image.to_luma8())
        };
        Self { image }
    }

    /// Composite any alpha channel onto a white background.
    ///
    /// JPEG has no alpha, so this runs before lossy recompression. Images
    /// without alpha pass through untouched.
    pub fn flatten_alpha(self) -> Self {
        if !self.image.color().has_alpha() {
            return self;
        }
        debug!("Flattening alpha onto white");

        let gray = !self.image.color().has_color();
        let rgba = self.image.to_rgba8();
        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let blend = |channel: u8| -> u8 {
                let alpha = a as u32;
                ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
            };
            image::Rgb([blend(r), blend(g), blend(b)])
        });

        let image = DynamicImage::ImageRgb8(flattened);
        let image = if gray {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            image
        };
        Self { image }
    }

    /// Shrink the image so its longest edge is at most `max_edge` pixels,
    /// preserving aspect ratio. Never upscales.
    pub fn thumbnail(self, max_edge: u32) -> Self {
        if self.image.width() <= max_edge && self.image.height() <= max_edge {
            return self;
        }
        Self {
            image: self.image.thumbnail(max_edge, max_edge),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, FolioError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// Luma images stay single-channel; everything else is encoded as RGB.
    /// Call [`ImageProcessor::flatten_alpha`] first to control how
    /// transparency is resolved.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, FolioError> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        let result = if self.image.color().has_color() {
            self.image.to_rgb8().write_with_encoder(encoder)
        } else {
            self.image.to_luma8().write_with_encoder(encoder)
        };
        result.map_err(|err| FolioError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, FolioError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| FolioError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn half_transparent_red() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 0])))
    }

    #[test]
    fn flatten_alpha_composites_onto_white() {
        let flat = ImageProcessor::from_dynamic(half_transparent_red()).flatten_alpha();
        assert!(!flat.has_alpha());
        let rgb = flat.as_dynamic().to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn opaque_pixels_survive_flattening() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let rgb = ImageProcessor::from_dynamic(img)
            .flatten_alpha()
            .into_dynamic()
            .to_rgb8();
        assert_eq!(rgb.get_pixel(1, 1), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn grayscale_drops_colour_keeps_alpha() {
        let gray = ImageProcessor::from_dynamic(half_transparent_red()).grayscale();
        assert!(!gray.has_color());
        assert!(gray.has_alpha());
    }

    #[test]
    fn thumbnail_never_upscales() {
        let img = DynamicImage::new_rgb8(40, 20);
        let small = ImageProcessor::from_dynamic(img.clone()).thumbnail(120);
        assert_eq!((small.width(), small.height()), (40, 20));

        let big = DynamicImage::new_rgb8(1200, 600);
        let thumb = ImageProcessor::from_dynamic(big).thumbnail(120);
        assert_eq!((thumb.width(), thumb.height()), (120, 60));
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let img = DynamicImage::new_rgb8(33, 17);
        let bytes = ImageProcessor::from_dynamic(img)
            .to_jpeg_bytes(60)
            .expect("encode");
        let decoded = ImageProcessor::from_bytes(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
    }
}
