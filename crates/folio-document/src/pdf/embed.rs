// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObject payloads — raster data in the shape a PDF image dictionary
// expects (JPEG pass-through, re-encoded JPEG, or raw samples).

use std::io::Cursor;

use ::image::codecs::jpeg::JpegDecoder;
use ::image::{DynamicImage, ExtendedColorType, ImageDecoder};
use folio_core::error::FolioError;
use lopdf::{Object, Stream, dictionary};
use tracing::debug;

use crate::image::ImageProcessor;

/// Colour space of an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
        }
    }
}

/// How the sample data is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// JPEG bytes, written with `/Filter /DCTDecode`.
    Jpeg,
    /// Raw 8-bit samples; Flate-compressed when the document is finalised.
    Raw,
}

/// Raster data ready to become a PDF image XObject.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub encoding: Encoding,
    pub data: Vec<u8>,
    /// 8-bit alpha samples, written as a `/SMask`.
    pub alpha: Option<Vec<u8>>,
}

impl EmbeddedImage {
    /// Use JPEG bytes as they are, if the PDF can carry them unchanged.
    ///
    /// Only RGB and grayscale JPEGs qualify; CMYK and other layouts return
    /// `None` and go through [`EmbeddedImage::lossless`] instead.
    pub fn jpeg_passthrough(bytes: Vec<u8>) -> Option<Self> {
        let decoder = JpegDecoder::new(Cursor::new(&bytes)).ok()?;
        let (width, height) = decoder.dimensions();
        let color_space = match decoder.original_color_type() {
            ExtendedColorType::Rgb8 => ColorSpace::Rgb,
            ExtendedColorType::L8 => ColorSpace::Gray,
            _ => return None,
        };
        debug!(width, height, ?color_space, "JPEG passed through");
        Some(Self {
            width,
            height,
            color_space,
            encoding: Encoding::Jpeg,
            data: bytes,
            alpha: None,
        })
    }

    /// Store the image losslessly as raw samples, alpha as a soft mask.
    pub fn lossless(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let color = image.color();

        let alpha = color.has_alpha().then(|| {
            image
                .to_luma_alpha8()
                .pixels()
                .map(|p| p.0[1])
                .collect::<Vec<u8>>()
        });

        let (color_space, data) = if color.has_color() {
            (ColorSpace::Rgb, image.to_rgb8().into_raw())
        } else {
            (ColorSpace::Gray, image.to_luma8().into_raw())
        };

        Self {
            width,
            height,
            color_space,
            encoding: Encoding::Raw,
            data,
            alpha,
        }
    }

    /// Re-encode as JPEG at `quality`, compositing any alpha onto white.
    pub fn jpeg(image: DynamicImage, quality: u8) -> Result<Self, FolioError> {
        let processor = ImageProcessor::from_dynamic(image).flatten_alpha();
        let color_space = if processor.has_color() {
            ColorSpace::Rgb
        } else {
            ColorSpace::Gray
        };
        let data = processor.to_jpeg_bytes(quality)?;
        Ok(Self {
            width: processor.width(),
            height: processor.height(),
            color_space,
            encoding: Encoding::Jpeg,
            data,
            alpha: None,
        })
    }

    /// Build the image XObject stream. `smask` is the object id of an
    /// already-added soft mask, if any.
    pub(crate) fn to_stream(&self, smask: Option<lopdf::ObjectId>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space.pdf_name(),
            "BitsPerComponent" => 8,
        };
        if let Some(id) = smask {
            dict.set("SMask", Object::Reference(id));
        }
        match self.encoding {
            Encoding::Jpeg => {
                dict.set("Filter", "DCTDecode");
                Stream::new(dict, self.data.clone()).with_compression(false)
            }
            Encoding::Raw => Stream::new(dict, self.data.clone()),
        }
    }

    /// Build the soft-mask stream for the alpha channel, if there is one.
    pub(crate) fn smask_stream(&self) -> Option<Stream> {
        let alpha = self.alpha.as_ref()?;
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        Some(Stream::new(dict, alpha.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn rgb_jpeg_is_passed_through() {
        let bytes = ImageProcessor::from_dynamic(DynamicImage::new_rgb8(20, 10))
            .to_jpeg_bytes(90)
            .expect("encode");
        let embedded = EmbeddedImage::jpeg_passthrough(bytes.clone()).expect("passthrough");
        assert_eq!((embedded.width, embedded.height), (20, 10));
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        assert_eq!(embedded.data, bytes);
    }

    #[test]
    fn png_bytes_are_not_a_jpeg() {
        let png = ImageProcessor::from_dynamic(DynamicImage::new_rgb8(4, 4))
            .to_png_bytes()
            .expect("encode");
        assert!(EmbeddedImage::jpeg_passthrough(png).is_none());
    }

    #[test]
    fn lossless_splits_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 77])));
        let embedded = EmbeddedImage::lossless(&img);
        assert_eq!(embedded.color_space, ColorSpace::Rgb);
        assert_eq!(embedded.data.len(), 3 * 2 * 3);
        assert_eq!(embedded.alpha.as_deref(), Some(&[77u8; 6][..]));
    }

    #[test]
    fn gray_jpeg_stays_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([90])));
        let embedded = EmbeddedImage::jpeg(img, 50).expect("jpeg");
        assert_eq!(embedded.color_space, ColorSpace::Gray);
        assert_eq!(embedded.encoding, Encoding::Jpeg);
        assert!(embedded.alpha.is_none());
    }
}
