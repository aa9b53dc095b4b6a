//! Maps an [`EncoderSpec`] to the codec-specific encode call.
//!
//! Each target format gets its own save function plus one dispatch entry
//! point. Pixel layouts the individual codecs cannot take are normalized
//! first (JPEG has no alpha channel, WebP and BMP want 8-bit RGB/RGBA).

use std::io::{Seek, Write};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use tiff::encoder::{TiffEncoder, colortype, compression};

use crate::utils::{ConverterError, ConverterResult, EncoderSpec};

/// Encodes `image` into `writer` according to `spec`.
pub fn encode_to<W: Write + Seek>(
    writer: &mut W,
    image: &DynamicImage,
    spec: &EncoderSpec,
) -> ConverterResult<()> {
    match spec {
        EncoderSpec::Jpeg { quality } => save_jpeg(writer, image, *quality),
        EncoderSpec::Png => save_png(writer, image),
        EncoderSpec::Webp { quality: _ } => save_webp(writer, image),
        EncoderSpec::Bmp => save_bmp(writer, image),
        EncoderSpec::TiffLzw => save_tiff(writer, image),
    }
}

/// Saves `image` as JPEG at the given quality.
///
/// JPEG cannot carry an alpha channel; anything that is not already 8-bit
/// grayscale or RGB is flattened to RGB first.
fn save_jpeg<W: Write>(writer: &mut W, image: &DynamicImage, quality: u8) -> ConverterResult<()> {
    let mut encoder = JpegEncoder::new_with_quality(&mut *writer, quality);
    match image {
        DynamicImage::ImageLuma8(buf) => encoder.encode_image(buf),
        DynamicImage::ImageRgb8(buf) => encoder.encode_image(buf),
        other => encoder.encode_image(&other.to_rgb8()),
    }
    .map_err(|e| ConverterError::encode(format!("JPEG encode failed: {e}")))
}

/// Saves `image` as PNG at maximum lossless compression.
fn save_png<W: Write>(writer: &mut W, image: &DynamicImage) -> ConverterResult<()> {
    let encoder =
        PngEncoder::new_with_quality(&mut *writer, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color().into(),
        )
        .map_err(|e| ConverterError::encode(format!("PNG encode failed: {e}")))
}

/// Saves `image` as WebP.
///
/// The bundled WebP encoder is lossless; the quality setting selects no lossy
/// profile here the way it does for JPEG.
fn save_webp<W: Write>(writer: &mut W, image: &DynamicImage) -> ConverterResult<()> {
    let encoder = WebPEncoder::new_lossless(&mut *writer);
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => encoder.write_image(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color().into(),
        ),
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )
        }
    }
    .map_err(|e| ConverterError::encode(format!("WebP encode failed: {e}")))
}

/// Saves `image` as BMP. No encode parameters.
fn save_bmp<W: Write + Seek>(writer: &mut W, image: &DynamicImage) -> ConverterResult<()> {
    let mut encoder = BmpEncoder::new(writer);
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => encoder.encode(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color().into(),
        ),
        other => {
            let rgba = other.to_rgba8();
            encoder.encode(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )
        }
    }
    .map_err(|e| ConverterError::encode(format!("BMP encode failed: {e}")))
}

/// Saves `image` as TIFF with LZW compression.
fn save_tiff<W: Write + Seek>(writer: &mut W, image: &DynamicImage) -> ConverterResult<()> {
    let mut encoder = TiffEncoder::new(&mut *writer)
        .map_err(|e| ConverterError::encode(format!("TIFF encode failed: {e}")))?;

    let (width, height) = (image.width(), image.height());
    match image {
        DynamicImage::ImageLuma8(buf) => encoder.write_image_with_compression::<colortype::Gray8, _>(
            width,
            height,
            compression::Lzw,
            buf.as_raw(),
        ),
        DynamicImage::ImageRgb8(buf) => encoder.write_image_with_compression::<colortype::RGB8, _>(
            width,
            height,
            compression::Lzw,
            buf.as_raw(),
        ),
        DynamicImage::ImageRgba8(buf) => encoder
            .write_image_with_compression::<colortype::RGBA8, _>(
                width,
                height,
                compression::Lzw,
                buf.as_raw(),
            ),
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image_with_compression::<colortype::RGBA8, _>(
                width,
                height,
                compression::Lzw,
                rgba.as_raw(),
            )
        }
    }
    .map_err(|e| ConverterError::encode(format!("TIFF encode failed: {e}")))
}
