//! Pure single-image transform engine: crop first, then resize.
//!
//! No filesystem access and no concurrency; deterministic for identical
//! inputs. Resampling uses Lanczos3 throughout.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::core::{ConversionSettings, CropRect};
use crate::utils::{ConverterError, ConverterResult};

/// Applies the optional crop and resize from `settings` to `image`.
///
/// The crop always precedes the resize, so resize bounds act on the cropped
/// region's dimensions. With no crop and no bounds the image passes through
/// unchanged.
pub fn apply(image: DynamicImage, settings: &ConversionSettings) -> ConverterResult<DynamicImage> {
    let image = match settings.crop {
        Some(rect) => crop(image, rect)?,
        None => image,
    };

    if settings.max_width.is_none() && settings.max_height.is_none() {
        return Ok(image);
    }

    Ok(resize(
        image,
        settings.max_width,
        settings.max_height,
        settings.maintain_aspect,
    ))
}

/// Extracts `rect` from `image`. The rectangle must be non-empty and lie
/// entirely within the image bounds; anything else is rejected rather than
/// silently producing an empty or clipped result.
fn crop(image: DynamicImage, rect: CropRect) -> ConverterResult<DynamicImage> {
    let (img_w, img_h) = (image.width(), image.height());

    if rect.width == 0 || rect.height == 0 {
        return Err(ConverterError::transform(format!(
            "Crop rectangle is empty: {}x{}",
            rect.width, rect.height
        )));
    }

    let within_bounds = rect
        .x
        .checked_add(rect.width)
        .is_some_and(|right| right <= img_w)
        && rect
            .y
            .checked_add(rect.height)
            .is_some_and(|bottom| bottom <= img_h);
    if !within_bounds {
        return Err(ConverterError::transform(format!(
            "Crop rectangle {}x{}+{}+{} exceeds image bounds {img_w}x{img_h}",
            rect.width, rect.height, rect.x, rect.y
        )));
    }

    Ok(image.crop_imm(rect.x, rect.y, rect.width, rect.height))
}

fn resize(
    image: DynamicImage,
    max_width: Option<u32>,
    max_height: Option<u32>,
    maintain_aspect: bool,
) -> DynamicImage {
    match (max_width, max_height) {
        // Exact dimensions requested: scale to fill, then center-crop the
        // overflow. This is the only path that may upscale.
        (Some(w), Some(h)) if !maintain_aspect => image.resize_to_fill(w, h, FilterType::Lanczos3),
        _ => {
            let (w, h) = fit_within(image.width(), image.height(), max_width, max_height);
            if (w, h) == (image.width(), image.height()) {
                image
            } else {
                image.resize_exact(w, h, FilterType::Lanczos3)
            }
        }
    }
}

/// Computes the dimensions of `orig_w x orig_h` scaled to fit within the
/// given bounding box, preserving aspect ratio and never upscaling. A missing
/// bound is unbounded; rounding never drops a dimension below 1.
pub fn fit_within(
    orig_w: u32,
    orig_h: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let scale_w = max_width.map_or(f64::INFINITY, |w| w as f64 / orig_w as f64);
    let scale_h = max_height.map_or(f64::INFINITY, |h| h as f64 / orig_h as f64);
    let scale = scale_w.min(scale_h);

    if scale >= 1.0 {
        return (orig_w, orig_h);
    }

    let width = ((orig_w as f64 * scale).round() as u32).max(1);
    let height = ((orig_h as f64 * scale).round() as u32).max(1);
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TargetFormat;
    use image::RgbImage;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    fn settings() -> ConversionSettings {
        ConversionSettings {
            format: TargetFormat::Png,
            ..Default::default()
        }
    }

    #[test]
    fn fit_scales_down_to_width_bound() {
        assert_eq!(fit_within(2000, 1500, Some(1024), None), (1024, 768));
    }

    #[test]
    fn fit_scales_down_to_height_bound() {
        assert_eq!(fit_within(2000, 1500, None, Some(750)), (1000, 750));
    }

    #[test]
    fn fit_uses_the_tighter_of_two_bounds() {
        // Width ratio 0.5, height ratio 0.2: height wins.
        assert_eq!(fit_within(1000, 500, Some(500), Some(100)), (200, 100));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_within(800, 600, Some(1024), Some(1024)), (800, 600));
        assert_eq!(fit_within(10, 10, Some(5000), None), (10, 10));
    }

    #[test]
    fn fit_respects_bounds_after_rounding() {
        for (w, h) in [(1000, 999), (333, 777), (4000, 3000)] {
            let (nw, nh) = fit_within(w, h, Some(100), Some(100));
            assert!(nw <= 100 && nh <= 100, "{w}x{h} -> {nw}x{nh}");
            let orig_ratio = w as f64 / h as f64;
            let new_ratio = nw as f64 / nh as f64;
            assert!((orig_ratio - new_ratio).abs() / orig_ratio < 0.02);
        }
    }

    #[test]
    fn no_crop_and_no_bounds_is_a_passthrough() {
        let out = apply(test_image(320, 240), &settings()).unwrap();
        assert_eq!((out.width(), out.height()), (320, 240));
    }

    #[test]
    fn crop_extracts_the_requested_region() {
        let mut cfg = settings();
        cfg.crop = Some(CropRect {
            x: 10,
            y: 20,
            width: 100,
            height: 50,
        });
        let out = apply(test_image(320, 240), &cfg).unwrap();
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn crop_outside_bounds_is_rejected() {
        let mut cfg = settings();
        cfg.crop = Some(CropRect {
            x: 300,
            y: 0,
            width: 100,
            height: 50,
        });
        let err = apply(test_image(320, 240), &cfg).unwrap_err();
        assert!(matches!(err, ConverterError::Transform(_)));
    }

    #[test]
    fn empty_crop_is_rejected() {
        let mut cfg = settings();
        cfg.crop = Some(CropRect {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        });
        assert!(apply(test_image(320, 240), &cfg).is_err());
    }

    #[test]
    fn resize_operates_on_the_cropped_region() {
        // Crop 1000x1000 out of 2000x1000, then bound width to 500: the
        // result must be 500x500, not a scale of the original frame.
        let mut cfg = settings();
        cfg.crop = Some(CropRect {
            x: 0,
            y: 0,
            width: 1000,
            height: 1000,
        });
        cfg.max_width = Some(500);
        let out = apply(test_image(2000, 1000), &cfg).unwrap();
        assert_eq!((out.width(), out.height()), (500, 500));
    }

    #[test]
    fn exact_resize_ignores_aspect_ratio() {
        let mut cfg = settings();
        cfg.max_width = Some(64);
        cfg.max_height = Some(64);
        cfg.maintain_aspect = false;
        let out = apply(test_image(320, 240), &cfg).unwrap();
        assert_eq!((out.width(), out.height()), (64, 64));
    }

    #[test]
    fn single_bound_keeps_aspect_even_without_maintain_flag() {
        let mut cfg = settings();
        cfg.max_width = Some(160);
        cfg.maintain_aspect = false;
        let out = apply(test_image(320, 240), &cfg).unwrap();
        assert_eq!((out.width(), out.height()), (160, 120));
    }
}
