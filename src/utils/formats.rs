use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::utils::fs::extension_lowercase;
use crate::utils::{ConverterError, ValidationError};

/// Source extensions the converter accepts. HEIC/HEIF decode support depends
/// on the codec stack; they are still recognized so callers can submit them
/// and get a contained per-item failure instead of a filtered-out file.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "heic", "heif",
];

/// Target formats the converter can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
    Tiff,
}

/// Format-specific encode settings resolved from a [`TargetFormat`] and a
/// quality value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderSpec {
    /// Lossy JPEG at the given quality (1-100)
    Jpeg { quality: u8 },
    /// Lossless PNG at maximum compression; quality is ignored
    Png,
    /// WebP at the given quality (1-100)
    Webp { quality: u8 },
    /// BMP has no encode parameters
    Bmp,
    /// TIFF with LZW compression; quality is ignored
    TiffLzw,
}

impl TargetFormat {
    /// Maps a file extension to a target format. Total: unrecognized
    /// extensions default to JPEG, and HEIC/HEIF map to JPEG because there is
    /// no HEIC encoder.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "webp" => Self::Webp,
            "bmp" => Self::Bmp,
            "tiff" | "tif" => Self::Tiff,
            "heic" | "heif" => Self::Jpeg,
            _ => Self::Jpeg,
        }
    }

    /// Maps a file path to a target format via its extension. A path with no
    /// extension resolves to JPEG.
    pub fn resolve(path: impl AsRef<Path>) -> Self {
        match extension_lowercase(path.as_ref()) {
            Some(ext) => Self::from_extension(&ext),
            None => Self::Jpeg,
        }
    }

    /// Canonical output extension for this format, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    /// Resolves the encode settings for this format.
    ///
    /// JPEG and WebP carry the quality value; PNG always uses maximum
    /// lossless compression, BMP takes no parameters, and TIFF always uses
    /// LZW. Out-of-range quality is clamped rather than rejected.
    pub fn encoder_spec(&self, quality: u8) -> EncoderSpec {
        let quality = clamp_quality(quality);
        match self {
            Self::Jpeg => EncoderSpec::Jpeg { quality },
            Self::Png => EncoderSpec::Png,
            Self::Webp => EncoderSpec::Webp { quality },
            Self::Bmp => EncoderSpec::Bmp,
            Self::Tiff => EncoderSpec::TiffLzw,
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        };
        f.write_str(name)
    }
}

// Strict parsing for user-supplied format names (CLI, settings). Unlike
// `from_extension` this rejects unknown names instead of defaulting.
impl FromStr for TargetFormat {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            "bmp" => Ok(Self::Bmp),
            "tiff" | "tif" => Ok(Self::Tiff),
            other => Err(ValidationError::settings(format!(
                "Unknown output format: {other}"
            ))
            .into()),
        }
    }
}

/// True iff the extension is one of the recognized source extensions.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    match extension_lowercase(path.as_ref()) {
        Some(ext) => SOURCE_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Clamps a quality value into the codec-valid 1-100 range.
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}
