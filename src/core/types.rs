//! Core types for conversion settings and results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{TargetFormat, clamp_quality};

/// Shared parameters for one batch run.
///
/// Supplied once per invocation and immutable thereafter; every item in the
/// batch is converted with the same settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSettings {
    /// Target format every input is converted into
    pub format: TargetFormat,
    /// Quality (1-100); meaningful for lossy formats, ignored by the rest
    pub quality: u8,
    /// Maximum output width in pixels
    pub max_width: Option<u32>,
    /// Maximum output height in pixels
    pub max_height: Option<u32>,
    /// Whether resizing preserves the aspect ratio (fit-within-box)
    pub maintain_aspect: bool,
    /// Optional crop applied before any resize, in source-pixel coordinates
    pub crop: Option<CropRect>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: TargetFormat::Jpeg,
            quality: 90,
            max_width: None,
            max_height: None,
            maintain_aspect: true,
            crop: None,
        }
    }
}

impl ConversionSettings {
    /// Returns the settings with the quality clamped into the codec-valid
    /// range. Out-of-range values are corrected, not rejected.
    pub fn clamped(mut self) -> Self {
        self.quality = clamp_quality(self.quality);
        self
    }
}

/// A sub-region of the source image, extracted before any resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size and dimension statistics captured for a successfully converted item.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    /// Original file size in bytes
    pub original_size: u64,
    /// Converted file size in bytes
    pub final_size: u64,
    /// Source pixel dimensions before any transform
    pub original_dimensions: Dimensions,
    /// Output pixel dimensions after crop/resize
    pub final_dimensions: Dimensions,
}

/// Terminal result record for one converted item.
///
/// Exactly one of `stats` (success) or `error` (failure) is populated; the
/// constructors are the only way to build one, so the invariant holds by
/// construction. Outcomes are created once by the single-item converter and
/// never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    /// Path to the source file
    pub input_path: PathBuf,
    /// Path the converted file was (or would have been) written to
    pub output_path: PathBuf,
    /// Populated iff the conversion succeeded
    pub stats: Option<ConversionStats>,
    /// Human-readable failure message, populated iff the conversion failed
    pub error: Option<String>,
}

impl ConversionOutcome {
    pub fn succeeded(input_path: PathBuf, output_path: PathBuf, stats: ConversionStats) -> Self {
        Self {
            input_path,
            output_path,
            stats: Some(stats),
            error: None,
        }
    }

    pub fn failed(input_path: PathBuf, output_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            input_path,
            output_path,
            stats: None,
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.stats.is_some()
    }
}

/// How a batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every input was processed
    Completed,
    /// The cancellation signal was observed before every input was processed
    Cancelled,
}

/// Result of a whole batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Completed or cancelled; the caller distinguishes the two here, never
    /// through per-item errors
    pub status: BatchStatus,
    /// One outcome per item that was allowed to start, in completion order
    pub outcomes: Vec<ConversionOutcome>,
    /// Number of inputs submitted to the batch
    pub total: usize,
    /// Wall-clock time for the whole run in milliseconds
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Number of items that converted successfully.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }
}
