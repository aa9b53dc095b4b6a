use std::path::Path;

use crate::core::ConversionSettings;
use crate::utils::{ConverterResult, ValidationError};

/// Validates the output directory for a whole batch.
///
/// This is the only caller-level fault that aborts a run before any item
/// starts: a path that exists but is not a directory, or one that cannot be
/// created. Per-item write failures stay contained in their outcomes.
pub fn validate_output_dir(path: &Path) -> ConverterResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(ValidationError::not_a_directory(path).into());
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|e| {
        ValidationError::settings(format!(
            "Cannot create output directory {}: {e}",
            path.display()
        ))
    })?;
    Ok(())
}

/// Validates the shared settings for a whole batch.
///
/// A zero resize bound is wrong for every item alike, so it is a caller-level
/// fault rather than N identical per-item failures. Out-of-range quality is
/// NOT rejected here; it clamps (permissive defaulting).
pub fn validate_settings(settings: &ConversionSettings) -> ConverterResult<()> {
    if settings.max_width == Some(0) {
        return Err(ValidationError::settings("Maximum width cannot be 0").into());
    }
    if settings.max_height == Some(0) {
        return Err(ValidationError::settings("Maximum height cannot be 0").into());
    }
    Ok(())
}
