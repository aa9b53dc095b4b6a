//! Single-item conversion: decode, transform, encode, write.
//!
//! Runs synchronously on a blocking worker. Every failure is contained here
//! and turned into a failed [`ConversionOutcome`]; nothing propagates to the
//! batch orchestrator as a fault.

use std::path::Path;

use tracing::debug;

use crate::core::{
    CancelToken, ConversionOutcome, ConversionSettings, ConversionStats, ConversionTask, Dimensions,
};
use crate::processing::{encode, transform};
use crate::utils::fs::{display_name, file_size};
use crate::utils::{ConverterError, ConverterResult};

/// Converts one input file.
///
/// Returns `None` when cancellation was observed at a checkpoint before the
/// output was persisted; such an item records no outcome. Any other ending is
/// `Some` outcome, success or contained failure.
pub fn convert_one(
    task: &ConversionTask,
    settings: &ConversionSettings,
    token: &CancelToken,
) -> Option<ConversionOutcome> {
    match convert_inner(task, settings, token) {
        Ok(outcome) => Some(outcome),
        Err(ConverterError::Cancelled) => None,
        Err(e) => Some(ConversionOutcome::failed(
            task.input_path.clone(),
            task.output_path.clone(),
            e.to_string(),
        )),
    }
}

fn convert_inner(
    task: &ConversionTask,
    settings: &ConversionSettings,
    token: &CancelToken,
) -> ConverterResult<ConversionOutcome> {
    checkpoint(token)?;

    let input_path = &task.input_path;
    let original_size = file_size(input_path)
        .map_err(|e| ConverterError::decode(format!("Cannot read {}: {e}", input_path.display())))?;

    let image = image::open(input_path)
        .map_err(|e| ConverterError::decode(format!("Failed to load {}: {e}", input_path.display())))?;
    let original_dimensions = Dimensions::new(image.width(), image.height());

    debug!(
        "Loaded '{}': {original_dimensions}",
        display_name(input_path)
    );

    let image = transform::apply(image, settings)?;
    let final_dimensions = Dimensions::new(image.width(), image.height());

    let spec = settings.format.encoder_spec(settings.quality);

    ensure_parent_dir(&task.output_path)?;

    checkpoint(token)?;

    // Encode into a temp file next to the destination and persist with a
    // rename, so a cancellation or failure never leaves a partial output.
    let parent = task.output_path.parent().unwrap_or(Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| ConverterError::encode(format!("Cannot create staging file: {e}")))?;
    encode::encode_to(staged.as_file_mut(), &image, &spec)?;

    checkpoint(token)?;
    staged
        .persist(&task.output_path)
        .map_err(|e| ConverterError::encode(format!("Cannot write {}: {e}", task.output_path.display())))?;

    let final_size = file_size(&task.output_path)?;

    debug!(
        "Converted '{}' -> '{}' ({original_dimensions} -> {final_dimensions}, {original_size} -> {final_size} bytes)",
        display_name(input_path),
        display_name(&task.output_path),
    );

    Ok(ConversionOutcome::succeeded(
        input_path.clone(),
        task.output_path.clone(),
        ConversionStats {
            original_size,
            final_size,
            original_dimensions,
            final_dimensions,
        },
    ))
}

fn checkpoint(token: &CancelToken) -> ConverterResult<()> {
    if token.is_cancelled() {
        Err(ConverterError::Cancelled)
    } else {
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> ConverterResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConverterError::encode(format!("Cannot create output directory: {e}")))?;
    }
    Ok(())
}
