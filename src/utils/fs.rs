use std::path::Path;

use crate::utils::ConverterResult;

/// Get file size in bytes
pub fn file_size(path: impl AsRef<Path>) -> ConverterResult<u64> {
    Ok(std::fs::metadata(path.as_ref())?.len())
}

/// Get file extension as a lowercase string, if any
pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// File name for display in logs and progress messages
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
