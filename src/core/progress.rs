use serde::Serialize;
use std::path::PathBuf;

/// Snapshot emitted once per completed item.
///
/// Within one batch run, `completed` is strictly increasing 1..=total with no
/// gaps or duplicates, and `total` is fixed at batch start. The snapshot is
/// produced inside the same critical section that appends the item's outcome,
/// so it is always consistent with the result list's length.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Number of completed items so far
    pub completed: usize,
    /// Total number of items in the batch
    pub total: usize,
    /// The item that just completed
    pub current_file: PathBuf,
}

impl ProgressUpdate {
    /// Progress percentage (0-100)
    pub fn percentage(&self) -> usize {
        if self.total > 0 {
            (self.completed * 100) / self.total
        } else {
            0
        }
    }
}
