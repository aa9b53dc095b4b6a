//! Concurrent batch orchestration.
//!
//! Fans the single-item converter out across the blocking pool, bounded by a
//! counting semaphore, and aggregates outcomes and progress behind one lock
//! so every emitted snapshot is consistent with the result list.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::{
    BatchReport, BatchStatus, CancelToken, ConversionOutcome, ConversionSettings, ProgressUpdate,
    plan_tasks,
};
use crate::processing::converter;
use crate::utils::{ConverterResult, validate_output_dir, validate_settings};

/// Outcomes and the completed counter are one shared resource: mutating them
/// and emitting the matching progress snapshot happens under a single lock,
/// never under two.
#[derive(Debug, Default, Clone)]
struct BatchState {
    outcomes: Vec<ConversionOutcome>,
    completed: usize,
}

/// Drives concurrent conversion of a list of inputs.
pub struct BatchConverter {
    max_in_flight: usize,
}

impl BatchConverter {
    /// Creates an orchestrator capped at `2 x available processing units`
    /// in-flight conversions. Conversions block on both file IO and CPU-bound
    /// codec work, so the cap is above `1 x cores` to keep the pool saturated
    /// without unbounded memory growth. Computed once, not adaptive.
    pub fn new() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            max_in_flight: cores * 2,
        }
    }

    /// Overrides the concurrency cap. Clamped to at least 1.
    pub fn with_max_in_flight(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Converts every input into `output_dir` under the shared `settings`.
    ///
    /// One outcome is recorded per item that was allowed to start; no item
    /// failure aborts the rest. `on_progress` is invoked exactly once per
    /// completed item, in append order. The only error this returns is
    /// batch-level: an output directory that cannot be used at all.
    pub async fn convert_batch<F>(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        settings: &ConversionSettings,
        token: CancelToken,
        on_progress: F,
    ) -> ConverterResult<BatchReport>
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        let started = Instant::now();
        validate_output_dir(output_dir)?;
        validate_settings(settings)?;

        let settings = Arc::new(settings.clone().clamped());
        let tasks = plan_tasks(inputs, output_dir, settings.format);
        let total = tasks.len();
        info!(
            "Converting {total} files to {} (max {} in flight)",
            settings.format, self.max_in_flight
        );

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let state = Arc::new(Mutex::new(BatchState::default()));
        let observer: Arc<F> = Arc::new(on_progress);

        let mut units = JoinSet::new();
        for task in tasks {
            let semaphore = semaphore.clone();
            let state = state.clone();
            let observer = observer.clone();
            let settings = settings.clone();
            let token = token.clone();

            units.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                // Units that have not started when the signal is raised must
                // not start; they record no outcome.
                if token.is_cancelled() {
                    debug!("Skipping '{}': batch cancelled", task.input_path.display());
                    return;
                }

                let input_path = task.input_path.clone();
                let output_path = task.output_path.clone();
                let outcome = match tokio::task::spawn_blocking(move || {
                    converter::convert_one(&task, &settings, &token)
                })
                .await
                {
                    Ok(outcome) => outcome,
                    // The item did start, so a panicking conversion still
                    // gets its outcome slot.
                    Err(e) => Some(ConversionOutcome::failed(
                        input_path.clone(),
                        output_path,
                        format!("Conversion panicked: {e}"),
                    )),
                };

                let Some(outcome) = outcome else {
                    return;
                };
                let mut state = state.lock().await;
                state.outcomes.push(outcome);
                state.completed += 1;
                observer(ProgressUpdate {
                    completed: state.completed,
                    total,
                    current_file: input_path,
                });
            });
        }

        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                warn!("Conversion unit failed to join: {e}");
            }
        }

        let state = match Arc::try_unwrap(state) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };

        let status = if token.is_cancelled() {
            BatchStatus::Cancelled
        } else {
            BatchStatus::Completed
        };

        let report = BatchReport {
            status,
            outcomes: state.outcomes,
            total,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        match report.status {
            BatchStatus::Cancelled => warn!(
                "Batch cancelled after {} of {total} files",
                report.outcomes.len()
            ),
            BatchStatus::Completed => info!(
                "Batch complete: {} of {total} files succeeded in {}ms",
                report.success_count(),
                report.elapsed_ms
            ),
        }

        Ok(report)
    }
}

impl Default for BatchConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TargetFormat;
    use image::RgbImage;
    use std::sync::Mutex as StdMutex;

    // Encoding is picked from the file name's extension.
    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn settings(format: TargetFormat) -> ConversionSettings {
        ConversionSettings {
            format,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_outcome_per_input_without_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs: Vec<PathBuf> = (0..5)
            .map(|i| write_image(dir.path(), &format!("img{i}.png"), 32, 32))
            .collect();

        let report = BatchConverter::new()
            .convert_batch(
                &inputs,
                &out,
                &settings(TargetFormat::Jpeg),
                CancelToken::new(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Completed);
        assert_eq!(report.outcomes.len(), inputs.len());
        assert_eq!(report.success_count(), inputs.len());
        for outcome in &report.outcomes {
            assert!(outcome.output_path.is_file());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_bad_file_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let good1 = write_image(dir.path(), "good1.png", 16, 16);
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let good2 = write_image(dir.path(), "good2.png", 16, 16);

        let report = BatchConverter::new()
            .convert_batch(
                &[good1, bad.clone(), good2],
                &out,
                &settings(TargetFormat::Png),
                CancelToken::new(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.success_count(), 2);
        let failed = report.outcomes.iter().find(|o| !o.success()).unwrap();
        assert_eq!(failed.input_path, bad);
        assert!(failed.error.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn progress_counts_are_strictly_increasing_with_fixed_total() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs: Vec<PathBuf> = (0..8)
            .map(|i| write_image(dir.path(), &format!("img{i}.png"), 24, 24))
            .collect();

        let seen: Arc<StdMutex<Vec<ProgressUpdate>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        let report = BatchConverter::with_max_in_flight(3)
            .convert_batch(
                &inputs,
                &out,
                &settings(TargetFormat::Bmp),
                CancelToken::new(),
                move |update| sink.lock().unwrap().push(update),
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(report.outcomes.len(), 8);
        assert_eq!(seen.len(), 8);
        for (i, update) in seen.iter().enumerate() {
            assert_eq!(update.completed, i + 1);
            assert_eq!(update.total, 8);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pre_raised_token_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs: Vec<PathBuf> = (0..4)
            .map(|i| write_image(dir.path(), &format!("img{i}.png"), 16, 16))
            .collect();

        let token = CancelToken::new();
        token.cancel();

        let report = BatchConverter::new()
            .convert_batch(&inputs, &out, &settings(TargetFormat::Jpeg), token, |_| {})
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Cancelled);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancelling_mid_run_keeps_completed_outcomes_only() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs: Vec<PathBuf> = (0..12)
            .map(|i| write_image(dir.path(), &format!("img{i}.png"), 32, 32))
            .collect();

        let token = CancelToken::new();
        let trigger = token.clone();
        let report = BatchConverter::with_max_in_flight(2)
            .convert_batch(
                &inputs,
                &out,
                &settings(TargetFormat::Png),
                token,
                move |update| {
                    if update.completed == 2 {
                        trigger.cancel();
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Cancelled);
        assert!(report.outcomes.len() >= 2);
        assert!(report.outcomes.len() <= inputs.len());
        // Everything that did record an outcome finished its write.
        for outcome in report.outcomes.iter().filter(|o| o.success()) {
            assert!(outcome.output_path.is_file());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn colliding_stems_produce_distinct_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        let out = dir.path().join("out");
        let inputs = vec![
            write_image(&a, "img.png", 16, 16),
            write_image(&b, "img.png", 16, 16),
        ];

        let report = BatchConverter::new()
            .convert_batch(
                &inputs,
                &out,
                &settings(TargetFormat::Jpeg),
                CancelToken::new(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(report.success_count(), 2);
        let mut names: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| o.output_path.file_name().unwrap().to_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["img-1.jpg", "img.jpg"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resized_png_batch_matches_requested_bounds() {
        // Mixed-size inputs bounded to width 1024 with aspect preserved.
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let inputs = vec![
            write_image(dir.path(), "a.jpg", 2000, 1500),
            write_image(dir.path(), "b.jpg", 800, 600),
            write_image(dir.path(), "c.jpg", 1200, 900),
        ];

        let mut cfg = settings(TargetFormat::Png);
        cfg.max_width = Some(1024);

        let report = BatchConverter::new()
            .convert_batch(&inputs, &out, &cfg, CancelToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.success_count(), 3);
        for outcome in &report.outcomes {
            let dims = outcome.stats.unwrap().final_dimensions;
            assert!(dims.width <= 1024);
            assert_eq!(
                outcome.output_path.extension().and_then(|e| e.to_str()),
                Some("png")
            );
        }
        let large = report
            .outcomes
            .iter()
            .find(|o| o.input_path.file_name().unwrap() == "a.jpg")
            .unwrap();
        assert_eq!(
            large.stats.unwrap().final_dimensions,
            crate::core::Dimensions::new(1024, 768)
        );
        let small = report
            .outcomes
            .iter()
            .find(|o| o.input_path.file_name().unwrap() == "b.jpg")
            .unwrap();
        assert_eq!(
            small.stats.unwrap().final_dimensions,
            crate::core::Dimensions::new(800, 600)
        );
    }

    #[tokio::test]
    async fn unusable_output_directory_aborts_before_any_item() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, b"file in the way").unwrap();
        let input = write_image(dir.path(), "img.png", 16, 16);

        let result = BatchConverter::new()
            .convert_batch(
                &[input],
                &blocker,
                &settings(TargetFormat::Jpeg),
                CancelToken::new(),
                |_| {},
            )
            .await;
        assert!(result.is_err());
    }
}
