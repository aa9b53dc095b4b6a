//! Conversion task definition and output-path planning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::utils::TargetFormat;

/// One unit of batch work: a source file and the output path derived for it.
///
/// Identity is the input path; the output path is fixed when the batch is
/// planned and never changes afterwards.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    /// Path to the source image file
    pub input_path: PathBuf,
    /// Path the converted image will be written to
    pub output_path: PathBuf,
}

/// Derives one task per input, up front and in input order.
///
/// Output names are the input stem plus the target extension, inside
/// `output_dir`. Two inputs with the same stem (e.g. `a/img.png` and
/// `b/img.bmp`) would silently overwrite each other in one output directory,
/// so colliding names get `-1`, `-2`, ... appended to the stem. Planning all
/// names before any work starts keeps the assignment deterministic even
/// though completion order is not.
pub fn plan_tasks(inputs: &[PathBuf], output_dir: &Path, format: TargetFormat) -> Vec<ConversionTask> {
    let ext = format.extension();
    let mut used: HashSet<String> = HashSet::with_capacity(inputs.len());

    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());

            let mut name = format!("{stem}.{ext}");
            let mut counter = 1;
            while !used.insert(name.clone()) {
                name = format!("{stem}-{counter}.{ext}");
                counter += 1;
            }

            ConversionTask {
                input_path: input.clone(),
                output_path: output_dir.join(name),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_uses_stem_and_target_extension() {
        let tasks = plan_tasks(
            &[PathBuf::from("/in/photo.HEIC")],
            Path::new("/out"),
            TargetFormat::Png,
        );
        assert_eq!(tasks[0].output_path, PathBuf::from("/out/photo.png"));
    }

    #[test]
    fn colliding_stems_are_disambiguated_in_input_order() {
        let inputs = vec![
            PathBuf::from("/a/img.png"),
            PathBuf::from("/b/img.bmp"),
            PathBuf::from("/c/img.tif"),
        ];
        let tasks = plan_tasks(&inputs, Path::new("/out"), TargetFormat::Jpeg);
        assert_eq!(tasks[0].output_path, PathBuf::from("/out/img.jpg"));
        assert_eq!(tasks[1].output_path, PathBuf::from("/out/img-1.jpg"));
        assert_eq!(tasks[2].output_path, PathBuf::from("/out/img-2.jpg"));
    }

    #[test]
    fn one_task_per_input() {
        let inputs: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("f{i}.png"))).collect();
        let tasks = plan_tasks(&inputs, Path::new("out"), TargetFormat::Webp);
        assert_eq!(tasks.len(), 5);
        assert!(tasks.iter().zip(&inputs).all(|(t, i)| &t.input_path == i));
    }
}
