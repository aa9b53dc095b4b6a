// Command-line entry point. The library (lib.rs) is the public API; this
// binary stands in for a file-picking UI: it collects inputs, drives one
// batch run with a progress bar, and prints the summary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use image_converter::utils::fs::display_name;
use image_converter::{
    BatchConverter, BatchStatus, CancelToken, ConversionSettings, CropRect, SettingsStore,
    TargetFormat, is_supported,
};

#[derive(Parser, Debug)]
#[command(name = "image-converter", version, about = "Batch image format conversion tool")]
struct Cli {
    /// Image files or directories to convert (directories are scanned
    /// non-recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory; defaults to the last used directory, then `.`
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Target format: jpeg, png, webp, bmp or tiff
    #[arg(short, long, value_parser = parse_format)]
    format: Option<TargetFormat>,

    /// Quality for lossy formats (1-100, out-of-range values are clamped)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Maximum output width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Resize to exactly max-width x max-height instead of fitting within
    #[arg(long, requires = "max_width", requires = "max_height")]
    stretch: bool,

    /// Crop rectangle applied before resizing, in source pixels
    #[arg(long, value_parser = parse_crop, value_name = "X,Y,W,H")]
    crop: Option<CropRect>,

    /// Maximum number of conversions in flight (default: 2 x CPU cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the batch report as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

fn parse_format(s: &str) -> Result<TargetFormat, String> {
    s.parse().map_err(|e: image_converter::ConverterError| e.to_string())
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, width, height] = parts.as_slice() else {
        return Err("expected four comma-separated values: X,Y,W,H".to_string());
    };
    let parse = |v: &str| v.parse::<u32>().map_err(|e| format!("invalid number '{v}': {e}"));
    Ok(CropRect {
        x: parse(x)?,
        y: parse(y)?,
        width: parse(width)?,
        height: parse(height)?,
    })
}

/// Expands directories (one level, like a folder picker) and filters
/// everything through the supported-extension check.
fn collect_inputs(args: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut entries: Vec<PathBuf> = match std::fs::read_dir(arg) {
                Ok(entries) => entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_file() && is_supported(p))
                    .collect(),
                Err(e) => {
                    warn!("Skipping directory {}: {e}", arg.display());
                    continue;
                }
            };
            entries.sort();
            inputs.extend(entries);
        } else if is_supported(arg) {
            inputs.push(arg.clone());
        } else {
            warn!("Skipping unsupported file: {}", arg.display());
        }
    }
    inputs
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_thread_ids(false)   // Remove thread IDs
        .with_thread_names(false) // Remove thread names
        .with_target(false)       // Remove module path
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .compact();
    subscriber.init();

    let cli = Cli::parse();

    let store = SettingsStore::at_default_location();
    let mut persisted = store.load();

    let settings = ConversionSettings {
        format: cli.format.unwrap_or(persisted.default_output_format),
        quality: cli.quality.unwrap_or(persisted.default_quality),
        max_width: cli.max_width,
        max_height: cli.max_height,
        maintain_aspect: if cli.stretch {
            false
        } else {
            persisted.maintain_aspect_ratio
        },
        crop: cli.crop,
    };

    let inputs = collect_inputs(&cli.inputs);
    if inputs.is_empty() {
        anyhow::bail!("No supported image files among the inputs");
    }

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| persisted.last_output_directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let token = CancelToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, letting in-flight conversions finish");
            signal_token.cancel();
        }
    });

    let bar = ProgressBar::new(inputs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );

    let progress_bar = bar.clone();
    let converter = match cli.jobs {
        Some(jobs) => BatchConverter::with_max_in_flight(jobs),
        None => BatchConverter::new(),
    };
    let report = converter
        .convert_batch(&inputs, &output_dir, &settings, token, move |update| {
            progress_bar.set_position(update.completed as u64);
            progress_bar.set_message(display_name(&update.current_file));
        })
        .await?;
    bar.finish_and_clear();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in report.outcomes.iter().filter(|o| !o.success()) {
            eprintln!(
                "FAILED {}: {}",
                outcome.input_path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        match report.status {
            BatchStatus::Cancelled => println!(
                "Conversion cancelled: {} of {} completed",
                report.outcomes.len(),
                report.total
            ),
            BatchStatus::Completed => println!(
                "Converted {} of {} images in {:.1}s -> {}",
                report.success_count(),
                report.total,
                report.elapsed_ms as f64 / 1000.0,
                output_dir.display()
            ),
        }
    }

    persisted.last_output_directory = Some(output_dir);
    store.save(&persisted);

    info!("Done");
    Ok(())
}
