//! `truss-vision` CLI: segment a truss image, crop it and detect the fruit.
//!
//! Grasp selection needs a skeletonizer, which is not part of this binary.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use truss_vision::detect::{color_planes, mask_to_image};
use truss_vision::io::{TimingsMs, TrussDetectConfig, TrussDetectReport};
use truss_vision::segment::Segmentation;
use truss_vision::{NoFilter, TrussDetector, TrussError};

#[cfg(not(feature = "tracing"))]
use log::{info, warn, LevelFilter};
#[cfg(not(feature = "tracing"))]
use truss_vision::core::init_with_level;

#[cfg(feature = "tracing")]
use tracing::{info, warn};
#[cfg(feature = "tracing")]
use truss_vision::core::init_tracing;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "truss-vision")]
#[command(about = "Detect a tomato truss and its fruit in an RGB image")]
#[command(version)]
struct Cli {
    /// Path to the JSON config.
    #[arg(long)]
    config: PathBuf,

    /// Override the report path from the config.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs (tracing builds only).
    #[arg(long)]
    json_logs: bool,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    {
        let level = cli.log_level.parse().unwrap_or(LevelFilter::Info);
        init_with_level(level)?;
        if cli.json_logs {
            warn!("--json-logs needs a build with the `tracing` feature");
        }
    }
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        init_tracing(cli.json_logs);
    }

    run(&cli)
}

fn run(cli: &Cli) -> CliResult<()> {
    let cfg = TrussDetectConfig::load_json(&cli.config)?;
    let t_total = Instant::now();

    let t_img = Instant::now();
    let img = image::open(&cfg.image_path)
        .map_err(|e| -> CliError { format!("failed to open image {}: {e}", cfg.image_path).into() })?
        .to_rgb8();
    let load_image = t_img.elapsed().as_millis() as u64;
    info!("loaded {} ({}x{})", cfg.image_path, img.width(), img.height());

    let mut report = TrussDetectReport::new(
        &cfg,
        &cli.config,
        [img.width() as usize, img.height() as usize],
    );
    let mut timings = TimingsMs {
        load_image,
        ..TimingsMs::default()
    };

    let detector = TrussDetector::new(cfg.build_settings());
    if let Err(err) = detect_fruit(&detector, &cfg, &img, &mut report, &mut timings) {
        warn!("truss detection failed: {err}");
        report.set_error(err);
    }
    timings.total = t_total.elapsed().as_millis() as u64;
    report.timings = Some(timings);

    let out = cli.out.clone().unwrap_or_else(|| cfg.output_path());
    report.write_json(&out)?;
    info!("report written to {}", out.display());
    Ok(())
}

fn detect_fruit(
    detector: &TrussDetector,
    cfg: &TrussDetectConfig,
    img: &image::RgbImage,
    report: &mut TrussDetectReport,
    timings: &mut TimingsMs,
) -> Result<(), TrussError> {
    let t_seg = Instant::now();
    let planes = color_planes(img)?;
    let seg = detector.segment(&planes)?;
    timings.segment = t_seg.elapsed().as_millis() as u64;
    report.set_segmentation(&seg);
    if let Some(dir) = cfg.mask_dir.as_deref() {
        if let Err(err) = save_masks(Path::new(dir), &seg) {
            warn!("failed to save masks to {dir}: {err}");
        }
    }

    let t_crop = Instant::now();
    let masks = detector.filter_masks(&seg, &NoFilter, false)?;
    let cropped = detector.crop(&masks)?;
    timings.crop = t_crop.elapsed().as_millis() as u64;
    report.set_crop(&cropped);

    let t_tom = Instant::now();
    let fruit = detector.detect_tomatoes(&cropped, cfg.pixel_scale(), None);
    timings.detect_tomatoes = t_tom.elapsed().as_millis() as u64;
    let found = fruit.detection.centroid.is_some();
    info!("fruit circles: {}", fruit.detection.circles.len());
    report.set_fruit(fruit);
    if !found {
        return Err(TrussError::NoViableCircles);
    }
    Ok(())
}

fn save_masks(dir: &Path, seg: &Segmentation) -> CliResult<()> {
    std::fs::create_dir_all(dir)?;
    for (name, mask) in [
        ("fruit", &seg.fruit),
        ("stem", &seg.stem),
        ("background", &seg.background),
    ] {
        mask_to_image(mask).save(dir.join(format!("{name}.png")))?;
    }
    Ok(())
}
