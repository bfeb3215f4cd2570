//! JSON configuration and report helpers for truss detection.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use truss_vision_core::{CropBox, CroppedMasks, FrameTransform};
use truss_vision_grasp::{GraspParams, GraspResult};
use truss_vision_segment::{Segmentation, SegmentationSummary, SegmenterParams};
use truss_vision_tomato::{PixelScale, TomatoDetectorParams, TomatoSize};

use crate::error::TrussError;
use crate::pipeline::{FruitReport, TrussDetection, TrussSettings};

#[derive(thiserror::Error, Debug)]
pub enum TrussIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration of a single-image truss detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrussDetectConfig {
    pub image_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    /// Directory for fruit/stem/background mask images.
    #[serde(default)]
    pub mask_dir: Option<String>,
    /// Image scale; enables physical fruit radius bounds.
    #[serde(default)]
    pub px_per_mm: Option<f32>,
    #[serde(default)]
    pub tomato_size: TomatoSize,
    #[serde(default)]
    pub segment: Option<SegmenterParams>,
    #[serde(default)]
    pub tomato: Option<TomatoDetectorParams>,
    #[serde(default)]
    pub grasp: Option<GraspParams>,
}

impl TrussDetectConfig {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            output_path: None,
            mask_dir: None,
            px_per_mm: None,
            tomato_size: TomatoSize::default(),
            segment: None,
            tomato: None,
            grasp: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TrussIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TrussIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("truss_detect_report.json"))
    }

    pub fn pixel_scale(&self) -> Option<PixelScale> {
        self.px_per_mm
            .filter(|s| *s > 0.0)
            .map(|px_per_mm| PixelScale {
                px_per_mm,
                size: self.tomato_size,
            })
    }

    /// Default settings with the overrides from this config applied.
    pub fn build_settings(&self) -> TrussSettings {
        let mut settings = TrussSettings::default();
        if let Some(segment) = self.segment.clone() {
            settings.segment = segment;
        }
        if let Some(tomato) = self.tomato.clone() {
            settings.tomato = tomato;
        }
        if let Some(grasp) = self.grasp.clone() {
            settings.grasp = grasp;
        }
        settings
    }
}

/// Stage timings in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingsMs {
    pub load_image: u64,
    pub segment: u64,
    pub crop: u64,
    pub detect_tomatoes: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrussDetectReport {
    pub image_path: String,
    pub config_path: String,
    pub image_size: [usize; 2],
    #[serde(default)]
    pub segmentation: Option<SegmentationSummary>,
    #[serde(default)]
    pub transform: Option<FrameTransform>,
    #[serde(default)]
    pub bbox: Option<CropBox>,
    #[serde(default)]
    pub fruit: Option<FruitReport>,
    #[serde(default)]
    pub grasp: Option<GraspResult>,
    #[serde(default)]
    pub timings: Option<TimingsMs>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TrussDetectReport {
    /// Build an empty report for one input image.
    pub fn new(cfg: &TrussDetectConfig, config_path: &Path, image_size: [usize; 2]) -> Self {
        Self {
            image_path: cfg.image_path.clone(),
            config_path: config_path.to_string_lossy().into_owned(),
            image_size,
            segmentation: None,
            transform: None,
            bbox: None,
            fruit: None,
            grasp: None,
            timings: None,
            error: None,
        }
    }

    pub fn set_segmentation(&mut self, seg: &Segmentation) {
        self.segmentation = Some(SegmentationSummary::from(seg));
    }

    pub fn set_crop(&mut self, cropped: &CroppedMasks) {
        self.transform = Some(cropped.transform);
        self.bbox = Some(cropped.bbox);
    }

    pub fn set_fruit(&mut self, fruit: FruitReport) {
        self.fruit = Some(fruit);
    }

    /// Populate report fields from a full detection.
    pub fn set_detection(&mut self, res: TrussDetection) {
        self.segmentation = Some(res.segmentation);
        self.transform = Some(res.transform);
        self.bbox = Some(res.bbox);
        self.fruit = Some(res.fruit);
        self.grasp = Some(res.grasp);
        self.error = None;
    }

    /// Record a pipeline error.
    pub fn set_error(&mut self, err: TrussError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TrussIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TrussIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use truss_vision_grasp::SelectionPolicy;

    #[test]
    fn config_overrides_apply_on_top_of_defaults() {
        let raw = r#"{
            "image_path": "truss.png",
            "px_per_mm": 3.5,
            "tomato_size": "big",
            "tomato": { "ratio_threshold": 0.7 },
            "grasp": { "policy": "stem_end" }
        }"#;
        let cfg: TrussDetectConfig = serde_json::from_str(raw).unwrap();
        let settings = cfg.build_settings();
        assert_eq!(settings.tomato.ratio_threshold, 0.7);
        assert_eq!(settings.tomato.ratio_max_dist, 4.0);
        assert_eq!(settings.grasp.policy, SelectionPolicy::StemEnd);
        assert_eq!(settings.grasp.node_radius_frac, 0.02);
        let scale = cfg.pixel_scale().unwrap();
        assert_eq!(scale.size, TomatoSize::Big);
        assert_eq!(cfg.output_path(), PathBuf::from("truss_detect_report.json"));
    }

    #[test]
    fn non_positive_scale_is_ignored() {
        let mut cfg = TrussDetectConfig::new("a.png");
        cfg.px_per_mm = Some(0.0);
        assert!(cfg.pixel_scale().is_none());
    }

    #[test]
    fn report_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let cfg = TrussDetectConfig::new("a.png");
        let mut report = TrussDetectReport::new(&cfg, Path::new("cfg.json"), [64, 48]);
        report.set_error(TrussError::NoViableCircles);
        report.write_json(&path).unwrap();

        let back = TrussDetectReport::load_json(&path).unwrap();
        assert_eq!(back.image_size, [64, 48]);
        assert_eq!(back.error.as_deref(), Some("no fruit circle survived filtering"));
        assert!(back.fruit.is_none());
    }
}
