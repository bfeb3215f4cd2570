use serde::{Deserialize, Serialize};

use crate::hue::HueScale;

/// One cluster center in the normalized feature space.
///
/// `hue_deg` is on the full circle `[0, 360)`; `chroma` and `saturation` are
/// in the normalized `[-1, 1]` range and present only when the matching plane
/// took part in clustering.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterCenter {
    pub hue_deg: f32,
    #[serde(default)]
    pub chroma: Option<f32>,
    #[serde(default)]
    pub saturation: Option<f32>,
}

impl ClusterCenter {
    pub fn hue(hue_deg: f32) -> Self {
        Self {
            hue_deg,
            chroma: None,
            saturation: None,
        }
    }
}

/// Prior appearance of each class, indexed fruit, stem, background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassPriors {
    /// Reference hues in degrees. Also used for label resolution.
    pub hue_deg: [f32; 3],
    /// Normalized chroma (a*) priors.
    pub chroma: [f32; 3],
    /// Normalized saturation priors.
    pub saturation: [f32; 3],
}

impl Default for ClassPriors {
    fn default() -> Self {
        Self {
            hue_deg: [0.0, 90.0, 240.0],
            chroma: [1.0, 0.5, 0.0],
            saturation: [0.5, 0.5, -0.5],
        }
    }
}

impl ClassPriors {
    /// Seed centers built from the priors, restricted to the available planes.
    pub fn centers(&self, with_chroma: bool, with_saturation: bool) -> [ClusterCenter; 3] {
        std::array::from_fn(|i| ClusterCenter {
            hue_deg: self.hue_deg[i],
            chroma: with_chroma.then_some(self.chroma[i]),
            saturation: with_saturation.then_some(self.saturation[i]),
        })
    }
}

/// How the three clusters are initialized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSeeding {
    /// Seed with [`ClassPriors`] and refine once.
    #[default]
    Priors,
    /// Seed with previously computed centers and refine once.
    Centers(Vec<ClusterCenter>),
    /// k-means++ initialization with random restarts.
    Unsupervised,
}

/// Parameters of the clustering strategy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringParams {
    pub priors: ClassPriors,
    pub seeding: ClusterSeeding,
    /// Radius of the hue circle in feature space; balances hue against the
    /// auxiliary channels.
    pub hue_radius: f32,
    /// Cluster on every `subsample`-th pixel in both directions.
    pub subsample: usize,
    /// Random restarts for unsupervised clustering.
    pub attempts: usize,
    /// Maximum Lloyd iterations per attempt.
    pub max_iters: usize,
    /// Stop when no center moves farther than this.
    pub epsilon: f32,
    /// RNG seed for unsupervised clustering.
    pub seed: u64,
    /// Stem and background hues closer than this (degrees) are treated as a
    /// single class; the stem is then reported as not visible.
    pub min_stem_separation_deg: f32,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            priors: ClassPriors::default(),
            seeding: ClusterSeeding::Priors,
            hue_radius: 1.0,
            subsample: 1,
            attempts: 3,
            max_iters: 10,
            epsilon: 0.0175, // sin(1°)
            seed: 0,
            min_stem_separation_deg: 10.0,
        }
    }
}

/// Inclusive hue interval in degrees; wraps through 0° when `start > end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HueBand {
    pub start_deg: f32,
    pub end_deg: f32,
}

impl HueBand {
    pub fn new(start_deg: f32, end_deg: f32) -> Self {
        Self { start_deg, end_deg }
    }

    pub fn contains(&self, hue_deg: f32) -> bool {
        if self.start_deg <= self.end_deg {
            (self.start_deg..=self.end_deg).contains(&hue_deg)
        } else {
            hue_deg >= self.start_deg || hue_deg <= self.end_deg
        }
    }
}

/// Fixed-threshold strategy: saturation gate plus a red and a green hue band.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Pixels below this saturation (same units as the plane) are background.
    pub min_saturation: f32,
    pub fruit_band: HueBand,
    pub stem_band: HueBand,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            min_saturation: 50.0,
            fruit_band: HueBand::new(320.0, 40.0),
            stem_band: HueBand::new(40.0, 140.0),
        }
    }
}

/// Pixel classification strategy, fixed at configuration time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStrategy {
    Clustering(ClusteringParams),
    Threshold(ThresholdParams),
}

impl Default for SegmentationStrategy {
    fn default() -> Self {
        SegmentationStrategy::Clustering(ClusteringParams::default())
    }
}

/// Configuration of [`crate::HueColorSegmenter`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterParams {
    pub hue_scale: HueScale,
    pub strategy: SegmentationStrategy,
}
