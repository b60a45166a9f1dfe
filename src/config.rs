use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::geometry::MIN_CROP_SIDE_PX;
use crate::measure::{
    TrunkParams, BREAST_HEIGHT_CM, DEFAULT_REFERENCE_HEIGHT_CM, SLICE_HALF_HEIGHT,
};

const DEFAULT_PERSON_MIN_CONFIDENCE: f32 = 0.25;
const DEFAULT_TREE_MIN_CONFIDENCE: f32 = 0.1;

#[derive(Debug, Deserialize, Default)]
struct AnalyzerConfigFile {
    reference: Option<ReferenceConfigFile>,
    detection: Option<DetectionConfigFile>,
    trunk: Option<TrunkConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ReferenceConfigFile {
    height_cm: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    person_min_confidence: Option<f32>,
    tree_min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct TrunkConfigFile {
    min_crop_side_px: Option<u32>,
    slice_half_height: Option<usize>,
    breast_height_cm: Option<f64>,
}

/// Tunables for [`TreeAnalyzer`](crate::TreeAnalyzer).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Reference height used when a request does not carry one.
    pub reference_height_cm: f64,
    /// Minimum confidence passed to the person detector.
    pub person_min_confidence: f32,
    /// Minimum confidence passed to the tree detector.
    pub tree_min_confidence: f32,
    pub trunk: TrunkParams,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            reference_height_cm: DEFAULT_REFERENCE_HEIGHT_CM,
            person_min_confidence: DEFAULT_PERSON_MIN_CONFIDENCE,
            tree_min_confidence: DEFAULT_TREE_MIN_CONFIDENCE,
            trunk: TrunkParams::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load defaults, then the file named by `DENDRO_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DENDRO_CONFIG").ok();
        Self::load_with_path(config_path.as_deref().map(Path::new))
    }

    /// Like [`load`](Self::load) with an explicit config file path.
    pub fn load_with_path(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnalyzerConfigFile) -> Self {
        let reference_height_cm = file
            .reference
            .and_then(|reference| reference.height_cm)
            .unwrap_or(DEFAULT_REFERENCE_HEIGHT_CM);
        let person_min_confidence = file
            .detection
            .as_ref()
            .and_then(|detection| detection.person_min_confidence)
            .unwrap_or(DEFAULT_PERSON_MIN_CONFIDENCE);
        let tree_min_confidence = file
            .detection
            .and_then(|detection| detection.tree_min_confidence)
            .unwrap_or(DEFAULT_TREE_MIN_CONFIDENCE);
        let trunk = TrunkParams {
            min_crop_side: file
                .trunk
                .as_ref()
                .and_then(|trunk| trunk.min_crop_side_px)
                .unwrap_or(MIN_CROP_SIDE_PX),
            slice_half_height: file
                .trunk
                .as_ref()
                .and_then(|trunk| trunk.slice_half_height)
                .unwrap_or(SLICE_HALF_HEIGHT),
            breast_height_cm: file
                .trunk
                .and_then(|trunk| trunk.breast_height_cm)
                .unwrap_or(BREAST_HEIGHT_CM),
        };
        Self {
            reference_height_cm,
            person_min_confidence,
            tree_min_confidence,
            trunk,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(height) = std::env::var("DENDRO_REFERENCE_HEIGHT_CM") {
            if !height.trim().is_empty() {
                self.reference_height_cm = height.trim().parse().map_err(|_| {
                    anyhow!("DENDRO_REFERENCE_HEIGHT_CM must be a number of centimeters")
                })?;
            }
        }
        if let Ok(confidence) = std::env::var("DENDRO_TREE_MIN_CONFIDENCE") {
            if !confidence.trim().is_empty() {
                self.tree_min_confidence = confidence
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("DENDRO_TREE_MIN_CONFIDENCE must be a number"))?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_reference_height(self.reference_height_cm)?;
        validate_confidence("person_min_confidence", self.person_min_confidence)?;
        validate_confidence("tree_min_confidence", self.tree_min_confidence)?;
        if self.trunk.min_crop_side == 0 {
            return Err(anyhow!("min_crop_side_px must be greater than zero"));
        }
        if !(self.trunk.breast_height_cm.is_finite() && self.trunk.breast_height_cm > 0.0) {
            return Err(anyhow!("breast_height_cm must be a positive number"));
        }
        Ok(())
    }
}

/// Reference heights must be positive and finite.
pub fn validate_reference_height(height_cm: f64) -> Result<()> {
    if !(height_cm.is_finite() && height_cm > 0.0) {
        return Err(anyhow!(
            "reference height must be a positive number of centimeters, got {}",
            height_cm
        ));
    }
    Ok(())
}

fn validate_confidence(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<AnalyzerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
