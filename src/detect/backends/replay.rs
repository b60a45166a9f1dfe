//! Replay of pre-computed model outputs.
//!
//! Detection and segmentation models run outside this crate. A replay file
//! carries their outputs for one image so the engine can be driven from the
//! command line:
//!
//! ```json
//! {
//!   "person": [{ "box": [10, 100, 60, 400], "confidence": 0.91 }],
//!   "tree":   [{ "box": [200, 50, 260, 400], "confidence": 0.67 }],
//!   "trunk":  [{ "score": 0.98, "box": [12, 0, 40, 350],
//!                "mask": { "width": 60, "height": 350, "runs": [12, 28, 32] } }]
//! }
//! ```
//!
//! A missing section means the corresponding model is not available; an
//! empty array means the model ran and found nothing.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use serde::Deserialize;

use crate::detect::backend::{DetectionCapability, DetectorBackend, SegmenterBackend};
use crate::detect::registry::BackendRegistry;
use crate::detect::result::{Detection, Instance, MaskRle, ObjectClass};
use crate::geometry::BoundingBox;

#[derive(Debug, Deserialize, Default)]
pub struct ReplayFile {
    person: Option<Vec<ReplayDetection>>,
    tree: Option<Vec<ReplayDetection>>,
    trunk: Option<Vec<ReplayInstance>>,
}

#[derive(Debug, Deserialize)]
struct ReplayDetection {
    #[serde(rename = "box")]
    bbox: BoundingBox,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct ReplayInstance {
    score: f32,
    #[serde(rename = "box")]
    bbox: BoundingBox,
    mask: Option<MaskRle>,
}

impl ReplayFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read replay file {}: {}", path.display(), e))?;
        Self::parse(&raw).with_context(|| format!("invalid replay file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Register the replayed detector (when any detection section exists) and
    /// segmenter (when a `trunk` section exists).
    pub fn register_into(self, registry: &mut BackendRegistry) -> Result<()> {
        let mut capabilities = Vec::new();
        let mut detections = Vec::new();
        if let Some(people) = self.person {
            capabilities.push(DetectionCapability::PersonDetection);
            detections.extend(
                people
                    .into_iter()
                    .map(|d| Detection::new(d.bbox, d.confidence, ObjectClass::Person)),
            );
        }
        if let Some(trees) = self.tree {
            capabilities.push(DetectionCapability::TreeDetection);
            detections.extend(
                trees
                    .into_iter()
                    .map(|d| Detection::new(d.bbox, d.confidence, ObjectClass::Tree)),
            );
        }
        if !capabilities.is_empty() {
            registry.register(ReplayBackend {
                capabilities,
                detections,
            });
        }

        if let Some(trunk) = self.trunk {
            let instances = trunk
                .into_iter()
                .enumerate()
                .map(|(idx, inst)| {
                    let mask = inst
                        .mask
                        .map(|rle| rle.decode())
                        .transpose()
                        .with_context(|| format!("trunk instance {} has an invalid mask", idx))?;
                    Ok(Instance {
                        score: inst.score,
                        bbox: inst.bbox,
                        mask,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            registry.register_segmenter(ReplaySegmenter::new(instances));
        }
        Ok(())
    }
}

/// Detector that returns detections recorded in a replay file.
pub struct ReplayBackend {
    capabilities: Vec<DetectionCapability>,
    detections: Vec<Detection>,
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn detect(
        &mut self,
        _image: &RgbImage,
        class: ObjectClass,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        Ok(self
            .detections
            .iter()
            .filter(|d| d.class == class && d.confidence >= min_confidence)
            .cloned()
            .collect())
    }
}

/// Segmenter that returns instances recorded in a replay file.
pub struct ReplaySegmenter {
    instances: Vec<Instance>,
}

impl ReplaySegmenter {
    /// Instances are re-sorted by descending score to honor the segmenter contract.
    pub fn new(mut instances: Vec<Instance>) -> Self {
        instances.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { instances }
    }
}

impl SegmenterBackend for ReplaySegmenter {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn segment(&mut self, crop: &RgbImage) -> Result<Vec<Instance>> {
        let (width, height) = (crop.width() as usize, crop.height() as usize);
        for inst in &self.instances {
            if let Some(mask) = &inst.mask {
                if mask.width() != width || mask.height() != height {
                    return Err(anyhow!(
                        "replayed mask is {}x{} but crop is {}x{}",
                        mask.width(),
                        mask.height(),
                        width,
                        height
                    ));
                }
            }
        }
        Ok(self.instances.clone())
    }
}
