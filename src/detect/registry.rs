use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::result::{Detection, Instance, ObjectClass};

use super::backend::{DetectionCapability, DetectorBackend, SegmenterBackend};

/// Thread-safe registry of detector and segmenter backends.
///
/// This is the composition root for model collaborators: backends are loaded
/// once, registered here, and shared by every analysis call. Backends are
/// wrapped in `Mutex` because `detect`/`segment` take `&mut self`.
pub struct BackendRegistry {
    detectors: BTreeMap<String, Arc<Mutex<dyn DetectorBackend>>>,
    default_name: Option<String>,
    segmenter: Option<Arc<Mutex<dyn SegmenterBackend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            detectors: BTreeMap::new(),
            default_name: None,
            segmenter: None,
        }
    }

    /// Register a detector. The first registered detector becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.detectors.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Install the trunk segmenter, replacing any previous one.
    pub fn register_segmenter<S: SegmenterBackend + 'static>(&mut self, segmenter: S) {
        self.segmenter = Some(Arc::new(Mutex::new(segmenter)));
    }

    pub fn has_segmenter(&self) -> bool {
        self.segmenter.is_some()
    }

    /// True when some registered detector supports the capability.
    pub fn has_capability(&self, capability: DetectionCapability) -> bool {
        self.backend_for_capability(capability).is_ok()
    }

    /// Select a detector that supports the requested capability.
    ///
    /// Prefers the first registered detector when it supports the capability.
    pub fn backend_for_capability(
        &self,
        capability: DetectionCapability,
    ) -> Result<Arc<Mutex<dyn DetectorBackend>>> {
        let default_backend = self
            .default_name
            .as_ref()
            .and_then(|name| self.detectors.get(name));
        if let Some(default_backend) = default_backend {
            let supports = {
                let guard = default_backend
                    .lock()
                    .map_err(|_| anyhow!("default backend lock poisoned"))?;
                guard.supports(capability)
            };
            if supports {
                return Ok(default_backend.clone());
            }
        }

        for backend in self.detectors.values() {
            let supports = {
                let guard = backend
                    .lock()
                    .map_err(|_| anyhow!("backend lock poisoned"))?;
                guard.supports(capability)
            };
            if supports {
                return Ok(backend.clone());
            }
        }

        Err(anyhow!(
            "no registered backend supports capability {:?}",
            capability
        ))
    }

    /// Run detection for `class` on a backend that supports it.
    pub fn detect_class(
        &self,
        image: &RgbImage,
        class: ObjectClass,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        let backend = self.backend_for_capability(DetectionCapability::for_class(class))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.detect(image, class, min_confidence)
    }

    /// Run the trunk segmenter on a crop.
    pub fn segment(&self, crop: &RgbImage) -> Result<Vec<Instance>> {
        let segmenter = self
            .segmenter
            .as_ref()
            .ok_or_else(|| anyhow!("no trunk segmenter registered"))?;
        let mut guard = segmenter
            .lock()
            .map_err(|_| anyhow!("segmenter lock poisoned"))?;
        guard.segment(crop)
    }

    /// Warm up every registered backend.
    pub fn warm_up(&self) -> Result<()> {
        for (name, backend) in &self.detectors {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend '{}' lock poisoned", name))?;
            guard.warm_up()?;
        }
        if let Some(segmenter) = &self.segmenter {
            let mut guard = segmenter
                .lock()
                .map_err(|_| anyhow!("segmenter lock poisoned"))?;
            guard.warm_up()?;
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
