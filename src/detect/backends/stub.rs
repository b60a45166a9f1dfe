use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::backend::{DetectionCapability, DetectorBackend, SegmenterBackend};
use crate::detect::result::{Detection, Instance, ObjectClass};
use crate::geometry::BoundingBox;

/// Stub detector for testing. Returns a fixed set of detections.
pub struct StubBackend {
    name: &'static str,
    capabilities: Vec<DetectionCapability>,
    detections: Vec<Detection>,
    failure: Option<String>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::named("stub")
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            capabilities: vec![
                DetectionCapability::PersonDetection,
                DetectionCapability::TreeDetection,
            ],
            detections: Vec::new(),
            failure: None,
        }
    }

    /// Restrict the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: &[DetectionCapability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn with_detection(mut self, detection: Detection) -> Self {
        self.detections.push(detection);
        self
    }

    pub fn with_person(self, bbox: BoundingBox, confidence: f32) -> Self {
        self.with_detection(Detection::new(bbox, confidence, ObjectClass::Person))
    }

    pub fn with_tree(self, bbox: BoundingBox, confidence: f32) -> Self {
        self.with_detection(Detection::new(bbox, confidence, ObjectClass::Tree))
    }

    /// Every `detect` call fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        self.name
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
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }
        Ok(self
            .detections
            .iter()
            .filter(|d| d.class == class && d.confidence >= min_confidence)
            .cloned()
            .collect())
    }
}

/// Stub segmenter for testing. Returns fixed instances and counts calls.
pub struct StubSegmenter {
    instances: Vec<Instance>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
    warm_ups: Arc<AtomicUsize>,
}

impl StubSegmenter {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
            warm_ups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instances.push(instance);
        self
    }

    /// Every `segment` and `warm_up` call fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Shared counter of `segment` invocations; stays valid after the stub is
    /// moved into a registry.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn warm_up_counter(&self) -> Arc<AtomicUsize> {
        self.warm_ups.clone()
    }
}

impl Default for StubSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmenterBackend for StubSegmenter {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn segment(&mut self, _crop: &RgbImage) -> Result<Vec<Instance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }
        Ok(self.instances.clone())
    }

    fn warm_up(&mut self) -> Result<()> {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_filters_by_class_and_confidence() {
        let mut backend = StubBackend::new()
            .with_person(BoundingBox::new(0, 0, 10, 40), 0.8)
            .with_tree(BoundingBox::new(10, 0, 60, 90), 0.05)
            .with_tree(BoundingBox::new(20, 0, 70, 95), 0.6);
        let img = RgbImage::new(100, 100);

        let people = backend.detect(&img, ObjectClass::Person, 0.1).unwrap();
        assert_eq!(people.len(), 1);

        let trees = backend.detect(&img, ObjectClass::Tree, 0.1).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].bbox, BoundingBox::new(20, 0, 70, 95));
    }

    #[test]
    fn stub_segmenter_counts_calls() {
        let mut segmenter = StubSegmenter::new();
        let counter = segmenter.call_counter();
        segmenter.segment(&RgbImage::new(32, 32)).unwrap();
        segmenter.segment(&RgbImage::new(32, 32)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let mut failing = StubSegmenter::new().failing("cuda out of memory");
        let err = failing.segment(&RgbImage::new(32, 32)).unwrap_err();
        assert_eq!(err.to_string(), "cuda out of memory");
    }
}
