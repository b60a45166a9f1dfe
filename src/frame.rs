//! Decoded image frames and crops.
//!
//! - `ImageFrame`: the decoded RGB image for one analysis call.
//! - `Crop`: an owned, contiguous sub-image cut from a clamped box.
//!
//! Decoding is the only step of an analysis that can fail outright; everything
//! downstream degrades to warnings instead.

use anyhow::{anyhow, Context, Result};
use image::{GenericImageView, RgbImage};

use crate::geometry::{clamp_box, BoundingBox};

/// Decoded image for a single analysis call. Dropped when the call returns.
pub struct ImageFrame {
    image: RgbImage,
}

impl ImageFrame {
    /// Decode raw bytes in any format the `image` crate was built with.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("invalid image data: empty buffer"));
        }
        let decoded = image::load_from_memory(bytes).context("invalid image data")?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow!("invalid image data: {}x{} image", width, height));
        }
        Ok(Self {
            image: decoded.into_rgb8(),
        })
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Clamp `bbox` into the frame and copy the covered pixels out.
    pub fn crop(&self, bbox: &BoundingBox) -> Crop {
        let clamped = clamp_box(bbox, self.width(), self.height());
        let image = image::imageops::crop_imm(
            &self.image,
            clamped.x1 as u32,
            clamped.y1 as u32,
            clamped.width() as u32,
            clamped.height() as u32,
        )
        .to_image();
        Crop {
            bbox: clamped,
            image,
        }
    }
}

/// Contiguous copy of a clamped region of an [`ImageFrame`].
pub struct Crop {
    /// Clamped box in frame coordinates.
    pub bbox: BoundingBox,
    pub image: RgbImage,
}
