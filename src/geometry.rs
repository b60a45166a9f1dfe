//! Pixel-space geometry shared by the measurement engine.
//!
//! Boxes arrive from detectors or from caller overrides and may lie partly (or
//! entirely) outside the image. Every box is passed through [`clamp_box`]
//! before it is used to cut a crop.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest crop side the trunk segmenter can resolve (backbone stride).
pub const MIN_CROP_SIDE_PX: u32 = 32;

/// Axis-aligned box in image pixel coordinates, `(x1, y1)` inclusive and
/// `(x2, y2)` exclusive.
///
/// Serializes as a `[x1, y1, x2, y2]` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal extent. Computed in `i64` so no `i32` corners can overflow it.
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    /// True when both extents are strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn to_array(self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Parses `x1,y1,x2,y2`, optionally wrapped in brackets (`[x1, y1, x2, y2]`).
impl FromStr for BoundingBox {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);
        let values = inner
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i32>()
                    .map_err(|_| anyhow!("invalid box coordinate '{}'", part.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if values.len() != 4 {
            return Err(anyhow!(
                "box must have 4 coordinates (x1,y1,x2,y2), got {}",
                values.len()
            ));
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// Vertical pixel extent, `y2 - y1`. May be zero or negative for malformed boxes.
pub fn pixel_height(b: &BoundingBox) -> i64 {
    b.height()
}

/// Horizontal pixel extent, `x2 - x1`.
pub fn pixel_width(b: &BoundingBox) -> i64 {
    b.width()
}

/// Clamp a box into a `width x height` image.
///
/// `x1`/`y1` land in `[0, dim - 1]`, `x2`/`y2` in `[x1 + 1, dim]`, so the result
/// always has positive extent and lies fully inside the image. Idempotent.
pub fn clamp_box(b: &BoundingBox, width: u32, height: u32) -> BoundingBox {
    let w = i32::try_from(width).unwrap_or(i32::MAX);
    let h = i32::try_from(height).unwrap_or(i32::MAX);

    let x1 = b.x1.clamp(0, (w - 1).max(0));
    let y1 = b.y1.clamp(0, (h - 1).max(0));
    let x2 = b.x2.min(w).max(x1 + 1);
    let y2 = b.y2.min(h).max(y1 + 1);

    BoundingBox::new(x1, y1, x2, y2)
}

/// True when a (clamped) box is large enough to be handed to the segmenter.
pub fn fits_segmenter(b: &BoundingBox, min_side: u32) -> bool {
    let min_side = i64::from(min_side);
    b.width() >= min_side && b.height() >= min_side
}
