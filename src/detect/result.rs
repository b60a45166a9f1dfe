use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Object classes the engine asks detectors for.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    /// Reference object of known height.
    Person,
    /// Measurement target.
    Tree,
}

/// A detector output: box in full-image pixel coordinates plus confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: ObjectClass,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class: ObjectClass) -> Self {
        Self {
            bbox,
            confidence,
            class,
        }
    }
}

/// One trunk instance produced by a segmenter. Coordinates are crop-local.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub score: f32,
    pub bbox: BoundingBox,
    /// Absent when the segmenter produced no mask head output.
    pub mask: Option<TrunkMask>,
}

/// Boolean trunk mask aligned to a crop, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrunkMask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl TrunkMask {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| anyhow!("mask dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "mask length {} does not match {}x{}",
                data.len(),
                width,
                height
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-false mask.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Build from equal-length rows.
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(anyhow!(
                "mask row {} has {} columns, expected {}",
                y,
                row.len(),
                width
            ));
        }
        Self::new(width, height, rows.concat())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Mark `[x_start, x_end)` on row `y`; out-of-range parts are ignored.
    pub fn fill_span(&mut self, y: usize, x_start: usize, x_end: usize) {
        for x in x_start..x_end.min(self.width) {
            self.set(x, y, true);
        }
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Index of the leftmost `true` pixel on row `y`.
    pub fn first_true(&self, y: usize) -> Option<usize> {
        if y >= self.height {
            return None;
        }
        self.row(y).iter().position(|&v| v)
    }

    /// Index of the rightmost `true` pixel on row `y`.
    pub fn last_true(&self, y: usize) -> Option<usize> {
        if y >= self.height {
            return None;
        }
        self.row(y).iter().rposition(|&v| v)
    }

    /// Inclusive span width of the `true` pixels on row `y`.
    pub fn row_width(&self, y: usize) -> Option<usize> {
        let left = self.first_true(y)?;
        let right = self.last_true(y)?;
        Some(right - left + 1)
    }

    /// Run-length encode (alternating runs, row-major, starting at `false`).
    pub fn to_rle(&self) -> MaskRle {
        let mut runs = Vec::with_capacity(self.data.len() / 4 + 1);
        let mut current = false;
        let mut run_len = 0usize;
        for &px in &self.data {
            if px == current {
                run_len += 1;
            } else {
                runs.push(run_len);
                current = !current;
                run_len = 1;
            }
        }
        runs.push(run_len);
        MaskRle {
            width: self.width,
            height: self.height,
            start_value: 0,
            runs,
        }
    }
}

/// Interchange form of a [`TrunkMask`]: alternating run lengths, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRle {
    pub width: usize,
    pub height: usize,
    /// Value of the first run (0 or 1).
    #[serde(default)]
    pub start_value: u8,
    pub runs: Vec<usize>,
}

impl MaskRle {
    pub fn decode(&self) -> Result<TrunkMask> {
        if self.start_value > 1 {
            return Err(anyhow!("start_value must be 0 or 1"));
        }
        let expected = self
            .width
            .checked_mul(self.height)
            .ok_or_else(|| anyhow!("mask dimensions overflow"))?;
        let total = self
            .runs
            .iter()
            .try_fold(0usize, |acc, &run| acc.checked_add(run))
            .ok_or_else(|| anyhow!("mask runs overflow"))?;
        if total != expected {
            return Err(anyhow!(
                "mask runs cover {} pixels, expected {}",
                total,
                expected
            ));
        }
        let mut data = Vec::with_capacity(expected);
        let mut value = self.start_value == 1;
        for &run in &self.runs {
            data.extend(std::iter::repeat(value).take(run));
            value = !value;
        }
        TrunkMask::new(self.width, self.height, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_extents_are_inclusive() {
        let mask = TrunkMask::from_rows(&[
            vec![false, true, true, false, true, false],
            vec![false; 6],
        ])
        .unwrap();
        assert_eq!(mask.first_true(0), Some(1));
        assert_eq!(mask.last_true(0), Some(4));
        assert_eq!(mask.row_width(0), Some(4));
        assert_eq!(mask.row_width(1), None);
        assert_eq!(mask.row_width(7), None);
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(TrunkMask::from_rows(&[vec![true, false], vec![true]]).is_err());
        assert!(TrunkMask::new(3, 3, vec![true; 8]).is_err());
    }

    #[test]
    fn rle_decodes_leading_true_run() {
        let mut mask = TrunkMask::empty(4, 2);
        mask.fill_span(0, 0, 2);
        mask.fill_span(1, 3, 4);
        let rle = mask.to_rle();
        assert_eq!(rle.runs, vec![0, 2, 5, 1]);
        assert_eq!(rle.decode().unwrap(), mask);
    }

    #[test]
    fn rle_rejects_wrong_pixel_count() {
        let rle = MaskRle {
            width: 3,
            height: 3,
            start_value: 0,
            runs: vec![4, 4],
        };
        assert!(rle.decode().is_err());
    }

    #[test]
    fn rle_rejects_overflowing_runs() {
        let rle = MaskRle {
            width: 2,
            height: 2,
            start_value: 0,
            runs: vec![usize::MAX, 1],
        };
        let err = rle.decode().unwrap_err();
        assert_eq!(err.to_string(), "mask runs overflow");
    }
}
