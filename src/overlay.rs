//! Annotated preview of a measurement: person box, tree box, and the
//! breast-height line drawn over the analyzed image.

use image::{Rgba, RgbaImage};

use crate::frame::ImageFrame;
use crate::geometry::{clamp_box, BoundingBox};
use crate::measure::{MeasurementResult, ScaleFrame};

pub const PERSON_COLOR: Rgba<u8> = Rgba([0, 160, 255, 255]);
pub const TREE_COLOR: Rgba<u8> = Rgba([40, 200, 60, 255]);
pub const BREAST_HEIGHT_COLOR: Rgba<u8> = Rgba([255, 40, 40, 255]);

const LINE_THICKNESS: u32 = 2;

/// Draw a rectangle border with given thickness. `bbox_px` is inclusive.
pub fn draw_rect(img: &mut RgbaImage, bbox_px: [u32; 4], color: Rgba<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx1 >= w || yy1 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Draw a horizontal line across `[x0, x1)` at row `y`, clipped to the image.
pub fn draw_hline(
    img: &mut RgbaImage,
    y: i64,
    x0: u32,
    x1: u32,
    color: Rgba<u8>,
    thickness: u32,
) {
    let (w, h) = img.dimensions();
    for t in 0..i64::from(thickness) {
        let row = y.saturating_add(t);
        if row < 0 || row >= i64::from(h) {
            continue;
        }
        for x in x0..x1.min(w) {
            img.put_pixel(x, row as u32, color);
        }
    }
}

/// Box clamped into the image, as inclusive pixel corners.
fn inclusive_px(bbox: &BoundingBox, width: u32, height: u32) -> [u32; 4] {
    let c = clamp_box(bbox, width, height);
    [c.x1 as u32, c.y1 as u32, (c.x2 - 1) as u32, (c.y2 - 1) as u32]
}

/// Render the result's boxes and the breast-height row onto a copy of `frame`.
///
/// The breast-height line spans the tree box and is only drawn when the
/// person box yields a usable scale.
pub fn render_overlay(
    frame: &ImageFrame,
    result: &MeasurementResult,
    reference_height_cm: f64,
    breast_height_cm: f64,
) -> RgbaImage {
    let (width, height) = frame.dimensions();
    let mut img = image::DynamicImage::ImageRgb8(frame.image().clone()).into_rgba8();

    if let Some(person) = result.person_box() {
        draw_rect(
            &mut img,
            inclusive_px(&person, width, height),
            PERSON_COLOR,
            LINE_THICKNESS,
        );
    }

    if let Some(tree) = result.tree_box() {
        let tree_px = inclusive_px(&tree, width, height);
        draw_rect(&mut img, tree_px, TREE_COLOR, LINE_THICKNESS);

        let row = result
            .person_box()
            .map(|person| ScaleFrame::calibrate(&person, reference_height_cm))
            .and_then(|scale| scale.row_above_ground(breast_height_cm));
        if let Some(row) = row {
            draw_hline(
                &mut img,
                row,
                tree_px[0],
                tree_px[2] + 1,
                BREAST_HEIGHT_COLOR,
                LINE_THICKNESS,
            );
        }
    }

    img
}
