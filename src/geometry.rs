//! Physical units and the fixed page geometry of the printed pattern.
//!
//! Layout is computed in PDF points (1 pt = 1/72 inch) with the origin at the
//! bottom-left corner of the page. Book dimensions arrive in millimeters and
//! raster dimensions are derived from them at a fixed resolution.

use crate::error::{ForeEdgeError, Result};

pub const MM_PER_INCH: f32 = 25.4;
pub const PT_PER_INCH: f32 = 72.0;

/// Resolution the slices are rasterised at.
pub const DEFAULT_DPI: u32 = 300;

/// Each sheet carries two page numbers.
pub const NUMBER_STEP: i64 = 2;

/// Slack allowed when comparing the book height to the page content height.
pub const HEIGHT_TOLERANCE_MM: f32 = 0.1;

/// Millimeters to PDF points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// PDF points to millimeters.
pub fn pt_to_mm(pt: f32) -> f32 {
    pt * MM_PER_INCH / PT_PER_INCH
}

/// Millimeters to whole device pixels at `dpi`, rounded to nearest.
pub fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    let px = (f64::from(mm) / f64::from(MM_PER_INCH) * f64::from(dpi)).round();
    if px <= 0.0 {
        0
    } else {
        px as u32
    }
}

/// Fixed geometry of the output document, all in millimeters except the
/// line weight and font sizes which are in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_horizontal_mm: f32,
    pub margin_top_mm: f32,
    pub margin_bottom_mm: f32,
    /// Blank strip left of each slice; holds the rotated number.
    pub slice_pad_left_mm: f32,
    pub slice_pad_right_mm: f32,
    pub tick_length_mm: f32,
    pub tick_offset_mm: f32,
    pub frame_line_pt: f32,
    pub number_font_pt: f32,
    pub watermark_font_pt: f32,
    pub page_number_font_pt: f32,
    pub title_font_pt: f32,
    pub info_font_pt: f32,
}

impl PageGeometry {
    /// A4 portrait with the margins used for every fore-edge pattern.
    pub const fn a4() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_horizontal_mm: 10.0,
            margin_top_mm: 12.0,
            margin_bottom_mm: 7.0,
            slice_pad_left_mm: 5.0,
            slice_pad_right_mm: 5.0,
            tick_length_mm: 3.0,
            tick_offset_mm: 2.0,
            frame_line_pt: 0.5,
            number_font_pt: 8.0,
            watermark_font_pt: 8.0,
            page_number_font_pt: 8.0,
            title_font_pt: 14.0,
            info_font_pt: 10.0,
        }
    }

    pub fn page_width_pt(&self) -> f32 {
        mm_to_pt(self.page_width_mm)
    }

    pub fn page_height_pt(&self) -> f32 {
        mm_to_pt(self.page_height_mm)
    }

    /// Width between the left and right margins.
    pub fn content_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_horizontal_mm
    }

    /// Height between the top and bottom margins.
    pub fn content_height_mm(&self) -> f32 {
        self.page_height_mm - self.margin_top_mm - self.margin_bottom_mm
    }

    /// Width of one slice block: padding + printed slice + padding.
    pub fn block_width_mm(&self, slice_width_mm: f32) -> f32 {
        slice_width_mm + self.slice_pad_left_mm + self.slice_pad_right_mm
    }

    /// Reject a book height that cannot fit between the vertical margins.
    pub fn check_height(&self, height_mm: f32) -> Result<()> {
        let available_mm = self.content_height_mm();
        if height_mm > available_mm + HEIGHT_TOLERANCE_MM {
            return Err(ForeEdgeError::GeometryTooLarge {
                required_mm: height_mm,
                available_mm,
            });
        }
        Ok(())
    }
}

/// A local drawing frame: an origin on the page and a counter-clockwise
/// rotation of its axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub rotation_deg: f32,
}

impl Transform {
    pub fn new(x: f32, y: f32, rotation_deg: f32) -> Self {
        Self { x, y, rotation_deg }
    }

    /// Map a point given in this frame to page coordinates.
    pub fn to_page(&self, local_x: f32, local_y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.matrix();
        (a * local_x + c * local_y + e, b * local_x + d * local_y + f)
    }

    /// The frame as a PDF matrix `[a b c d e f]`.
    pub fn matrix(&self) -> [f32; 6] {
        let (sin, cos) = snap_sin_cos(self.rotation_deg);
        [cos, sin, -sin, cos, self.x, self.y]
    }
}

/// Sine and cosine with quarter turns kept exact.
fn snap_sin_cos(deg: f32) -> (f32, f32) {
    let turns = deg.rem_euclid(360.0);
    match turns {
        t if t == 0.0 => (0.0, 1.0),
        t if t == 90.0 => (1.0, 0.0),
        t if t == 180.0 => (0.0, -1.0),
        t if t == 270.0 => (-1.0, 0.0),
        t => t.to_radians().sin_cos(),
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}
