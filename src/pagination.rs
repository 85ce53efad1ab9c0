//! Pagination – how many slice blocks fit on a row and how many pages the
//! document needs.
//!
//! Every content page holds a single row of blocks; the cover page comes
//! first and is counted in [`Grid::total_pages`].

use serde::{Deserialize, Serialize};

use crate::error::{ForeEdgeError, Result};
use crate::geometry::PageGeometry;

/// Absorbs float noise when the content width is an exact multiple of the
/// block width.
const FIT_EPSILON_MM: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Block width (padding + slice + padding) in millimeters.
    pub block_width_mm: f32,
    pub slices_per_row: usize,
    pub slice_count: usize,
}

impl Grid {
    pub fn new(geometry: &PageGeometry, slice_width_mm: f32, slice_count: usize) -> Result<Self> {
        if !slice_width_mm.is_finite() || slice_width_mm <= 0.0 {
            return Err(ForeEdgeError::InvalidGeometry(format!(
                "printed slice width must be positive, got {slice_width_mm} mm"
            )));
        }
        let block_width_mm = geometry.block_width_mm(slice_width_mm);
        let fit = ((geometry.content_width_mm() + FIT_EPSILON_MM) / block_width_mm).floor();
        let slices_per_row = (fit as usize).max(1);
        Ok(Self {
            block_width_mm,
            slices_per_row,
            slice_count,
        })
    }

    /// Pages holding slices.
    pub fn content_pages(&self) -> usize {
        self.slice_count.div_ceil(self.slices_per_row)
    }

    /// Content pages plus the cover.
    pub fn total_pages(&self) -> usize {
        self.content_pages() + 1
    }

    /// Position of the 0-based slice `index` on its row.
    pub fn column(&self, index: usize) -> usize {
        index % self.slices_per_row
    }

    /// 0-based document page holding slice `index` (page 0 is the cover).
    pub fn page_of(&self, index: usize) -> usize {
        index / self.slices_per_row + 1
    }

    /// Whether slice `index` opens a new content page after the first.
    pub fn starts_new_page(&self, index: usize) -> bool {
        index > 0 && self.column(index) == 0
    }
}
