//! Slicer – cuts the cover image into one re-stretched strip per sheet.
//!
//! The source is first scaled so its height equals the book height in device
//! pixels. Its width is then divided into `ceil(pages / 2)` equal source
//! columns and each column is stretched on its own to the printed slice width.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{ForeEdgeError, Result};
use crate::geometry::{mm_to_px, DEFAULT_DPI};
use crate::progress::{scaled, Progress};
use crate::validate::{check_dimensions, slice_count};

/// Extension of every slice file; the compositor filters on it.
pub const SLICE_EXTENSION: &str = "png";

const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// File name for the 1-based slice `index`. Five digits of zero padding keep
/// lexicographic order equal to numeric order up to 99999 slices.
pub fn slice_file_name(index: usize) -> String {
    format!("slice_{index:05}.{SLICE_EXTENSION}")
}

/// Parameters of one slicing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub height_mm: f32,
    pub page_count: u32,
    pub dpi: u32,
    pub slice_width_mm: f32,
}

impl SliceRequest {
    pub fn new(height_mm: f32, page_count: u32, slice_width_mm: f32) -> Self {
        Self {
            height_mm,
            page_count,
            dpi: DEFAULT_DPI,
            slice_width_mm,
        }
    }

    pub fn slice_count(&self) -> usize {
        slice_count(self.page_count)
    }

    /// Height every slice shares, in pixels.
    pub fn height_px(&self) -> u32 {
        mm_to_px(self.height_mm, self.dpi)
    }

    /// Width every slice is stretched to, in pixels.
    pub fn width_px(&self) -> u32 {
        mm_to_px(self.slice_width_mm, self.dpi)
    }

    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.height_mm, self.page_count, self.slice_width_mm)?;
        if self.dpi == 0 {
            return Err(ForeEdgeError::InvalidGeometry(
                "resolution must be positive".to_string(),
            ));
        }
        if self.slice_count() == 0 {
            return Err(ForeEdgeError::InvalidGeometry(
                "request yields no slices".to_string(),
            ));
        }
        if self.height_px() == 0 || self.width_px() == 0 {
            return Err(ForeEdgeError::InvalidGeometry(format!(
                "{} x {} mm rounds to an empty raster at {} dpi",
                self.slice_width_mm, self.height_mm, self.dpi
            )));
        }
        Ok(())
    }
}

/// Pixel geometry of a slicing run, fixed before any pixel is resampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    /// Height of the normalized image and of every slice.
    pub height_px: u32,
    /// Width of the source once scaled to `height_px`.
    pub normalized_width: u32,
    /// Width every slice is stretched to.
    pub target_width_px: u32,
    /// Source column of each slice in the normalized image, left to right.
    pub columns: Vec<Range<u32>>,
}

impl SlicePlan {
    /// Plan the cut of a `source_width` x `source_height` image.
    ///
    /// Fails with [`ForeEdgeError::EmptyColumn`] when the normalized image is
    /// too narrow to give every sheet at least one source pixel.
    pub fn new(request: &SliceRequest, source_width: u32, source_height: u32) -> Result<Self> {
        request.validate()?;
        if source_width == 0 || source_height == 0 {
            return Err(ForeEdgeError::InvalidGeometry(format!(
                "source image is {source_width}x{source_height} px"
            )));
        }

        let height_px = request.height_px();
        let normalized_width = (f64::from(height_px) * f64::from(source_width)
            / f64::from(source_height))
        .round() as u32;

        let count = request.slice_count();
        let column_width = f64::from(normalized_width) / count as f64;

        let mut columns = Vec::with_capacity(count);
        for i in 0..count {
            let left = (i as f64 * column_width).round() as u32;
            let right = (((i + 1) as f64 * column_width).round() as u32).min(normalized_width);
            if right <= left {
                return Err(ForeEdgeError::EmptyColumn {
                    index: i + 1,
                    width: i64::from(right) - i64::from(left),
                });
            }
            columns.push(left..right);
        }

        Ok(Self {
            height_px,
            normalized_width,
            target_width_px: request.width_px(),
            columns,
        })
    }
}

/// The slices written by [`slice_image`], in print order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSet {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub width_px: u32,
    pub height_px: u32,
}

impl SliceSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Cut `source` into slices and save them as PNG files in `out_dir`.
///
/// `out_dir` is created if needed. On a save failure the files already
/// written stay on disk for the caller to remove with the directory.
pub fn slice_image(
    source: &Path,
    request: &SliceRequest,
    out_dir: &Path,
    progress: &dyn Progress,
) -> Result<SliceSet> {
    request.validate()?;

    progress.report(5, "Loading source image...");
    let original: RgbImage = image::open(source)
        .map_err(|source_err| ForeEdgeError::ImageLoad {
            path: source.to_path_buf(),
            source: source_err,
        })?
        .to_rgb8();

    let plan = SlicePlan::new(request, original.width(), original.height())?;
    log::debug!(
        "Source {}x{} px normalized to {}x{} px",
        original.width(),
        original.height(),
        plan.normalized_width,
        plan.height_px
    );

    progress.report(15, "Resizing image to the book height...");
    let normalized = imageops::resize(
        &original,
        plan.normalized_width,
        plan.height_px,
        RESAMPLE_FILTER,
    );
    drop(original);

    fs::create_dir_all(out_dir)?;

    let total = plan.columns.len();
    progress.report(30, &format!("Cutting and saving {total} slices..."));
    let report_every = (total / 100).max(1);

    let mut files = Vec::with_capacity(total);
    for (i, column) in plan.columns.iter().enumerate() {
        let crop = imageops::crop_imm(
            &normalized,
            column.start,
            0,
            column.end - column.start,
            plan.height_px,
        )
        .to_image();
        let stretched = imageops::resize(
            &crop,
            plan.target_width_px,
            plan.height_px,
            RESAMPLE_FILTER,
        );

        let path = out_dir.join(slice_file_name(i + 1));
        stretched
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| ForeEdgeError::SliceWrite {
                index: i + 1,
                source,
            })?;
        files.push(path);

        if i % report_every == 0 || i + 1 == total {
            progress.report(
                scaled(30, 40, i, total),
                &format!("Saved slice {}/{total}", i + 1),
            );
        }
    }

    log::info!(
        "Wrote {} slices of {}x{} px to '{}'",
        files.len(),
        plan.target_width_px,
        plan.height_px,
        out_dir.display()
    );

    Ok(SliceSet {
        dir: out_dir.to_path_buf(),
        files,
        width_px: plan.target_width_px,
        height_px: plan.height_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        })
    }

    #[test]
    fn file_names_sort_numerically() {
        let mut names: Vec<String> = [99999, 1, 10, 2, 100].iter().map(|i| slice_file_name(*i)).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "slice_00001.png",
                "slice_00002.png",
                "slice_00010.png",
                "slice_00100.png",
                "slice_99999.png"
            ]
        );
    }

    #[test]
    fn plan_for_reference_scenario() {
        let request = SliceRequest::new(200.0, 40, 5.0);
        let plan = SlicePlan::new(&request, 3000, 4000).unwrap();
        assert_eq!(plan.height_px, 2362);
        assert_eq!(plan.target_width_px, 59);
        assert_eq!(plan.normalized_width, 1772);
        assert_eq!(plan.columns.len(), 20);
        assert_eq!(plan.columns[0].start, 0);
        assert_eq!(plan.columns[19].end, 1772);
        // Columns tile the image without gaps or overlap.
        for pair in plan.columns.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn plan_rejects_too_narrow_source() {
        let request = SliceRequest::new(200.0, 40, 5.0);
        match SlicePlan::new(&request, 10, 4000) {
            Err(ForeEdgeError::EmptyColumn { index, width }) => {
                assert!(index >= 1);
                assert!(width <= 0);
            }
            other => panic!("expected EmptyColumn, got {other:?}"),
        }
    }

    #[test]
    fn request_validation() {
        assert!(SliceRequest::new(0.0, 40, 5.0).validate().is_err());
        assert!(SliceRequest::new(200.0, 1, 5.0).validate().is_err());
        assert!(SliceRequest::new(200.0, 40, 0.0).validate().is_err());
        let mut tiny = SliceRequest::new(200.0, 40, 0.01);
        tiny.dpi = 72;
        assert!(tiny.validate().is_err());
    }

    #[test]
    fn slices_share_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cover.png");
        gradient(90, 120).save(&source).unwrap();

        let request = SliceRequest {
            height_mm: 30.0,
            page_count: 9,
            dpi: 100,
            slice_width_mm: 4.0,
        };
        let out = dir.path().join("slices");
        let set = slice_image(&source, &request, &out, &NoProgress).unwrap();

        assert_eq!(set.len(), 5);
        assert_eq!(set.height_px, 118);
        assert_eq!(set.width_px, 16);
        for file in &set.files {
            let (w, h) = image::image_dimensions(file).unwrap();
            assert_eq!((w, h), (16, 118));
        }
    }

    #[test]
    fn missing_source_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let request = SliceRequest::new(50.0, 4, 5.0);
        let result = slice_image(
            &dir.path().join("nope.png"),
            &request,
            &dir.path().join("slices"),
            &NoProgress,
        );
        assert!(matches!(result, Err(ForeEdgeError::ImageLoad { .. })));
    }

    #[test]
    fn write_failure_stops_at_the_failing_slice() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cover.png");
        gradient(90, 120).save(&source).unwrap();
        let out = dir.path().join("slices");
        // A directory where slice 2 should go makes its save fail.
        fs::create_dir_all(out.join(slice_file_name(2))).unwrap();

        let request = SliceRequest {
            height_mm: 30.0,
            page_count: 9,
            dpi: 100,
            slice_width_mm: 4.0,
        };
        match slice_image(&source, &request, &out, &NoProgress) {
            Err(ForeEdgeError::SliceWrite { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected SliceWrite, got {other:?}"),
        }
        // Slice 1 stays behind; nothing after slice 2 is written.
        assert!(out.join(slice_file_name(1)).is_file());
        assert!(!out.join(slice_file_name(3)).exists());
    }
}
