//! Standalone preview raster of the cover image.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::{ForeEdgeError, Result};

/// Longest edge of the preview written by the CLI.
pub const DEFAULT_PREVIEW_EDGE_PX: u32 = 1200;

fn load(source: &Path) -> Result<DynamicImage> {
    image::open(source).map_err(|e| ForeEdgeError::ImageLoad {
        path: source.to_path_buf(),
        source: e,
    })
}

/// Scale `img` down so neither edge exceeds `max_edge_px`. Smaller images
/// are returned unchanged.
pub fn fit_within(img: DynamicImage, max_edge_px: u32) -> DynamicImage {
    if img.width() <= max_edge_px && img.height() <= max_edge_px {
        return img;
    }
    img.resize(max_edge_px, max_edge_px, FilterType::Lanczos3)
}

/// Write an aspect-preserving PNG preview of `source` to `out`.
pub fn write_preview(source: &Path, out: &Path, max_edge_px: u32) -> Result<(u32, u32)> {
    let img = fit_within(load(source)?, max_edge_px.max(1)).to_rgb8();
    img.save_with_format(out, ImageFormat::Png)
        .map_err(|e| ForeEdgeError::PreviewRender(e.to_string()))?;
    log::info!(
        "Wrote {}x{} px preview to '{}'",
        img.width(),
        img.height(),
        out.display()
    );
    Ok((img.width(), img.height()))
}

/// Encode `source` as PNG bytes no larger than `max_edge_px`, for embedding
/// on the cover page regardless of the source format.
pub(crate) fn preview_png_bytes(source: &Path, max_edge_px: u32) -> Result<Vec<u8>> {
    let img = image::open(source).map_err(|e| ForeEdgeError::PreviewRender(e.to_string()))?;
    let img = DynamicImage::ImageRgb8(fit_within(img, max_edge_px.max(1)).to_rgb8());
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ForeEdgeError::PreviewRender(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn preview_keeps_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cover.jpg");
        RgbImage::from_pixel(400, 200, Rgb([10, 20, 30]))
            .save(&source)
            .unwrap();

        let out = dir.path().join("preview.png");
        let (w, h) = write_preview(&source, &out, 100).unwrap();
        assert_eq!((w, h), (100, 50));
        assert_eq!(image::image_dimensions(&out).unwrap(), (100, 50));
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(30, 40));
        let fitted = fit_within(img, 100);
        assert_eq!((fitted.width(), fitted.height()), (30, 40));
    }

    #[test]
    fn embedded_preview_is_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cover.bmp");
        RgbImage::new(64, 32).save(&source).unwrap();
        let bytes = preview_png_bytes(&source, 16).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }
}
