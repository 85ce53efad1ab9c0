//! Caller-level input checks, run before any image is touched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForeEdgeError, Result};

/// Source formats accepted for the cover image.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// How many numbered pages the book has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageCount {
    /// The total is known directly.
    Direct(u32),
    /// Derived from the last numbered page plus blank sheets at either end.
    Derived {
        last_numbered: u32,
        sheets_before: u32,
        sheets_after: u32,
    },
}

impl PageCount {
    pub fn total(&self) -> u32 {
        match *self {
            PageCount::Direct(n) => n,
            PageCount::Derived {
                last_numbered,
                sheets_before,
                sheets_after,
            } => last_numbered
                .saturating_add(sheets_before.saturating_mul(2))
                .saturating_add(sheets_after.saturating_mul(2)),
        }
    }
}

/// Number of physical sheets, and therefore slices, for `page_count` pages.
pub fn slice_count(page_count: u32) -> usize {
    page_count.div_ceil(2) as usize
}

/// Accept only a non-empty file name with an allowed image extension.
pub fn check_source_name(path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ForeEdgeError::InvalidInput(
            "no source image file name given".to_string(),
        ));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ForeEdgeError::InvalidInput(format!(
            "file type not allowed for '{name}'; accepted: {}",
            ALLOWED_EXTENSIONS.join(", ").to_uppercase()
        ))),
    }
}

/// Check the numeric parameters shared by slicing and layout.
pub fn check_dimensions(height_mm: f32, page_count: u32, slice_width_mm: f32) -> Result<()> {
    if !height_mm.is_finite() || height_mm <= 0.0 {
        return Err(ForeEdgeError::InvalidGeometry(format!(
            "book height must be positive, got {height_mm} mm"
        )));
    }
    if page_count < 2 {
        return Err(ForeEdgeError::InvalidGeometry(format!(
            "page count must be at least 2, got {page_count}"
        )));
    }
    if !slice_width_mm.is_finite() || slice_width_mm <= 0.0 {
        return Err(ForeEdgeError::InvalidGeometry(format!(
            "printed slice width must be positive, got {slice_width_mm} mm"
        )));
    }
    Ok(())
}

/// Session ids become directory names, so keep them to a safe alphabet.
pub fn check_session_id(id: &str) -> Result<()> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ForeEdgeError::InvalidInput(format!(
            "session id {id:?} must be non-empty and use only letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn derived_page_count() {
        let pages = PageCount::Derived {
            last_numbered: 300,
            sheets_before: 2,
            sheets_after: 3,
        };
        assert_eq!(pages.total(), 310);
        assert_eq!(PageCount::Direct(40).total(), 40);
    }

    #[test]
    fn two_pages_per_slice() {
        assert_eq!(slice_count(2), 1);
        assert_eq!(slice_count(3), 2);
        assert_eq!(slice_count(40), 20);
        assert_eq!(slice_count(41), 21);
    }

    #[test]
    fn source_names() {
        assert!(check_source_name(&PathBuf::from("cover.PNG")).is_ok());
        assert!(check_source_name(&PathBuf::from("dir/cover.jpeg")).is_ok());
        assert!(check_source_name(&PathBuf::from("cover.tiff")).is_err());
        assert!(check_source_name(&PathBuf::from("cover")).is_err());
        assert!(check_source_name(&PathBuf::from("")).is_err());
    }

    #[test]
    fn dimensions() {
        assert!(check_dimensions(200.0, 2, 5.0).is_ok());
        assert!(check_dimensions(0.0, 40, 5.0).is_err());
        assert!(check_dimensions(200.0, 1, 5.0).is_err());
        assert!(check_dimensions(200.0, 40, -1.0).is_err());
        assert!(check_dimensions(f32::NAN, 40, 5.0).is_err());
    }

    #[test]
    fn session_ids() {
        assert!(check_session_id("20261019_ab12-cd").is_ok());
        assert!(check_session_id("").is_err());
        assert!(check_session_id("../etc").is_err());
    }
}
