//! Layout compositor – reads the slices back from disk and writes the final
//! document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ForeEdgeError, Result};
use crate::geometry::PageGeometry;
use crate::layout::{plan_layout, ComposeRequest};
use crate::layout_config::LayoutConfig;
use crate::progress::Progress;
use crate::render::render_pdf_with_progress;
use crate::slicer::SLICE_EXTENSION;

/// PNG files in `dir`, sorted by file name.
///
/// The slicer's zero-padded names make this the left-to-right order.
pub fn list_slices(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut slices = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_slice = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(SLICE_EXTENSION));
        if is_slice {
            slices.push(path);
        }
    }
    slices.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if slices.is_empty() {
        return Err(ForeEdgeError::NoSlicesFound(dir.to_path_buf()));
    }
    Ok(slices)
}

/// List the slices and plan the document without rendering it.
pub fn plan(request: &ComposeRequest, geometry: &PageGeometry) -> Result<LayoutConfig> {
    let slices = list_slices(&request.slice_dir)?;
    let preview_px = ::image::image_dimensions(&request.source_image)
        .map_err(|e| ForeEdgeError::PreviewRender(e.to_string()))?;
    plan_layout(request, &slices, preview_px, geometry)
}

/// Build the document described by `request` and write it to
/// `request.output`. Returns the output path.
///
/// On failure the output file may exist but is incomplete.
pub fn compose(
    request: &ComposeRequest,
    geometry: &PageGeometry,
    progress: &dyn Progress,
) -> Result<PathBuf> {
    progress.report(75, "Checking slices for the PDF...");
    let layout = plan(request, geometry)?;

    progress.report(80, "Assembling slices into the PDF...");
    let bytes = render_pdf_with_progress(&layout, progress)?;

    if let Some(parent) = request.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&request.output, &bytes)?;
    log::info!(
        "Wrote '{}' ({} bytes, {} pages)",
        request.output.display(),
        bytes.len(),
        layout.pages.len()
    );

    progress.report(100, "PDF generated");
    Ok(request.output.clone())
}
