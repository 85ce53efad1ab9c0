//! Layout planning – turns an ordered list of slice files into a
//! [`LayoutConfig`]: a cover page followed by rows of framed slice blocks.
//!
//! Planning is pure. It reads no pixels; the caller supplies the preview
//! image's pixel size so the cover can keep its aspect ratio.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ForeEdgeError, Result};
use crate::fonts::{text_width, FontStyle};
use crate::geometry::{mm_to_pt, PageGeometry, Transform, NUMBER_STEP};
use crate::layout_config::{Element, ImageRole, LayoutConfig, PageLayout};
use crate::pagination::Grid;

/// Text of the watermark printed after every slice number.
pub const DEFAULT_WATERMARK: &str = "\u{00A9} foredge";
/// Name shown in the cover title.
pub const DEFAULT_AUTHOR: &str = "foredge";

/// The slice label reads top to bottom.
const LABEL_ROTATION_DEG: f32 = -90.0;
/// Distance from the frame top down to the label pivot.
const LABEL_DROP_MM: f32 = 10.0;
/// Gap between the slice number and the watermark.
const LABEL_GAP_MM: f32 = 2.0;
/// Cover title baseline, below the top margin.
const TITLE_DROP_MM: f32 = 3.0;
/// First info line, below the title baseline.
const INFO_DROP_MM: f32 = 12.0;
const INFO_LINE_HEIGHT_PT: f32 = 12.0;
/// Space between the info text and the preview area.
const PREVIEW_GAP_MM: f32 = 5.0;
/// Page-number footer: extra inset from the right margin and baseline height.
const FOOTER_INSET_MM: f32 = 20.0;
const FOOTER_BASELINE_MM: f32 = 2.0;

/// Everything the compositor needs to lay out one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeRequest {
    pub slice_dir: PathBuf,
    /// Must match the height the slices were cut for.
    pub height_mm: f32,
    /// Must match the width the slices were stretched to.
    pub slice_width_mm: f32,
    pub start_number: i64,
    pub step: i64,
    pub source_image: PathBuf,
    pub original_page_count: u32,
    pub output: PathBuf,
    pub title: String,
    pub author: String,
    pub watermark: String,
    /// Printed on the cover; injected so output is reproducible.
    pub created_on: NaiveDate,
}

impl ComposeRequest {
    /// A request with the default labels and numbering step.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        slice_dir: impl Into<PathBuf>,
        height_mm: f32,
        slice_width_mm: f32,
        start_number: i64,
        source_image: impl Into<PathBuf>,
        original_page_count: u32,
        output: impl Into<PathBuf>,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            slice_dir: slice_dir.into(),
            height_mm,
            slice_width_mm,
            start_number,
            step: NUMBER_STEP,
            source_image: source_image.into(),
            original_page_count,
            output: output.into(),
            title: "Fore-edge pattern".to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            watermark: DEFAULT_WATERMARK.to_string(),
            created_on,
        }
    }
}

/// Number printed on each of `count` slices.
///
/// Fails with [`ForeEdgeError::InvalidInput`] if the sequence leaves the
/// `i64` range.
pub fn printed_numbers(start: i64, step: i64, count: usize) -> Result<Vec<i64>> {
    (0..count)
        .map(|i| {
            i64::try_from(i)
                .ok()
                .and_then(|i| step.checked_mul(i))
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(|| {
                    ForeEdgeError::InvalidInput(format!(
                        "slice number {} overflows when starting at {start}",
                        i + 1
                    ))
                })
        })
        .collect()
}

/// Plan the whole document.
///
/// `preview_px` is the pixel size of `request.source_image`. Fails before
/// producing any page if there are no slices or the book is too tall.
pub fn plan_layout(
    request: &ComposeRequest,
    slices: &[PathBuf],
    preview_px: (u32, u32),
    geometry: &PageGeometry,
) -> Result<LayoutConfig> {
    if slices.is_empty() {
        return Err(ForeEdgeError::NoSlicesFound(request.slice_dir.clone()));
    }
    if !request.height_mm.is_finite() || request.height_mm <= 0.0 {
        return Err(ForeEdgeError::InvalidGeometry(format!(
            "book height must be positive, got {} mm",
            request.height_mm
        )));
    }
    geometry.check_height(request.height_mm)?;
    let grid = Grid::new(geometry, request.slice_width_mm, slices.len())?;
    let numbers = printed_numbers(request.start_number, request.step, slices.len())?;

    log::info!(
        "Layout: {} slices, {} per row, {} pages including cover",
        slices.len(),
        grid.slices_per_row,
        grid.total_pages()
    );

    let mut config = LayoutConfig::new(&request.title, geometry);
    config
        .pages
        .push(cover_page(request, &grid, preview_px, geometry)?);
    config
        .pages
        .extend(content_pages(request, slices, &numbers, &grid, geometry));

    debug_assert_eq!(config.pages.len(), grid.total_pages());
    Ok(config)
}

fn centered_text(text: String, style: FontStyle, size: f32, y: f32, page_width: f32) -> Element {
    let x = (page_width - text_width(&text, style, size)) / 2.0;
    Element::Text {
        x,
        y,
        text,
        style,
        size,
        rotation_deg: 0.0,
    }
}

/// "Page n of total", right-aligned with a fixed inset from the right margin.
fn footer(page_number: usize, total_pages: usize, geometry: &PageGeometry) -> Element {
    let text = format!("Page {page_number} of {total_pages}");
    let size = geometry.page_number_font_pt;
    let x = geometry.page_width_pt()
        - mm_to_pt(geometry.margin_horizontal_mm)
        - text_width(&text, FontStyle::Regular, size)
        - mm_to_pt(FOOTER_INSET_MM);
    Element::Text {
        x,
        y: mm_to_pt(FOOTER_BASELINE_MM),
        text,
        style: FontStyle::Regular,
        size,
        rotation_deg: 0.0,
    }
}

/// Horizontal rule across the content width at height `y`.
fn rule(y: f32, geometry: &PageGeometry) -> Element {
    Element::Line {
        x1: mm_to_pt(geometry.margin_horizontal_mm),
        y1: y,
        x2: geometry.page_width_pt() - mm_to_pt(geometry.margin_horizontal_mm),
        y2: y,
        thickness: geometry.frame_line_pt,
    }
}

fn cover_page(
    request: &ComposeRequest,
    grid: &Grid,
    preview_px: (u32, u32),
    geometry: &PageGeometry,
) -> Result<PageLayout> {
    let page_w = geometry.page_width_pt();
    let page_h = geometry.page_height_pt();
    let mut page = PageLayout::new(0);

    let title = format!(
        "Created by {} on {}",
        request.author,
        request.created_on.format("%d/%m/%Y")
    );
    let title_y = page_h - mm_to_pt(geometry.margin_top_mm + TITLE_DROP_MM);
    page.push(centered_text(
        title,
        FontStyle::Bold,
        geometry.title_font_pt,
        title_y,
        page_w,
    ));

    let info_y = page_h - mm_to_pt(geometry.margin_top_mm + TITLE_DROP_MM + INFO_DROP_MM);
    page.push(centered_text(
        format!(
            "Total slices: {} (corresponding to {} pages)",
            grid.slice_count, request.original_page_count
        ),
        FontStyle::Regular,
        geometry.info_font_pt,
        info_y,
        page_w,
    ));
    let height_y = info_y - INFO_LINE_HEIGHT_PT;
    page.push(centered_text(
        format!("Book height: {:.2} mm", request.height_mm),
        FontStyle::Regular,
        geometry.info_font_pt,
        height_y,
        page_w,
    ));

    let (px_w, px_h) = preview_px;
    if px_w == 0 || px_h == 0 {
        return Err(ForeEdgeError::PreviewRender(format!(
            "'{}' has no pixels",
            request.source_image.display()
        )));
    }
    let area_top = height_y - mm_to_pt(PREVIEW_GAP_MM);
    let area_bottom = mm_to_pt(geometry.margin_bottom_mm);
    let max_h = area_top - area_bottom;
    let max_w = mm_to_pt(geometry.content_width_mm());
    let ratio = px_w as f32 / px_h as f32;
    let (width, height) = if max_w / max_h > ratio {
        (max_h * ratio, max_h)
    } else {
        (max_w, max_w / ratio)
    };
    page.push(Element::Image {
        src: request.source_image.clone(),
        role: ImageRole::Preview,
        x: (page_w - width) / 2.0,
        y: area_bottom + (max_h - height) / 2.0,
        width,
        height,
    });

    page.push(footer(1, grid.total_pages(), geometry));
    Ok(page)
}

fn content_pages(
    request: &ComposeRequest,
    slices: &[PathBuf],
    numbers: &[i64],
    grid: &Grid,
    geometry: &PageGeometry,
) -> Vec<PageLayout> {
    let total_pages = grid.total_pages();
    let top_y = geometry.page_height_pt() - mm_to_pt(geometry.margin_top_mm);
    let frame_w = mm_to_pt(grid.block_width_mm);
    let frame_h = mm_to_pt(request.height_mm);
    let frame_y = top_y - frame_h;
    let image_w = mm_to_pt(request.slice_width_mm);
    let tick_offset = mm_to_pt(geometry.tick_offset_mm);
    let tick_len = mm_to_pt(geometry.tick_length_mm);

    let mut pages = Vec::with_capacity(grid.content_pages());
    let mut page = PageLayout::new(1);
    page.push(rule(top_y, geometry));

    for (index, (slice, &number)) in slices.iter().zip(numbers).enumerate() {
        if grid.starts_new_page(index) {
            page.push(footer(page.page_index + 1, total_pages, geometry));
            let next = PageLayout::new(page.page_index + 1);
            pages.push(std::mem::replace(&mut page, next));
            page.push(rule(top_y, geometry));
            log::debug!("Starting page {} at slice {}", page.page_index + 1, index + 1);
        }

        let frame_x = mm_to_pt(geometry.margin_horizontal_mm) + grid.column(index) as f32 * frame_w;
        page.push(Element::Rect {
            x: frame_x,
            y: frame_y,
            width: frame_w,
            height: frame_h,
            thickness: geometry.frame_line_pt,
        });

        push_label(&mut page, request, number, frame_x, top_y, geometry);

        let image_x = frame_x + mm_to_pt(geometry.slice_pad_left_mm);
        page.push(Element::Image {
            src: slice.clone(),
            role: ImageRole::Slice,
            x: image_x,
            y: frame_y,
            width: image_w,
            height: frame_h,
        });

        let center_x = image_x + image_w / 2.0;
        push_tick(&mut page, center_x, top_y + tick_offset, top_y + tick_offset + tick_len, geometry);
        push_tick(&mut page, center_x, frame_y - tick_offset, frame_y - tick_offset - tick_len, geometry);
    }

    page.push(footer(page.page_index + 1, total_pages, geometry));
    page.push(rule(frame_y, geometry));
    pages.push(page);
    pages
}

/// Slice number followed by the watermark, rotated to read down the left
/// padding strip and centered on it.
fn push_label(
    page: &mut PageLayout,
    request: &ComposeRequest,
    number: i64,
    frame_x: f32,
    frame_top: f32,
    geometry: &PageGeometry,
) {
    let pivot = Transform::new(
        frame_x + mm_to_pt(geometry.slice_pad_left_mm) / 2.0,
        frame_top - mm_to_pt(LABEL_DROP_MM),
        LABEL_ROTATION_DEG,
    );

    let label = number.to_string();
    let number_w = text_width(&label, FontStyle::Bold, geometry.number_font_pt);
    let across = -number_w / 2.0;

    let (x, y) = pivot.to_page(0.0, across);
    page.push(Element::Text {
        x,
        y,
        text: label,
        style: FontStyle::Bold,
        size: geometry.number_font_pt,
        rotation_deg: LABEL_ROTATION_DEG,
    });

    if request.watermark.is_empty() {
        return;
    }
    let (x, y) = pivot.to_page(number_w + mm_to_pt(LABEL_GAP_MM), across);
    page.push(Element::Text {
        x,
        y,
        text: request.watermark.clone(),
        style: FontStyle::Regular,
        size: geometry.watermark_font_pt,
        rotation_deg: LABEL_ROTATION_DEG,
    });
}

fn push_tick(page: &mut PageLayout, x: f32, y_from: f32, y_to: f32, geometry: &PageGeometry) {
    page.push(Element::Line {
        x1: x,
        y1: y_from,
        x2: x,
        y2: y_to,
        thickness: geometry.frame_line_pt,
    });
}

/// Bare file name of `path`, for error reports.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
