//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use printpdf::*;

use crate::error::{ForeEdgeError, Result};
use crate::fonts::FontStyle;
use crate::geometry::{pt_to_mm, Transform};
use crate::layout::display_name;
use crate::layout_config::{Element, ImageRole, LayoutConfig};
use crate::preview::preview_png_bytes;
use crate::progress::{scaled, NoProgress, Progress};

/// Longest edge of the cover preview once embedded; larger sources are
/// downsampled first.
pub const PREVIEW_EMBED_EDGE_PX: u32 = 3000;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a LayoutConfig into PDF bytes.
///
/// Images are read from disk the first time they are drawn. A preview that
/// cannot be read fails with [`ForeEdgeError::PreviewRender`], a slice with
/// [`ForeEdgeError::SliceRender`]; either aborts the whole document.
pub fn render_pdf(config: &LayoutConfig) -> Result<Vec<u8>> {
    render_pdf_with_progress(config, &NoProgress)
}

/// [`render_pdf`], reporting 80–95 % as slices are embedded.
pub fn render_pdf_with_progress(config: &LayoutConfig, progress: &dyn Progress) -> Result<Vec<u8>> {
    let page_w = Mm(pt_to_mm(config.page_width_pt));
    let page_h = Mm(pt_to_mm(config.page_height_pt));

    let mut doc = PdfDocument::new(&config.title);
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let mut images: HashMap<PathBuf, ImageResource> = HashMap::new();

    let slice_total = config.images(ImageRole::Slice).count();
    let report_every = (slice_total / 100).max(1);
    let mut slices_done = 0usize;

    let mut pages = Vec::with_capacity(config.pages.len());
    for page_layout in &config.pages {
        let mut ops = Vec::new();

        for element in &page_layout.elements {
            if let Element::Image { src, role, .. } = element {
                if !images.contains_key(src) {
                    let resource = register_image(&mut doc, src, *role, &mut warnings)?;
                    images.insert(src.clone(), resource);
                }
                if *role == ImageRole::Slice {
                    if slices_done % report_every == 0 {
                        progress.report(
                            scaled(80, 15, slices_done, slice_total),
                            &format!("Adding slice {}/{slice_total}", slices_done + 1),
                        );
                    }
                    slices_done += 1;
                }
            }
            render_element(&mut ops, element, &images);
        }

        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);

    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warnings", warnings.len());
    }
    Ok(bytes)
}

/// Load an image from disk and register it with the document as an XObject.
fn register_image(
    doc: &mut PdfDocument,
    src: &Path,
    role: ImageRole,
    warnings: &mut Vec<PdfWarnMsg>,
) -> Result<ImageResource> {
    let fail = |reason: String| match role {
        ImageRole::Preview => ForeEdgeError::PreviewRender(reason),
        ImageRole::Slice => ForeEdgeError::SliceRender {
            file: display_name(src),
            reason,
        },
    };

    let bytes = match role {
        ImageRole::Preview => preview_png_bytes(src, PREVIEW_EMBED_EDGE_PX)?,
        ImageRole::Slice => fs::read(src).map_err(|e| fail(e.to_string()))?,
    };

    // Decode with the `image` crate to obtain pixel dimensions.
    let decoded = ::image::load_from_memory(&bytes).map_err(|e| fail(e.to_string()))?;
    let (px_width, px_height) = (decoded.width(), decoded.height());
    drop(decoded);

    let raw = RawImage::decode_from_bytes(&bytes, warnings)
        .map_err(|e| fail(format!("PDF encode error: {e}")))?;
    let xobj_id = doc.add_image(&raw);
    log::debug!(
        "Embedded '{}' ({px_width}x{px_height} px)",
        src.display()
    );

    Ok(ImageResource {
        xobj_id,
        px_width,
        px_height,
    })
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF. Relies on printpdf 0.8.2
    // writing builtin-font text as a hex string of `as_bytes()` without
    // inspecting it as UTF-8; re-check on any printpdf upgrade.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn black() -> Color {
    Color::Rgb(Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn builtin(style: FontStyle) -> BuiltinFont {
    match style {
        FontStyle::Regular => BuiltinFont::Helvetica,
        FontStyle::Bold => BuiltinFont::HelveticaBold,
    }
}

fn stroke(ops: &mut Vec<Op>, thickness: f32, points: Vec<LinePoint>, is_closed: bool) {
    ops.push(Op::SetOutlineColor { col: black() });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line { points, is_closed },
    });
}

/// Text run starting at the current origin.
fn write_text(ops: &mut Vec<Op>, x: f32, y: f32, text: &str, style: FontStyle, size: f32) {
    let font = builtin(style);
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor { col: black() });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Render one element into PDF ops.
fn render_element(ops: &mut Vec<Op>, element: &Element, images: &HashMap<PathBuf, ImageResource>) {
    match element {
        Element::Line {
            x1,
            y1,
            x2,
            y2,
            thickness,
        } => stroke(ops, *thickness, vec![point(*x1, *y1), point(*x2, *y2)], false),

        Element::Rect {
            x,
            y,
            width,
            height,
            thickness,
        } => {
            let (x1, y1, x2, y2) = (*x, *y, x + width, y + height);
            stroke(
                ops,
                *thickness,
                vec![point(x1, y2), point(x2, y2), point(x2, y1), point(x1, y1)],
                true,
            );
        }

        Element::Text {
            x,
            y,
            text,
            style,
            size,
            rotation_deg,
        } => {
            if text.is_empty() {
                return;
            }
            if *rotation_deg == 0.0 {
                write_text(ops, *x, *y, text, *style, *size);
            } else {
                // Rotate a local frame anchored at the text origin, then write
                // the run at that frame's origin.
                ops.push(Op::SaveGraphicsState);
                ops.push(Op::SetTransformationMatrix {
                    matrix: CurTransMat::Raw(Transform::new(*x, *y, *rotation_deg).matrix()),
                });
                write_text(ops, 0.0, 0.0, text, *style, *size);
                ops.push(Op::RestoreGraphicsState);
            }
        }

        // Image – embed from pre-registered XObject
        Element::Image {
            src,
            x,
            y,
            width,
            height,
            ..
        } => {
            let Some(res) = images.get(src) else {
                log::warn!("Skipping unregistered image '{}'", src.display());
                return;
            };

            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = if res.px_width > 0 {
                width / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                height / res.px_height as f32
            } else {
                1.0
            };

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(*x)),
                    translate_y: Some(Pt(*y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageGeometry;
    use crate::layout_config::PageLayout;

    #[test]
    fn render_empty_document() {
        let config = LayoutConfig::new("empty", &PageGeometry::a4());
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn rotated_text_is_wrapped_in_graphics_state() {
        let mut ops = Vec::new();
        let element = Element::Text {
            x: 30.0,
            y: 700.0,
            text: "12".to_string(),
            style: FontStyle::Bold,
            size: 8.0,
            rotation_deg: -90.0,
        };
        render_element(&mut ops, &element, &HashMap::new());
        assert!(matches!(ops.first(), Some(Op::SaveGraphicsState)));
        assert!(matches!(ops.last(), Some(Op::RestoreGraphicsState)));
        assert!(ops
            .iter()
            .any(|op| matches!(op, Op::SetTransformationMatrix { .. })));
    }

    #[test]
    fn missing_slice_names_the_file() {
        let mut config = LayoutConfig::new("broken", &PageGeometry::a4());
        let mut page = PageLayout::new(0);
        page.push(Element::Image {
            src: PathBuf::from("/nonexistent/slice_00007.png"),
            role: ImageRole::Slice,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        });
        config.pages.push(page);

        match render_pdf(&config) {
            Err(ForeEdgeError::SliceRender { file, .. }) => assert_eq!(file, "slice_00007.png"),
            other => panic!("expected SliceRender, got {other:?}"),
        }
    }

    #[test]
    fn missing_preview_is_a_preview_error() {
        let mut config = LayoutConfig::new("broken", &PageGeometry::a4());
        let mut page = PageLayout::new(0);
        page.push(Element::Image {
            src: PathBuf::from("/nonexistent/cover.png"),
            role: ImageRole::Preview,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        });
        config.pages.push(page);
        assert!(matches!(
            render_pdf(&config),
            Err(ForeEdgeError::PreviewRender(_))
        ));
    }

    #[test]
    fn watermark_reaches_the_pdf_as_winansi_bytes() {
        let mut config = LayoutConfig::new("label", &PageGeometry::a4());
        let mut page = PageLayout::new(0);
        page.push(Element::Text {
            x: 50.0,
            y: 50.0,
            text: "\u{00A9} foredge".to_string(),
            style: FontStyle::Regular,
            size: 8.0,
            rotation_deg: 0.0,
        });
        config.pages.push(page);
        let bytes = render_pdf(&config).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = lopdf::content::Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let shown: Vec<Vec<u8>> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(lopdf::Object::String(raw, _)) => Some(raw.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(shown, vec![b"\xA9 foredge".to_vec()]);
    }

    #[test]
    fn winlatin_maps_copyright() {
        let s = to_winlatin("\u{00A9} x");
        assert_eq!(s.as_bytes(), &[0xA9, b' ', b'x']);
    }
}
