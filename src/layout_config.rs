//! Layout config – the intermediate representation between layout planning
//! and PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner of the
//! page, which is also what the renderer emits.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fonts::FontStyle;
use crate::geometry::PageGeometry;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of pages; the first one is the cover.
    pub pages: Vec<PageLayout>,
}

/// One page of content, drawn in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub elements: Vec<Element>,
}

/// What an embedded image is for; decides the error reported when it cannot
/// be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageRole {
    Preview,
    Slice,
}

/// A positioned drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    /// Straight stroke from `(x1, y1)` to `(x2, y2)`.
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness: f32,
    },
    /// Stroked rectangle with its bottom-left corner at `(x, y)`.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
    },
    /// A single run of text whose baseline starts at `(x, y)`.
    ///
    /// `rotation_deg` turns the run counter-clockwise around its origin;
    /// `-90` reads top to bottom.
    Text {
        x: f32,
        y: f32,
        text: String,
        style: FontStyle,
        size: f32,
        rotation_deg: f32,
    },
    /// A raster file scaled to exactly `width` x `height` points.
    Image {
        src: PathBuf,
        role: ImageRole,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

impl LayoutConfig {
    /// Create an empty layout config sized to `geometry`'s page.
    pub fn new(title: &str, geometry: &PageGeometry) -> Self {
        Self {
            title: title.to_string(),
            page_width_pt: geometry.page_width_pt(),
            page_height_pt: geometry.page_height_pt(),
            pages: Vec::new(),
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Every image drawn with `role`, in drawing order.
    pub fn images(&self, role: ImageRole) -> impl Iterator<Item = &Element> + '_ {
        self.pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter(move |e| matches!(e, Element::Image { role: r, .. } if *r == role))
    }
}

impl PageLayout {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Text runs on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_elements() {
        let mut config = LayoutConfig::new("pattern", &PageGeometry::a4());
        let mut page = PageLayout::new(0);
        page.push(Element::Text {
            x: 10.0,
            y: 20.0,
            text: "3".to_string(),
            style: FontStyle::Bold,
            size: 8.0,
            rotation_deg: -90.0,
        });
        page.push(Element::Image {
            src: PathBuf::from("slices/slice_00001.png"),
            role: ImageRole::Slice,
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        });
        config.pages.push(page);

        let json = config.to_json().unwrap();
        assert!(json.contains("\"kind\": \"text\""));
        let parsed = LayoutConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.images(ImageRole::Slice).count(), 1);
        assert_eq!(parsed.images(ImageRole::Preview).count(), 0);
    }
}
