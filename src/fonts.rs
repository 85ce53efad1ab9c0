//! Text measurement for the PDF builtin Helvetica faces.
//!
//! Builtin fonts are never embedded, so their advance widths come from the
//! standard AFM metrics (units per 1000 em) for printable ASCII.

use serde::{Deserialize, Serialize};

/// The two builtin faces the pattern uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontStyle {
    Regular,
    Bold,
}

const FIRST_CHAR: u32 = 32;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

fn advance(ch: char, style: FontStyle) -> u16 {
    let table = match style {
        FontStyle::Regular => &HELVETICA,
        FontStyle::Bold => &HELVETICA_BOLD,
    };
    let code = ch as u32;
    match code.checked_sub(FIRST_CHAR) {
        Some(i) if (i as usize) < table.len() => table[i as usize],
        _ => match ch {
            '\u{00A9}' => 737, // copyright sign
            '\u{00A0}' => 278,
            _ => 556,
        },
    }
}

/// Width of `text` in points when set in `style` at `font_size` points.
pub fn text_width(text: &str, style: FontStyle, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(advance(c, style))).sum();
    units as f32 * font_size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_fixed_width() {
        let w = text_width("0123456789", FontStyle::Regular, 10.0);
        assert!((w - 55.6).abs() < 1e-3);
        assert_eq!(
            text_width("42", FontStyle::Bold, 8.0),
            text_width("42", FontStyle::Regular, 8.0)
        );
    }

    #[test]
    fn bold_is_wider_for_letters() {
        let regular = text_width("Page 1 of 3", FontStyle::Regular, 8.0);
        let bold = text_width("Page 1 of 3", FontStyle::Bold, 8.0);
        assert!(bold > regular);
    }

    #[test]
    fn non_ascii_falls_back() {
        let w = text_width("\u{00A9}", FontStyle::Regular, 10.0);
        assert!((w - 7.37).abs() < 1e-3);
        assert!(text_width("\u{4E2D}", FontStyle::Regular, 10.0) > 0.0);
    }
}
