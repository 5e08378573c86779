//! Printer column width utilities
//!
//! Receipt printers lay text out on a fixed grid where CJK glyphs take two
//! columns and Latin glyphs take one. Outside the alphabetic blocks the GBK
//! byte length of a glyph matches that grid, so wide scripts are measured
//! through the GBK encoder.

/// Horizontal alignment inside a fixed-width cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Get the printer column width of a string
pub fn text_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn char_width(c: char) -> usize {
    // Latin, Greek, Cyrillic and friends are single-column even where GBK
    // carries a double-byte form (pinyin vowels, Cyrillic).
    if (c as u32) < 0x1100 {
        return 1;
    }
    let mut tmp = [0u8; 4];
    let (cow, _, had_errors) = encoding_rs::GBK.encode(c.encode_utf8(&mut tmp));
    // Unmappable characters come back as numeric references; printers
    // render them as a single replacement glyph.
    if had_errors { 1 } else { cow.len() }
}

/// Truncate a string to fit within a column width
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Pad a string to an exact column width
///
/// Longer strings are truncated.
pub fn pad_to_width(s: &str, width: usize, align: Align) -> String {
    let current = text_width(s);
    if current >= width {
        let truncated = truncate_to_width(s, width);
        // A wide glyph may leave one column unfilled
        let fill = width - text_width(&truncated);
        return match align {
            Align::Left => format!("{}{}", truncated, " ".repeat(fill)),
            Align::Right => format!("{}{}", " ".repeat(fill), truncated),
        };
    }
    let spaces = width - current;
    match align {
        Align::Left => format!("{}{}", s, " ".repeat(spaces)),
        Align::Right => format!("{}{}", " ".repeat(spaces), s),
    }
}
