//! Raw ESC/POS control sequences.
//!
//! Every sequence here is plain 7-bit ASCII, so a document built from them
//! survives a UTF-8 text payload byte-for-byte.

/// ESC @ - initialize printer
pub const INIT: &str = "\x1B\x40";

/// ESC a 0 - left alignment
pub const ALIGN_LEFT: &str = "\x1B\x61\x00";
/// ESC a 1 - center alignment
pub const ALIGN_CENTER: &str = "\x1B\x61\x01";
/// ESC a 2 - right alignment
pub const ALIGN_RIGHT: &str = "\x1B\x61\x02";

/// ESC E 1 - emphasized on
pub const BOLD_ON: &str = "\x1B\x45\x01";
/// ESC E 0 - emphasized off
pub const BOLD_OFF: &str = "\x1B\x45\x00";

/// GS ! 0x11 - double width and height
pub const SIZE_DOUBLE: &str = "\x1D\x21\x11";
/// GS ! 0x01 - double height only
pub const SIZE_DOUBLE_HEIGHT: &str = "\x1D\x21\x01";
/// GS ! 0x10 - double width only
pub const SIZE_DOUBLE_WIDTH: &str = "\x1D\x21\x10";
/// GS ! 0 - normal size
pub const SIZE_NORMAL: &str = "\x1D\x21\x00";

/// GS V 0 - full cut
pub const CUT_FULL: &str = "\x1D\x56\x00";
/// GS V 1 - partial cut
pub const CUT_PARTIAL: &str = "\x1D\x56\x01";

/// ESC p 0 25 120 - drawer kick on connector pin 2.
///
/// Pulse timings stay below 0x80.
pub const DRAWER_KICK_PIN2: &str = "\x1B\x70\x00\x19\x78";
/// ESC p 1 25 120 - drawer kick on connector pin 5
pub const DRAWER_KICK_PIN5: &str = "\x1B\x70\x01\x19\x78";

/// ESC d n - print and feed `n` lines
pub fn feed(lines: u8) -> String {
    let n = lines.min(0x7F);
    format!("\x1B\x64{}", char::from(n))
}
