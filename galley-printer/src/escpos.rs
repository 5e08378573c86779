//! String-based ESC/POS document writer
//!
//! Accumulates human-readable text interleaved with control sequences into a
//! single UTF-8 `String`. The bridge agent is responsible for the final
//! device encoding.

use crate::cmd;
use crate::width::{Align, pad_to_width, text_width};

/// Largest QR payload that keeps the `GS ( k` length bytes below 0x80.
pub const QR_MAX_DATA_LEN: usize = 124;

/// ESC/POS document writer
///
/// Common widths:
/// - 58mm paper: 32 columns
/// - 80mm paper: 48 columns
#[derive(Debug, Clone)]
pub struct EscPosWriter {
    buf: String,
    width: usize,
}

impl EscPosWriter {
    /// Create a new writer with the paper width in columns
    pub fn new(width: usize) -> Self {
        Self {
            buf: String::with_capacity(1024),
            width,
        }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Printer Control ===

    /// Reset the printer to its power-on state (ESC @)
    pub fn initialize(&mut self) -> &mut Self {
        self.buf.push_str(cmd::INIT);
        self
    }

    /// Feed `lines` lines (ESC d n)
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.push_str(&cmd::feed(lines));
        self
    }

    /// Full paper cut (GS V 0)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.push_str(cmd::CUT_FULL);
        self
    }

    /// Partial paper cut (GS V 1)
    pub fn cut_partial(&mut self) -> &mut Self {
        self.buf.push_str(cmd::CUT_PARTIAL);
        self
    }

    /// Pulse the cash drawer on pin 2
    pub fn open_drawer(&mut self) -> &mut Self {
        self.buf.push_str(cmd::DRAWER_KICK_PIN2);
        self
    }

    // === Text Output ===

    /// Write raw text
    pub fn write(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self.buf.push('\n');
        self
    }

    /// Write an empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    // === Alignment ===

    pub fn align_left(&mut self) -> &mut Self {
        self.buf.push_str(cmd::ALIGN_LEFT);
        self
    }

    pub fn align_center(&mut self) -> &mut Self {
        self.buf.push_str(cmd::ALIGN_CENTER);
        self
    }

    pub fn align_right(&mut self) -> &mut Self {
        self.buf.push_str(cmd::ALIGN_RIGHT);
        self
    }

    // === Text Style ===

    pub fn bold_on(&mut self) -> &mut Self {
        self.buf.push_str(cmd::BOLD_ON);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.push_str(cmd::BOLD_OFF);
        self
    }

    /// Double width and height
    pub fn size_double(&mut self) -> &mut Self {
        self.buf.push_str(cmd::SIZE_DOUBLE);
        self
    }

    /// Double height only
    pub fn size_double_height(&mut self) -> &mut Self {
        self.buf.push_str(cmd::SIZE_DOUBLE_HEIGHT);
        self
    }

    /// Reset to normal size
    pub fn size_normal(&mut self) -> &mut Self {
        self.buf.push_str(cmd::SIZE_NORMAL);
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn eq_sep(&mut self) -> &mut Self {
        let sep = "=".repeat(self.width);
        self.line(&sep)
    }

    /// Print a line of '-' characters
    pub fn dash_sep(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    // === Layout Helpers ===

    /// Print a centered line, then restore left alignment
    pub fn text_center(&mut self, s: &str) -> &mut Self {
        self.align_center();
        self.line(s);
        self.align_left()
    }

    /// Print left and right text on the same line
    ///
    /// Falls back to a single space separator when both don't fit.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            self.line(&format!("{} {}", left, right))
        } else {
            let spaces = self.width - lw - rw;
            self.write(left);
            self.write(&" ".repeat(spaces));
            self.line(right)
        }
    }

    /// Print a row of fixed-width columns separated by one space
    ///
    /// Cells wider than their column are truncated.
    pub fn columns(&mut self, cells: &[(&str, usize, Align)]) -> &mut Self {
        let row: Vec<String> = cells
            .iter()
            .map(|(text, width, align)| pad_to_width(text, *width, *align))
            .collect();
        let joined = row.join(" ");
        self.line(joined.trim_end())
    }

    // === QR Code ===

    /// Print a QR code (model 2, error correction L)
    ///
    /// Module size is clamped to 1-16 dots. Payloads longer than
    /// [`QR_MAX_DATA_LEN`] bytes or containing non-ASCII text are skipped.
    pub fn qr_code(&mut self, data: &str, size: u8) -> &mut Self {
        if data.is_empty() || data.len() > QR_MAX_DATA_LEN || !data.is_ascii() {
            return self;
        }
        let size = size.clamp(1, 16);

        // Function 165: select model 2
        self.buf.push_str("\x1D\x28\x6B\x04\x00\x31\x41\x32\x00");
        // Function 167: module size
        self.buf.push_str("\x1D\x28\x6B\x03\x00\x31\x43");
        self.buf.push(char::from(size));
        // Function 169: error correction L
        self.buf.push_str("\x1D\x28\x6B\x03\x00\x31\x45\x30");
        // Function 180: store data
        let p_l = (data.len() + 3) as u8;
        self.buf.push_str("\x1D\x28\x6B");
        self.buf.push(char::from(p_l));
        self.buf.push_str("\x00\x31\x50\x30");
        self.buf.push_str(data);
        // Function 181: print
        self.buf.push_str("\x1D\x28\x6B\x03\x00\x31\x51\x30");
        self
    }

    // === Build ===

    /// Current contents
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Finalize and return the accumulated document
    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for EscPosWriter {
    fn default() -> Self {
        Self::new(48)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_basic() {
        let mut w = EscPosWriter::new(32);
        w.initialize()
            .align_center()
            .size_double()
            .line("TITLE")
            .size_normal()
            .align_left()
            .line("body");

        let out = w.finish();
        assert!(out.starts_with(cmd::INIT));
        assert!(out.contains("TITLE\n"));
        assert!(out.ends_with("body\n"));
    }

    #[test]
    fn test_line_lr() {
        let mut w = EscPosWriter::new(20);
        w.line_lr("Burger", "9.50");

        assert_eq!(w.as_str(), "Burger          9.50\n");
        assert_eq!(w.as_str().len(), 21);
    }

    #[test]
    fn test_line_lr_overflow() {
        let mut w = EscPosWriter::new(10);
        w.line_lr("Cheeseburger", "12.00");

        assert_eq!(w.as_str(), "Cheeseburger 12.00\n");
    }

    #[test]
    fn test_line_lr_cjk_width() {
        let mut w = EscPosWriter::new(10);
        w.line_lr("左", "右");

        // 2 + 2 columns of text, 6 spaces
        assert_eq!(w.as_str(), "左      右\n");
    }

    #[test]
    fn test_separators() {
        let mut w = EscPosWriter::new(10);
        w.eq_sep().dash_sep();

        assert_eq!(w.as_str(), "==========\n----------\n");
    }

    #[test]
    fn test_columns() {
        let mut w = EscPosWriter::new(20);
        w.columns(&[("2", 3, Align::Right), ("Fries", 8, Align::Left), ("4.00", 7, Align::Right)]);

        assert_eq!(w.as_str(), "  2 Fries       4.00\n");
    }

    #[test]
    fn test_qr_code_lengths() {
        let mut w = EscPosWriter::new(48);
        w.qr_code("ABC", 4);

        let bytes = w.as_str().as_bytes();
        // store-data header carries len + 3 = 6
        let store = [0x1D, 0x28, 0x6B, 0x06, 0x00, 0x31, 0x50, 0x30];
        assert!(bytes.windows(store.len()).any(|win| win == store));
        assert!(w.as_str().is_ascii());
    }

    #[test]
    fn test_qr_code_skips_oversized() {
        let mut w = EscPosWriter::new(48);
        w.qr_code(&"x".repeat(QR_MAX_DATA_LEN + 1), 4);

        assert!(w.as_str().is_empty());
    }

    #[test]
    fn test_cut_and_feed() {
        let mut w = EscPosWriter::new(48);
        w.feed(3).cut();

        assert_eq!(w.as_str().as_bytes(), &[0x1B, 0x64, 0x03, 0x1D, 0x56, 0x00]);
    }
}
