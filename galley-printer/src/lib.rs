//! # galley-printer
//!
//! ESC/POS command layer for receipt and kitchen printers.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS control sequences (init, alignment, bold, size, feed, cut, drawer, QR)
//! - String-based document building with column layout helpers
//! - Printer column width calculation for mixed Latin/CJK text
//!
//! Business logic (WHAT to print, WHERE to send it) lives in `galley-dispatch`.
//!
//! ## Example
//!
//! ```
//! use galley_printer::EscPosWriter;
//!
//! let mut w = EscPosWriter::new(32);
//! w.initialize();
//! w.align_center().bold_on().line("KITCHEN").bold_off();
//! w.align_left().dash_sep();
//! w.line_lr("2x Burger", "T12");
//! w.feed(3).cut();
//!
//! let payload: String = w.finish();
//! assert!(payload.starts_with("\x1B@"));
//! ```

pub mod cmd;
mod escpos;
mod width;

pub use escpos::{EscPosWriter, QR_MAX_DATA_LEN};
pub use width::{Align, pad_to_width, text_width, truncate_to_width};
