//! Document formatter
//!
//! Pure functions turning ticket and receipt data into one ESC/POS string.
//! Output depends only on the input and the [`Layout`]; the clock is never
//! read, so identical input always yields byte-identical output.

mod locale;
mod receipt;
mod ticket;
mod types;

pub use locale::{CurrencyPosition, Locale};
pub use receipt::format_receipt;
pub use ticket::{format_station_ticket, format_ticket};
pub use types::{ReceiptData, TicketData, TicketItem};

use galley_printer::EscPosWriter;

/// Paper width and locale shared by every document
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Columns per line (32 for 58mm, 48 for 80mm)
    pub width: usize,
    pub locale: Locale,
}

impl Layout {
    pub fn new(width: usize, locale: Locale) -> Self {
        Self { width, locale }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(48, Locale::default())
    }
}

/// Reprint marker, centered and bold
fn reprint_banner(w: &mut EscPosWriter, reprint_count: u32) {
    if reprint_count == 0 {
        return;
    }
    w.newline()
        .align_center()
        .bold_on()
        .line(&format!("*** REPRINT #{} ***", reprint_count))
        .bold_off()
        .align_left();
}

/// Feed past the tear bar and cut
fn finish_page(mut w: EscPosWriter) -> String {
    w.feed(3).cut();
    w.finish()
}
