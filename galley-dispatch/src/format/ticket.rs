//! Order tickets: general and station-scoped

use galley_printer::EscPosWriter;

use super::types::{TicketData, TicketItem};
use super::{Layout, finish_page, reprint_banner};

/// General ticket: every item with options and notes, plus one total line
pub fn format_ticket(data: &TicketData, layout: &Layout) -> String {
    let mut w = EscPosWriter::new(layout.width);
    w.initialize();

    header(&mut w, data, layout, None);

    for item in &data.items {
        item_block(&mut w, item);
    }

    w.dash_sep();
    w.bold_on()
        .line_lr("TOTAL", &layout.locale.format_money(data.total))
        .bold_off();

    footer(&mut w, data);
    finish_page(w)
}

/// Station ticket: only items prepared at `station`, no pricing
///
/// Produces a header-only ticket when no item belongs to the station; callers
/// check [`TicketData::items_for_station`] to skip those.
pub fn format_station_ticket(data: &TicketData, station: &str, layout: &Layout) -> String {
    let mut w = EscPosWriter::new(layout.width);
    w.initialize();

    header(&mut w, data, layout, Some(station));

    for item in data.items_for_station(station) {
        item_block(&mut w, item);
    }

    w.dash_sep();
    footer(&mut w, data);
    finish_page(w)
}

fn header(w: &mut EscPosWriter, data: &TicketData, layout: &Layout, station: Option<&str>) {
    w.align_center().size_double().bold_on();
    match data.table_name.as_deref() {
        Some(table) => w.line(table),
        None => w.line("TAKEAWAY"),
    };
    w.size_normal().bold_off();

    if let Some(station) = station {
        w.bold_on()
            .line(&format!("[{}]", station.to_uppercase()))
            .bold_off();
    }

    w.line(&format!("Order #{}", data.order_number));
    w.line(&layout.locale.format_datetime(data.created_at));
    if let Some(server) = data.server_name.as_deref() {
        w.line(&format!("Server: {}", server));
    }

    w.align_left().eq_sep();
}

fn item_block(w: &mut EscPosWriter, item: &TicketItem) {
    w.size_double_height()
        .line(&format!("{} x {}", item.quantity, item.name))
        .size_normal();

    for option in &item.options {
        w.line(&format!("   - {}", option));
    }

    if let Some(notes) = item.notes.as_deref().filter(|n| !n.is_empty()) {
        w.bold_on().line(&format!("   * {}", notes)).bold_off();
    }
}

fn footer(w: &mut EscPosWriter, data: &TicketData) {
    if let Some(notes) = data.notes.as_deref().filter(|n| !n.is_empty()) {
        w.newline().bold_on().line(&format!("NOTE: {}", notes)).bold_off();
    }
    reprint_banner(w, data.reprint_count);
}
