//! Payment receipt

use galley_printer::EscPosWriter;

use super::types::ReceiptData;
use super::{Layout, finish_page, reprint_banner};

/// QR module size in dots
const QR_MODULE_SIZE: u8 = 6;

/// Payment receipt: priced lines, totals, payment method, optional QR code
pub fn format_receipt(data: &ReceiptData, layout: &Layout) -> String {
    let locale = &layout.locale;
    let mut w = EscPosWriter::new(layout.width);
    w.initialize();

    // Business header
    w.align_center()
        .size_double()
        .bold_on()
        .line(&data.business_name)
        .size_normal()
        .bold_off();
    for line in &data.address_lines {
        w.line(line);
    }
    w.align_left().eq_sep();

    // Order info
    w.line_lr(
        &format!("Order #{}", data.order_number),
        &locale.format_datetime(data.created_at),
    );
    if let Some(table) = data.table_name.as_deref() {
        w.line(&format!("Table: {}", table));
    }
    if let Some(server) = data.server_name.as_deref() {
        w.line(&format!("Server: {}", server));
    }
    w.dash_sep();

    // Items: name, then "qty x unit" against the line total
    for item in &data.items {
        let line_total = locale.format_money(item.line_total());
        if item.quantity == 1 {
            w.line_lr(&item.name, &line_total);
        } else {
            w.line(&item.name);
            w.line_lr(
                &format!("  {} x {}", item.quantity, locale.format_money(item.unit_price)),
                &line_total,
            );
        }
        for option in &item.options {
            w.line(&format!("   - {}", option));
        }
    }
    w.dash_sep();

    // Totals
    w.line_lr("Subtotal", &locale.format_money(data.subtotal));
    w.line_lr("Tax", &locale.format_money(data.tax));
    if let Some(tip) = data.tip {
        w.line_lr("Tip", &locale.format_money(tip));
    }
    w.eq_sep();
    w.bold_on()
        .size_double_height()
        .line_lr("TOTAL", &locale.format_money(data.total))
        .size_normal()
        .bold_off();

    w.line_lr("Paid by", &data.payment_method);
    if let Some(change) = data.change_due {
        w.line_lr("Change", &locale.format_money(change));
    }

    if let Some(qr) = data.qr_data.as_deref().filter(|q| !q.is_empty()) {
        w.newline()
            .align_center()
            .qr_code(qr, QR_MODULE_SIZE)
            .newline()
            .align_left();
    }

    if let Some(footer) = data.footer.as_deref() {
        w.newline().text_center(footer);
    }

    reprint_banner(&mut w, data.reprint_count);
    finish_page(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Locale, TicketItem};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn receipt() -> ReceiptData {
        ReceiptData {
            business_name: "Galley Bistro".into(),
            address_lines: vec!["1 Harbour St".into()],
            order_number: "1042".into(),
            table_name: Some("T7".into()),
            server_name: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 22, 14, 32, 15).unwrap(),
            items: vec![
                TicketItem::new("Burger", 2, Decimal::new(950, 2)),
                TicketItem::new("Mojito", 1, Decimal::new(800, 2)),
            ],
            subtotal: Decimal::new(2700, 2),
            tax: Decimal::new(270, 2),
            tip: None,
            total: Decimal::new(2970, 2),
            payment_method: "Cash".into(),
            change_due: Some(Decimal::new(30, 2)),
            qr_data: None,
            footer: Some("Thank you!".into()),
            reprint_count: 0,
        }
    }

    #[test]
    fn test_receipt_lines() {
        let out = format_receipt(&receipt(), &Layout::new(32, Locale::default()));

        assert!(out.contains("Burger\n"));
        assert!(out.contains(&format!("  2 x $9.50{}$19.00\n", " ".repeat(32 - 11 - 6))));
        assert!(out.contains(&format!("Mojito{}$8.00\n", " ".repeat(32 - 6 - 5))));
        assert!(out.contains("Subtotal"));
        assert!(out.contains("$2.70"));
        assert!(out.contains("$29.70"));
        assert!(out.contains("Paid by"));
        assert!(out.contains("$0.30"));
        assert!(!out.contains("Tip"));
        assert!(out.contains("Thank you!"));
    }

    #[test]
    fn test_receipt_is_deterministic() {
        let layout = Layout::default();
        assert_eq!(format_receipt(&receipt(), &layout), format_receipt(&receipt(), &layout));
    }

    #[test]
    fn test_receipt_qr_and_tip() {
        let mut data = receipt();
        data.tip = Some(Decimal::new(300, 2));
        data.qr_data = Some("https://galley.example/r/1042".into());

        let out = format_receipt(&data, &Layout::default());
        assert!(out.contains("Tip"));
        assert!(out.contains("\x1D\x28\x6B"));
        assert!(out.contains("https://galley.example/r/1042"));
    }

    #[test]
    fn test_receipt_locale() {
        let layout = Layout::new(48, Locale::es_es(chrono_tz::Europe::Madrid));
        let out = format_receipt(&receipt(), &layout);

        assert!(out.contains("29,70 €"));
        assert!(out.contains("22/01/2024 15:32"));
    }
}
