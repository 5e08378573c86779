//! Input data for the document formatter

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Station that prepares this item
    #[serde(default)]
    pub station: Option<String>,
    /// Modifiers ("no onions", "medium rare")
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TicketItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
            station: None,
            options: Vec::new(),
            notes: None,
        }
    }

    pub fn at_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order ticket (kitchen, bar, general)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketData {
    pub order_number: String,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub server_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<TicketItem>,
    /// Order-level total as computed by the caller
    pub total: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    /// How many times this ticket was printed before
    #[serde(default)]
    pub reprint_count: u32,
}

impl TicketData {
    /// Items prepared at `station`
    pub fn items_for_station<'a>(&'a self, station: &'a str) -> impl Iterator<Item = &'a TicketItem> {
        self.items
            .iter()
            .filter(move |item| item.station.as_deref() == Some(station))
    }
}

/// Payment receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    pub business_name: String,
    #[serde(default)]
    pub address_lines: Vec<String>,
    pub order_number: String,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub server_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<TicketItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    #[serde(default)]
    pub tip: Option<Decimal>,
    pub total: Decimal,
    /// Label such as "Cash" or "Visa ****1234"
    pub payment_method: String,
    #[serde(default)]
    pub change_due: Option<Decimal>,
    /// Printed as a QR code (e.g. an e-receipt link)
    #[serde(default)]
    pub qr_data: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default)]
    pub reprint_count: u32,
}
