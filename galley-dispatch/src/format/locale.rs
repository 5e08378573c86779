//! Locale-sensitive money and date rendering

use std::fmt::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::{Decimal, RoundingStrategy};

/// Where the currency symbol goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyPosition {
    /// `$12.50`
    Prefix,
    /// `12,50 €`
    Suffix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Locale {
    pub currency_symbol: String,
    pub currency_position: CurrencyPosition,
    pub decimal_separator: char,
    pub thousands_separator: Option<char>,
    /// chrono format string
    pub date_format: String,
    pub timezone: Tz,
}

impl Locale {
    pub fn en_us(timezone: Tz) -> Self {
        Self {
            currency_symbol: "$".into(),
            currency_position: CurrencyPosition::Prefix,
            decimal_separator: '.',
            thousands_separator: Some(','),
            date_format: "%m/%d/%Y %I:%M %p".into(),
            timezone,
        }
    }

    pub fn es_es(timezone: Tz) -> Self {
        Self {
            currency_symbol: "€".into(),
            currency_position: CurrencyPosition::Suffix,
            decimal_separator: ',',
            thousands_separator: Some('.'),
            date_format: "%d/%m/%Y %H:%M".into(),
            timezone,
        }
    }

    /// Amount rounded half away from zero to 2 places, with symbol
    pub fn format_money(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        let digits = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut number = group_thousands(int_part, self.thousands_separator);
        number.push(self.decimal_separator);
        number.push_str(frac_part);

        match self.currency_position {
            CurrencyPosition::Prefix => format!("{}{}{}", sign, self.currency_symbol, number),
            CurrencyPosition::Suffix => format!("{}{} {}", sign, number, self.currency_symbol),
        }
    }

    /// Timestamp in the locale's timezone and date format
    ///
    /// An unusable `date_format` falls back to RFC 3339.
    pub fn format_datetime(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&self.timezone);
        let mut out = String::new();
        if write!(out, "{}", local.format(&self.date_format)).is_err() {
            return local.to_rfc3339();
        }
        out
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::en_us(chrono_tz::UTC)
    }
}

fn group_thousands(digits: &str, separator: Option<char>) -> String {
    let Some(sep) = separator else {
        return digits.to_string();
    };

    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_money_en_us() {
        let locale = Locale::default();
        assert_eq!(locale.format_money(dec("1234.5")), "$1,234.50");
        assert_eq!(locale.format_money(dec("0")), "$0.00");
        assert_eq!(locale.format_money(dec("999")), "$999.00");
        assert_eq!(locale.format_money(dec("1234567.891")), "$1,234,567.89");
    }

    #[test]
    fn test_money_es_es() {
        let locale = Locale::es_es(chrono_tz::Europe::Madrid);
        assert_eq!(locale.format_money(dec("1234.5")), "1.234,50 €");
        assert_eq!(locale.format_money(dec("12.5")), "12,50 €");
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let locale = Locale::default();
        assert_eq!(locale.format_money(dec("2.345")), "$2.35");
        assert_eq!(locale.format_money(dec("2.344")), "$2.34");
        assert_eq!(locale.format_money(dec("-2.345")), "-$2.35");
        assert_eq!(locale.format_money(dec("-0.001")), "$0.00");
    }

    #[test]
    fn test_datetime_uses_timezone() {
        let at = Utc.with_ymd_and_hms(2024, 1, 22, 14, 32, 15).unwrap();

        assert_eq!(Locale::default().format_datetime(at), "01/22/2024 02:32 PM");
        assert_eq!(
            Locale::es_es(chrono_tz::Europe::Madrid).format_datetime(at),
            "22/01/2024 15:32"
        );
    }

    #[test]
    fn test_invalid_date_format_falls_back() {
        let at = Utc.with_ymd_and_hms(2024, 1, 22, 14, 32, 15).unwrap();
        let locale = Locale {
            date_format: "%Q %d".into(),
            ..Locale::es_es(chrono_tz::Europe::Madrid)
        };

        assert_eq!(locale.format_datetime(at), "2024-01-22T15:32:15+01:00");
    }
}
