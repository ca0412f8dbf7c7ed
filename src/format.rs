//! Number formatting at the presentation boundary. Values reach this module
//! unrounded; currency rounds to 2 decimals and percentages to 1.

use chrono::NaiveDate;

pub const UNAVAILABLE: &str = "—";

pub fn count(value: usize) -> String {
    value.to_string()
}

/// `1234.5` -> `1.234,50€`.
pub fn currency(value: Option<f64>) -> String {
    let Some(value) = value else {
        return UNAVAILABLE.to_string();
    };
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{},{:02}€", group_thousands(cents / 100), cents % 100)
}

/// Fraction to percentage: `0.125` -> `12.5%`.
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{:.1}%", value * 100.0),
        _ => UNAVAILABLE.to_string(),
    }
}

pub fn delta(value: i64) -> String {
    match value.signum() {
        1 => format!("↑ +{value}"),
        -1 => format!("↓ {value}"),
        _ => "→ 0".to_string(),
    }
}

pub fn date(value: NaiveDate) -> String {
    value.format("%d/%m/%Y").to_string()
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    grouped
}
