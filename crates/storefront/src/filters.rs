//! Custom Askama template filters.

use std::fmt::Display;

use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount in rupees with two decimals.
///
/// Usage in templates: `{{ item.selling_price|rupees }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn rupees(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_rupees(&value.to_string()))
}

fn format_rupees(raw: &str) -> String {
    raw.parse::<Decimal>()
        .map_or_else(|_| format!("₹{raw}"), |amount| format!("₹{:.2}", amount.round_dp(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rupees() {
        assert_eq!(format_rupees("199"), "₹199.00");
        assert_eq!(format_rupees("29.5"), "₹29.50");
        assert_eq!(format_rupees("n/a"), "₹n/a");
    }
}
