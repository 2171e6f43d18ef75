/// Normalize an optional identifier coming from a form control or the wire.
/// Blank and whitespace-only values mean "nothing selected".
pub fn normalize_id(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Format a naira amount for display, e.g. `13000.0` -> `"₦13,000.00"`.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    // Group the integer part in threes from the right
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}₦{}.{:02}", if negative { "-" } else { "" }, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(Some("LA")), Some("LA".to_string()));
        assert_eq!(normalize_id(Some("  OY ")), Some("OY".to_string()));
        assert_eq!(normalize_id(Some("")), None);
        assert_eq!(normalize_id(Some("   ")), None);
        assert_eq!(normalize_id(None), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(13000.0), "₦13,000.00");
        assert_eq!(format_amount(3000.5), "₦3,000.50");
        assert_eq!(format_amount(999.0), "₦999.00");
        assert_eq!(format_amount(1234567.891), "₦1,234,567.89");
        assert_eq!(format_amount(0.0), "₦0.00");
        assert_eq!(format_amount(-50.0), "-₦50.00");
    }
}
