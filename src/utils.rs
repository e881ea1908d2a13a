// Utility functions

/// Formats a price for display. Zero means "no listing".
pub fn format_price(amount: f64, currency: &str) -> String {
    if amount <= 0.0 {
        "n/a".to_string()
    } else {
        format!("{:.2} {}", amount, currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_prices() {
        assert_eq!(format_price(12.5, "EUR"), "12.50 EUR");
        assert_eq!(format_price(0.0, "USD"), "n/a");
    }
}
