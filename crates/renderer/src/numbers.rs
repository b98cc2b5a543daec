//! Magnitude-adaptive number formatting for legend labels and hover text.
//!
//! Precision grows as magnitude shrinks, so small emission rates never
//! collapse to "0.00" and large totals never show long decimal tails:
//!
//! | magnitude        | format                              |
//! |------------------|-------------------------------------|
//! | exactly zero     | `0`                                 |
//! | `>= 1000`        | integer with thousands separators   |
//! | `>= 100`         | integer                             |
//! | `>= 1`           | 2 decimals                          |
//! | `>= 0.01`        | 3 decimals                          |
//! | smaller          | scientific, 2 decimals (`1.23e-10`) |
//! | NaN / infinite   | `no data`                           |

/// Text shown wherever a value is missing.
pub const NO_DATA: &str = "no data";

/// Format a value for display.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return NO_DATA.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Bands are chosen on the rounded text so 99.996 reads "100", not "100.00".
    let scientific = format!("{:.2e}", value);
    if below(&scientific, 0.01) {
        return scientific;
    }
    let fraction = format!("{:.3}", value);
    if below(&fraction, 1.0) {
        return fraction;
    }
    let units = format!("{:.2}", value);
    if below(&units, 100.0) {
        return units;
    }
    let integer = format!("{:.0}", value);
    if below(&integer, 1000.0) {
        return integer;
    }
    group_thousands(value)
}

fn below(text: &str, limit: f64) -> bool {
    text.parse::<f64>().map_or(false, |v| v.abs() < limit)
}

/// Format an f32 cell value.
pub fn format_cell(value: f32) -> String {
    format_value(value as f64)
}

fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(-0.0), "0");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(format_value(1234.4), "1,234");
        assert_eq!(format_value(1234567.0), "1,234,567");
        assert_eq!(format_value(-98765.5), "-98,766");
        assert_eq!(format_value(1000.0), "1,000");
    }

    #[test]
    fn test_hundreds() {
        assert_eq!(format_value(123.4), "123");
        assert_eq!(format_value(-250.0), "-250");
    }

    #[test]
    fn test_units() {
        assert_eq!(format_value(12.346), "12.35");
        assert_eq!(format_value(1.0), "1.00");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(format_value(0.5), "0.500");
        assert_eq!(format_value(0.0123), "0.012");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(format_value(1.234e-10), "1.23e-10");
        assert_eq!(format_value(0.005), "5.00e-3");
    }

    #[test]
    fn test_band_follows_rounded_value() {
        assert_eq!(format_value(99.996), "100");
        assert_eq!(format_value(999.6), "1,000");
        assert_eq!(format_value(-999.6), "-1,000");
        assert_eq!(format_value(0.9996), "1.00");
        assert_eq!(format_value(0.0099996), "0.010");
        assert_eq!(format_value(99.994), "99.99");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_value(f64::NAN), NO_DATA);
        assert_eq!(format_value(f64::INFINITY), NO_DATA);
        assert_eq!(format_cell(f32::NAN), NO_DATA);
    }
}
