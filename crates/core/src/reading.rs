// Numeric parsing for meter readings.
//
// Every "cell text -> number" conversion goes through here so blank and
// unparseable values default the same way everywhere.

/// Parse a reading. Blank, non-numeric and non-finite text yields None.
pub fn parse_reading(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a reading, treating anything unparseable as 0.0
pub fn reading_or_zero(text: &str) -> f64 {
    parse_reading(text).unwrap_or(0.0)
}

/// Format a reading for storage: integers without decimals
pub fn format_reading(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
