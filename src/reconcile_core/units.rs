//! Fixed-point hour units
//!
//! Every quantity inside the core is an integer count of 1/10^8 hour. Input
//! floats are converted exactly once, in `hours_to_units`.

/// Smallest representable increment is 1/UNITS_PER_HOUR of an hour.
pub const UNITS_PER_HOUR: i64 = 100_000_000;

const DECIMALS: usize = 8;

/// Convert an hours value to fixed-point units.
///
/// Non-finite values, and values too large to represent, convert to zero so a
/// single malformed row cannot abort a run.
pub fn hours_to_units(hours: f64) -> i64 {
    if !hours.is_finite() {
        return 0;
    }

    let scaled = (hours * UNITS_PER_HOUR as f64).round();
    if scaled.abs() >= i64::MAX as f64 {
        return 0;
    }

    scaled as i64
}

/// Approximate hours for display purposes only.
pub fn units_to_hours(units: i64) -> f64 {
    units as f64 / UNITS_PER_HOUR as f64
}

/// Render units as a decimal string, trailing zeros trimmed ("-60.25", "7").
pub fn format_units(units: i64) -> String {
    let sign = if units < 0 { "-" } else { "" };
    format!("{}{}", sign, format_total_units(units.unsigned_abs() as u128))
}

/// Render an unsigned run-level total, which may exceed `i64`.
pub fn format_total_units(units: u128) -> String {
    let per_hour = UNITS_PER_HOUR as u128;
    let whole = units / per_hour;
    let frac = units % per_hour;

    if frac == 0 {
        return whole.to_string();
    }

    let frac_str = format!("{:0width$}", frac, width = DECIMALS);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
