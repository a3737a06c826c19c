//! Percentage rounding shared by every progress figure.
//!
//! All percentages round half up to the nearest integer, once, at the end of
//! the computation.

/// `round(100 * part / whole)` computed in integers; 0 when `whole` is 0.
pub fn ratio_percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = u128::from(part);
    let whole = u128::from(whole);
    let rounded = (200 * part + whole) / (2 * whole);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Rounds an already-averaged ratio (1.0 = 100%) to a whole percentage.
pub fn round_percent(ratio: f64) -> u32 {
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    (ratio * 100.0 + 0.5).floor() as u32
}
