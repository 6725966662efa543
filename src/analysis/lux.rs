//! Brightness to lux mapping.
//!
//! Camera brightness grows roughly with the logarithm of illuminance, so
//! between two calibration points the lux value is interpolated on a log10
//! scale rather than linearly:
//!
//! ```text
//! lux = L_low + 10 ^ ((b - V_low) / (V_high - V_low) * log10(L_high - L_low))
//! ```
//!
//! Outside the table the value is clamped to the nearest end point.

use crate::config::CalibrationTable;

/// Estimates lux for a mean `brightness` using `table`.
pub fn estimate_lux(brightness: f64, table: &CalibrationTable) -> u64 {
    let points = table.points();

    let Some(index) = points
        .iter()
        .position(|p| f64::from(p.brightness) <= brightness)
    else {
        // Darker than every bucket
        let lowest = &points[points.len() - 1];
        tracing::debug!(brightness, lux = lowest.lux, name = %lowest.label, "Below lowest bucket");
        return lowest.lux;
    };

    let low = &points[index];
    if index == 0 || brightness == f64::from(low.brightness) || low.lux >= points[index - 1].lux {
        tracing::debug!(brightness, lux = low.lux, name = %low.label, "Matched bucket");
        return low.lux;
    }

    let high = &points[index - 1];
    let (v_low, v_high) = (f64::from(low.brightness), f64::from(high.brightness));
    let span = (high.lux - low.lux) as f64;
    let fraction = (brightness - v_low) / (v_high - v_low);
    let interpolated = low.lux as f64 + 10f64.powf(fraction * span.log10());

    tracing::debug!(
        brightness,
        low = %low.label,
        high = %high.label,
        lux = interpolated,
        "log10 interpolated"
    );

    // fraction is in (0, 1) so the result lies in (L_low, L_high]
    interpolated.round_ties_even() as u64
}
