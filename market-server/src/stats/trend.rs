//! Period-over-period change

use crate::utils::money::round2;

/// Percentage change from `previous` to `current`, rounded to 2 decimals.
///
/// With no previous value the change is 100 when anything happened in the
/// current period, otherwise 0.
pub fn calculate_trend(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    round2((current - previous) / previous * 100.0)
}
