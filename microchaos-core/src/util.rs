//! Small numeric helpers shared across the crate

/// Round to `places` decimal places.
pub(crate) fn round_dp(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Lower-middle median of an already ascending-sorted slice.
///
/// Uses the `floor(n/2)` index for both odd and even lengths, so an
/// even-length set yields an actually observed value rather than an
/// interpolated midpoint.
pub(crate) fn lower_median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted[sorted.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(0.123_456, 4), 0.1235);
        assert_eq!(round_dp(33.333_333, 1), 33.3);
        assert_eq!(round_dp(2.0, 2), 2.0);
    }

    #[test]
    fn test_lower_median_even_length() {
        assert_eq!(lower_median(&[1.0, 2.0, 3.0, 4.0]), 3.0);
    }

    #[test]
    fn test_lower_median_odd_length() {
        assert_eq!(lower_median(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_lower_median_empty() {
        assert_eq!(lower_median(&[]), 0.0);
    }
}
