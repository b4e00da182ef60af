//! Deterministic float helpers.
//!
//! - A deterministic float ordering (`stable_total_cmp_f64`, `StableF64`) for
//!   sorting and keys.
//! - Grid quantization used by content hashing.

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// A float wrapper with a deterministic total ordering.
#[derive(Debug, Copy, Clone, Default)]
pub struct StableF64(pub f64);

impl PartialEq for StableF64 {
    fn eq(&self, other: &Self) -> bool {
        stable_total_cmp_f64(self.0, other.0) == Ordering::Equal
    }
}

impl Eq for StableF64 {}

impl PartialOrd for StableF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StableF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        stable_total_cmp_f64(self.0, other.0)
    }
}

/// Median of `values` under the stable ordering (upper median for even counts).
pub fn stable_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| stable_total_cmp_f64(*a, *b));
    Some(sorted[sorted.len() / 2])
}

/// Round `v` onto a grid with `decimals` decimal places, as an integer.
///
/// `-0.0` and `+0.0` quantize identically.
pub fn quantize(v: f64, decimals: u32) -> i64 {
    let scale = 10f64.powi(decimals as i32);
    let q = (canonical_f64(v) * scale).round();
    if q == 0.0 { 0 } else { q as i64 }
}

/// Inverse of [`quantize`]: the grid value `q` stands for.
pub fn dequantize(q: i64, decimals: u32) -> f64 {
    q as f64 / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::{StableF64, canonical_f64, dequantize, quantize, stable_median, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(canonical_f64(0.0), 0.0);
    }

    #[test]
    fn stable_cmp_is_total_and_deterministic() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
        assert!(StableF64(f64::NAN) == StableF64(f64::NAN));
    }

    #[test]
    fn median_picks_middle_value() {
        assert_eq!(stable_median(&[]), None);
        assert_eq!(stable_median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(stable_median(&[4.0, 1.0, 3.0, 2.0]), Some(3.0));
    }

    #[test]
    fn quantize_rounds_to_nearest_grid_step() {
        assert_eq!(quantize(12.34567, 4), 123457);
        assert_eq!(quantize(-0.00004, 4), 0);
        assert_eq!(quantize(0.00006, 4), 1);
        assert_eq!(quantize(-10.0, 4), -100000);
        assert_eq!(dequantize(quantize(-10.0, 4), 4), -10.0);
        assert_eq!(dequantize(123457, 4), 12.3457);
    }
}
