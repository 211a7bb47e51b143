//! Analysis window for the spectrum analyzer
//!
//! Hann coefficients are computed once per analyzer and shared read-only.

use std::collections::TryReserveError;
use std::f32::consts::PI;
use std::sync::Arc;

/// Generate symmetric Hann window coefficients
///
/// w[n] = 0.5 * (1 - cos(2πn/(N-1))) for n = 0..N-1, zero at both ends.
///
/// # Arguments
/// * `length` - Number of samples (N), normally at least 2
pub fn hann_window(length: usize) -> Result<Arc<[f32]>, TryReserveError> {
    let mut window = Vec::new();
    window.try_reserve_exact(length)?;

    let m = length.saturating_sub(1).max(1) as f32;
    for n in 0..length {
        let angle = 2.0 * PI * n as f32 / m;
        window.push(0.5 * (1.0 - angle.cos()));
    }

    Ok(window.into())
}

/// Multiply `signal` by `window` into `out`
///
/// All three slices are expected to share the analysis length; extra
/// elements of the longer slices are left untouched.
pub fn apply_window(signal: &[f32], window: &[f32], out: &mut [f32]) {
    for ((o, &s), &w) in out.iter_mut().zip(signal).zip(window) {
        *o = s * w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_endpoints_are_zero() {
        for length in [2, 3, 16, 1023, 8192] {
            let window = hann_window(length).unwrap();
            assert_eq!(window.len(), length);
            assert!(window[0].abs() < 1e-6);
            assert!(window[length - 1].abs() < 1e-6);
        }
    }

    #[test]
    fn test_hann_peak_at_center() {
        for length in [3, 17, 1024, 8192] {
            let window = hann_window(length).unwrap();
            let center = window[(length - 1) / 2];
            assert!((center - 1.0).abs() < 1e-3, "center {center} for N={length}");
            assert!(window.iter().all(|&w| w <= 1.0 + 1e-6 && w >= 0.0));
        }
    }

    #[test]
    fn test_hann_is_symmetric() {
        let window = hann_window(161).unwrap();
        for n in 0..161 {
            assert!((window[n] - window[160 - n]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_apply_window() {
        let signal = vec![1.0; 100];
        let window = hann_window(100).unwrap();
        let mut out = vec![0.0; 100];

        apply_window(&signal, &window, &mut out);

        assert_eq!(&out[..], &window[..]);
        assert!(out[0] < 1e-6);
        assert!(out[50] > 0.99);
    }
}
