//! Published power spectrum

/// One power-spectrum update
///
/// `power.len() == bin_count == N/2 + 1`; each value is
/// `|X[i]|² / (N/2 + 1)²`.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Sample rate in Hz of the analyzed stream
    pub sample_rate: u32,

    /// Analysis window size N the bins were computed from
    pub fft_size: usize,

    /// Number of frequency bins
    pub bin_count: usize,

    /// Normalized power per bin, DC first
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    /// Centre frequency of `bin` in Hz
    pub fn frequency_hz(&self, bin: usize) -> f64 {
        let n = self.fft_size.max(1);
        bin as f64 * self.sample_rate as f64 / n as f64
    }

    /// Frequency axis in Hz, one entry per bin
    pub fn frequencies_hz(&self) -> Vec<f64> {
        (0..self.bin_count).map(|bin| self.frequency_hz(bin)).collect()
    }

    /// Index and value of the strongest bin
    pub fn peak_bin(&self) -> Option<(usize, f64)> {
        self.power
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((i, p)),
            })
    }

    /// Power of `bin` in dB, `None` past the last bin
    pub fn db(&self, bin: usize) -> Option<f64> {
        self.power.get(bin).copied().map(power_to_db)
    }

    /// Power in dB: 10*log10(p)
    pub fn to_db(&self) -> Vec<f64> {
        self.power.iter().copied().map(power_to_db).collect()
    }
}

/// Silent bins floor at -200 dB
const POWER_FLOOR: f64 = 1e-20;

fn power_to_db(power: f64) -> f64 {
    10.0 * power.max(POWER_FLOOR).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(power: Vec<f64>) -> PowerSpectrum {
        PowerSpectrum {
            sample_rate: 48000,
            fft_size: 2 * power.len().saturating_sub(1),
            bin_count: power.len(),
            power,
        }
    }

    #[test]
    fn test_frequency_axis() {
        let s = spectrum(vec![0.0; 513]);
        assert_eq!(s.fft_size, 1024);
        assert_eq!(s.frequency_hz(0), 0.0);
        assert!((s.frequency_hz(512) - 24000.0).abs() < 1e-9);
        assert_eq!(s.frequencies_hz().len(), 513);
    }

    #[test]
    fn test_frequency_axis_odd_window() {
        let s = PowerSpectrum {
            sample_rate: 48000,
            fft_size: 1023,
            bin_count: 512,
            power: vec![0.0; 512],
        };
        let expected = 511.0 * 48000.0 / 1023.0;
        assert!((s.frequency_hz(511) - expected).abs() < 1e-9);
        assert!(s.frequency_hz(511) < 24000.0);
    }

    #[test]
    fn test_peak_bin() {
        let s = spectrum(vec![0.1, 0.5, 2.0, 0.3]);
        assert_eq!(s.peak_bin(), Some((2, 2.0)));
        assert_eq!(spectrum(Vec::new()).peak_bin(), None);
    }

    #[test]
    fn test_to_db() {
        let s = spectrum(vec![1.0, 0.01, 0.0]);
        let db = s.to_db();
        assert!(db[0].abs() < 1e-12);
        assert!((db[1] + 20.0).abs() < 1e-9);
        assert!((db[2] + 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_db_single_bin() {
        let s = spectrum(vec![1.0, 0.01, 0.0]);
        assert_eq!(s.db(0), Some(s.to_db()[0]));
        assert!((s.db(1).unwrap() + 20.0).abs() < 1e-9);
        assert!((s.db(2).unwrap() + 200.0).abs() < 1e-9);
        assert_eq!(s.db(3), None);
    }
}
