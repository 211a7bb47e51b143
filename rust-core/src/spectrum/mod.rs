//! Spectral analysis with FFT

pub mod analyzer;
pub mod fft;
pub mod history;
pub mod power;
pub mod windowing;

pub use analyzer::{SettingsBinding, SpectrumAnalyzer};
pub use fft::FftEngine;
pub use history::MonoHistory;
pub use power::PowerSpectrum;
pub use windowing::{apply_window, hann_window};
