//! Effects Host Core - Real-Time Plugin Contract and Spectrum Analyzer
//!
//! Per-block processing interface for audio effects, with an FFT power
//! spectrum analyzer that publishes results off the real-time thread.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod config;
pub mod error;
pub mod host;
pub mod plugin;
pub mod spectrum;
#[cfg(feature = "python")]
pub mod python_bindings;

pub use config::{SettingKey, SettingsStore, SpectrumConfig};
pub use error::{ConfigError, SpectrumError};
pub use host::{IdleDispatcher, Subscription};
pub use plugin::{Plugin, PowerSource};
pub use spectrum::{PowerSpectrum, SpectrumAnalyzer};
