//! Python bindings for the spectrum analyzer

use crate::config::SpectrumConfig;
use crate::host::{DispatchThread, IdleDispatcher, Subscription};
use crate::plugin::{Plugin, PowerSource};
use crate::spectrum::{PowerSpectrum, SpectrumAnalyzer};
use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::{Arc, Mutex};

/// Spectrum analyzer exposed to Python
///
/// Owns its own idle dispatch thread; Python polls the latest spectrum.
#[pyclass(name = "SpectrumAnalyzer", unsendable)]
pub struct PySpectrumAnalyzer {
    // Field order matters: the analyzer must drop before its dispatcher thread
    _subscription: Subscription,
    analyzer: SpectrumAnalyzer,
    _dispatch: DispatchThread,
    latest: Arc<Mutex<Option<PowerSpectrum>>>,
}

fn contiguous<'a>(array: &'a PyReadonlyArray1<f32>) -> PyResult<&'a [f32]> {
    array
        .as_slice()
        .map_err(|e| PyErr::new::<PyValueError, _>(e.to_string()))
}

#[pymethods]
impl PySpectrumAnalyzer {
    /// Create a new spectrum analyzer
    ///
    /// Args:
    ///     n_bands: Analysis window size (number of samples)
    ///     sample_rate: Sample rate in Hz
    #[new]
    #[pyo3(signature = (n_bands=8192, sample_rate=48000))]
    fn new(n_bands: usize, sample_rate: u32) -> PyResult<Self> {
        let config = SpectrumConfig {
            n_bands,
            max_block_size: n_bands,
            sample_rate,
            ..SpectrumConfig::default()
        };

        let (dispatcher, dispatch) = IdleDispatcher::spawn(config.dispatch_queue_capacity)
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;

        let analyzer = SpectrumAnalyzer::new(&config, dispatcher)
            .map_err(|e| PyErr::new::<PyValueError, _>(e.to_string()))?;

        let latest = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&latest);
        let subscription = analyzer.subscribe_power(move |spectrum| {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(spectrum.clone());
            }
        });

        Ok(Self {
            _subscription: subscription,
            analyzer,
            _dispatch: dispatch,
            latest,
        })
    }

    /// Process one stereo block
    ///
    /// Returns:
    ///     Tuple of (left_out, right_out), identical to the input
    fn process<'py>(
        &self,
        py: Python<'py>,
        left: PyReadonlyArray1<f32>,
        right: PyReadonlyArray1<f32>,
    ) -> PyResult<(&'py PyArray1<f32>, &'py PyArray1<f32>)> {
        let left = contiguous(&left)?;
        let right = contiguous(&right)?;

        if left.len() != right.len() {
            return Err(PyErr::new::<PyValueError, _>("left and right must have equal length"));
        }

        let mut left_out = vec![0.0; left.len()];
        let mut right_out = vec![0.0; right.len()];
        self.analyzer.process(left, right, &mut left_out, &mut right_out);

        Ok((PyArray1::from_vec(py, left_out), PyArray1::from_vec(py, right_out)))
    }

    /// Reset history for a new stream
    fn setup(&self, sample_rate: u32) {
        self.analyzer.setup(sample_rate);
    }

    fn set_bypass(&self, bypass: bool) {
        self.analyzer.set_bypass(bypass);
    }

    fn set_post_messages(&self, enabled: bool) {
        self.analyzer.set_post_messages(enabled);
    }

    /// Get latency in seconds (always 0.0)
    fn get_latency(&self) -> f32 {
        self.analyzer.latency_seconds()
    }

    /// Get number of frequency bins
    fn num_bins(&self) -> usize {
        self.analyzer.num_bins()
    }

    /// Take the most recent spectrum
    ///
    /// Returns:
    ///     Tuple of (sample_rate, bin_count, power) or None if nothing new
    fn latest_spectrum<'py>(&self, py: Python<'py>) -> Option<(u32, usize, &'py PyArray1<f64>)> {
        let spectrum = self.latest.lock().ok()?.take()?;
        Some((
            spectrum.sample_rate,
            spectrum.bin_count,
            PyArray1::from_vec(py, spectrum.power),
        ))
    }
}
