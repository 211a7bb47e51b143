//! FFT engine using realfft for real-valued signals
//!
//! The plan and every buffer it touches are allocated once at construction
//! and reused for each execution.

use crate::error::SpectrumError;
use log::{debug, warn};
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

fn zeroed<T: Clone>(len: usize, value: T) -> Result<Vec<T>, SpectrumError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// FFT engine for the analysis window
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Forward plan, `None` once released
    r2c: Option<Arc<dyn RealToComplex<f32>>>,

    /// Windowed samples handed to the plan
    input_buffer: Vec<f32>,

    /// Complex spectrum, fft_size/2 + 1 bins
    output_buffer: Vec<Complex<f32>>,

    /// Scratch space so execution never allocates
    scratch: Vec<Complex<f32>>,

    /// Normalized power per bin
    power: Vec<f64>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples), at least 2
    pub fn new(fft_size: usize) -> Result<Self, SpectrumError> {
        if fft_size < 2 {
            return Err(SpectrumError::InvalidWindowSize(fft_size));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let num_bins = fft_size / 2 + 1;
        let input_buffer = zeroed(fft_size, 0.0)?;
        let output_buffer = zeroed(num_bins, Complex::new(0.0, 0.0))?;
        let scratch = zeroed(r2c.get_scratch_len(), Complex::new(0.0, 0.0))?;
        let power = zeroed(num_bins, 0.0)?;

        Ok(Self {
            fft_size,
            r2c: Some(r2c),
            input_buffer,
            output_buffer,
            scratch,
            power,
        })
    }

    /// Buffer the plan reads from; fill it before calling [`execute`](Self::execute)
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input_buffer
    }

    /// Run the forward transform over the input buffer
    ///
    /// Overwrites the complex output buffer. The input buffer is used as
    /// scratch by the plan and must be refilled before the next execution.
    pub fn execute(&mut self) -> Result<(), SpectrumError> {
        let r2c = self.r2c.as_ref().ok_or(SpectrumError::PlanReleased)?;

        r2c.process_with_scratch(
            &mut self.input_buffer,
            &mut self.output_buffer,
            &mut self.scratch,
        )
        .map_err(|e| SpectrumError::Transform(e.to_string()))
    }

    /// Compute power per bin from the last execution
    ///
    /// power[i] = (re² + im²) / (N/2 + 1)²
    pub fn compute_power(&mut self) -> &[f64] {
        let norm = (self.output_buffer.len() * self.output_buffer.len()) as f32;

        for (p, c) in self.power.iter_mut().zip(&self.output_buffer) {
            *p = (c.norm_sqr() / norm) as f64;
        }

        &self.power
    }

    /// Power from the last [`compute_power`](Self::compute_power) call
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    /// Complex spectrum from the last execution
    pub fn spectrum(&self) -> &[Complex<f32>] {
        &self.output_buffer
    }

    /// Release the plan
    ///
    /// Returns `false` if the plan was already released.
    pub fn release(&mut self) -> bool {
        match self.r2c.take() {
            Some(_) => {
                debug!("fft plan of size {} released", self.fft_size);
                true
            }
            None => {
                warn!("fft plan of size {} released twice", self.fft_size);
                false
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.r2c.is_none()
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}
