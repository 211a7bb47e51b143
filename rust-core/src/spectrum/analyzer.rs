//! Spectrum analyzer plugin
//!
//! Pass-through observer: every block is copied unchanged to the output
//! while a mono mix is appended to the sliding history. When telemetry is
//! enabled a deferred run is queued on the idle dispatcher; that run windows
//! the history, executes the transform and publishes the power spectrum.
//!
//! Locking: the real-time path only takes `state`. The deferred run takes
//! `engine`, then briefly `state` to copy the windowed history into the
//! plan's input buffer. Teardown clears `ready` under `state` before it
//! takes `engine` to release the plan.

use super::fft::FftEngine;
use super::history::MonoHistory;
use super::power::PowerSpectrum;
use super::windowing::hann_window;
use crate::config::{SettingKey, SettingsStore, SpectrumConfig};
use crate::error::SpectrumError;
use crate::host::{DeferredWork, IdleDispatcher, Signal, Subscription};
use crate::plugin::{copy_through, next_serial, Plugin, PowerSource};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

const PLUGIN_NAME: &str = "spectrum";

/// State shared with the real-time thread, guarded by one lock
struct AnalyzerState {
    history: MonoHistory,
    bypass: bool,
    ready: bool,
    post_messages: bool,
    sample_rate: u32,
}

struct Shared {
    serial: u64,
    state: Mutex<AnalyzerState>,
    engine: Mutex<FftEngine>,
    window: Arc<[f32]>,
    /// Set while a deferred run is queued and not yet started
    scheduled: AtomicBool,
    power: Signal<PowerSpectrum>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, AnalyzerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_bypass(&self, bypass: bool) {
        self.state().bypass = bypass;
    }

    fn set_post_messages(&self, enabled: bool) {
        self.state().post_messages = enabled;
    }

    /// Window, transform and normalize the current history
    ///
    /// Returns `None` when bypassed, torn down, or the plan is gone.
    fn analyze(&self) -> Option<PowerSpectrum> {
        let mut engine = self.engine.lock().ok()?;
        if engine.is_released() {
            return None;
        }

        let sample_rate = {
            let state = self.state();
            if !state.ready || state.bypass {
                return None;
            }
            state.history.apply_window(&self.window, engine.input_mut());
            state.sample_rate
        };

        if let Err(e) = engine.execute() {
            warn!("{PLUGIN_NAME}: {e}");
            return None;
        }

        let fft_size = engine.fft_size();
        let power = engine.compute_power().to_vec();

        Some(PowerSpectrum {
            sample_rate,
            fft_size,
            bin_count: power.len(),
            power,
        })
    }
}

impl DeferredWork for Shared {
    fn run_deferred(&self) {
        // Blocks arriving from here on must schedule a fresh run
        self.scheduled.store(false, Ordering::Release);

        let Some(spectrum) = self.analyze() else {
            return;
        };

        {
            let state = self.state();
            if state.bypass || !state.ready {
                return;
            }
        }

        self.power.emit(&spectrum);
    }

    fn discarded(&self) {
        self.scheduled.store(false, Ordering::Release);
    }
}

/// FFT power-spectrum analyzer
pub struct SpectrumAnalyzer {
    shared: Arc<Shared>,
    work: Weak<dyn DeferredWork>,
    dispatcher: IdleDispatcher,
    max_block_size: usize,
}

impl SpectrumAnalyzer {
    /// Create an analyzer with an N = `config.n_bands` sample window
    ///
    /// Every buffer and the transform plan are allocated here; construction
    /// fails rather than returning a partially usable analyzer.
    pub fn new(config: &SpectrumConfig, dispatcher: IdleDispatcher) -> Result<Self, SpectrumError> {
        let n_bands = config.n_bands;
        if n_bands < 2 {
            return Err(SpectrumError::InvalidWindowSize(n_bands));
        }

        let engine = FftEngine::new(n_bands)?;
        let window = hann_window(n_bands)?;
        let history = MonoHistory::new(n_bands)?;

        let shared = Arc::new(Shared {
            serial: next_serial(),
            state: Mutex::new(AnalyzerState {
                history,
                bypass: !config.show,
                ready: true,
                post_messages: config.post_messages,
                sample_rate: config.sample_rate,
            }),
            engine: Mutex::new(engine),
            window,
            scheduled: AtomicBool::new(false),
            power: Signal::new(),
        });

        let work: Weak<dyn DeferredWork> = Arc::downgrade(&shared) as Weak<dyn DeferredWork>;

        debug!(
            "{PLUGIN_NAME} created (serial {}, {} bands)",
            shared.serial, n_bands
        );

        Ok(Self {
            shared,
            work,
            dispatcher,
            max_block_size: config.max_block_size,
        })
    }

    /// Number of frequency bins per published spectrum (N/2 + 1)
    pub fn num_bins(&self) -> usize {
        self.n_bands() / 2 + 1
    }

    /// Analysis window size N
    pub fn n_bands(&self) -> usize {
        self.shared.window.len()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state().ready
    }

    pub fn post_messages(&self) -> bool {
        self.shared.state().post_messages
    }

    /// Follow "show" and "post-messages" from a settings store
    ///
    /// The current values are applied immediately. Changes are followed
    /// until the returned binding is dropped.
    pub fn bind_settings(&self, store: &SettingsStore) -> SettingsBinding {
        self.shared.set_bypass(!store.get_boolean(SettingKey::Show));
        self.shared
            .set_post_messages(store.get_boolean(SettingKey::PostMessages));

        let shared = Arc::downgrade(&self.shared);
        let show = store.connect_key(SettingKey::Show, move |show| {
            if let Some(shared) = shared.upgrade() {
                shared.set_bypass(!show);
            }
        });

        let shared = Arc::downgrade(&self.shared);
        let post_messages = store.connect_key(SettingKey::PostMessages, move |enabled| {
            if let Some(shared) = shared.upgrade() {
                shared.set_post_messages(enabled);
            }
        });

        SettingsBinding {
            _subscriptions: vec![show, post_messages],
        }
    }

    /// Begin teardown
    ///
    /// Clears `ready` before the plan is released, so queued deferred runs
    /// become no-ops. Calling it again does nothing.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state();
            if !state.ready {
                return;
            }
            state.ready = false;
        }

        self.dispatcher.set_ignore(self.shared.serial, true);

        self.shared
            .engine
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .release();

        debug!("{PLUGIN_NAME} destroyed (serial {})", self.shared.serial);
    }

    /// Queue one deferred run unless one is already pending
    fn schedule(&self) {
        if self.shared.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }

        if !self
            .dispatcher
            .idle_add(self.shared.serial, self.work.clone())
        {
            self.shared.scheduled.store(false, Ordering::Release);
        }
    }

    #[cfg(test)]
    fn history_snapshot(&self) -> Vec<f32> {
        self.shared.state().history.as_slice().to_vec()
    }
}

impl Plugin for SpectrumAnalyzer {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn serial(&self) -> u64 {
        self.shared.serial
    }

    fn setup(&self, sample_rate: u32) {
        let mut state = self.shared.state();
        state.history.clear();
        state.sample_rate = sample_rate;
        debug!("{PLUGIN_NAME} setup at {sample_rate} Hz");
    }

    fn process(&self, left_in: &[f32], right_in: &[f32], left_out: &mut [f32], right_out: &mut [f32]) {
        copy_through(left_in, right_in, left_out, right_out);

        debug_assert_eq!(left_in.len(), right_in.len());
        debug_assert!(left_in.len() <= self.max_block_size);

        let k = left_in.len().min(right_in.len());

        let post_messages = {
            let mut state = self.shared.state();
            if state.bypass || !state.ready {
                return;
            }
            state.history.append(&left_in[..k], &right_in[..k]);
            state.post_messages
        };

        if post_messages {
            self.schedule();
        }
    }

    fn set_bypass(&self, bypass: bool) {
        self.shared.set_bypass(bypass);
    }

    fn bypass(&self) -> bool {
        self.shared.state().bypass
    }

    fn set_post_messages(&self, enabled: bool) {
        self.shared.set_post_messages(enabled);
    }

    fn latency_seconds(&self) -> f32 {
        0.0
    }
}

impl PowerSource for SpectrumAnalyzer {
    fn subscribe_power<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PowerSpectrum) + Send + Sync + 'static,
    {
        self.shared.power.connect(callback)
    }
}

impl Drop for SpectrumAnalyzer {
    fn drop(&mut self) {
        self.shutdown();
        // Queued tasks can no longer upgrade their handle
        self.dispatcher.set_ignore(self.shared.serial, false);
    }
}

/// Live link between a settings store and an analyzer
pub struct SettingsBinding {
    _subscriptions: Vec<Subscription>,
}
