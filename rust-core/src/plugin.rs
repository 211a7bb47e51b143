//! Real-time plugin contract
//!
//! The host calls [`Plugin::process`] once per audio block from its
//! real-time thread. Implementations must return in bounded time, must fully
//! populate both output spans, and never report failure: a plugin that
//! cannot do its work degrades to pass-through.

use crate::host::Subscription;
use crate::spectrum::PowerSpectrum;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique identity token
pub fn next_serial() -> u64 {
    NEXT_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/// Per-block processing interface shared by every effect
///
/// All methods take `&self`: the host thread, the settings store and the
/// idle consumer may call into the same instance concurrently.
pub trait Plugin: Send + Sync {
    /// Short identifier of the plugin type
    fn name(&self) -> &str;

    /// Identity token used to discard stale deferred work
    fn serial(&self) -> u64;

    /// Prepare for a new stream, clearing any accumulated history
    fn setup(&self, sample_rate: u32);

    /// Process one block
    ///
    /// # Arguments
    /// * `left_in` / `right_in` - Input channels, equal length
    /// * `left_out` / `right_out` - Output channels, same length as input
    fn process(&self, left_in: &[f32], right_in: &[f32], left_out: &mut [f32], right_out: &mut [f32]);

    /// Enable or disable bypass; a bypassed plugin passes audio through unanalyzed
    fn set_bypass(&self, bypass: bool);

    /// Whether bypass is active
    fn bypass(&self) -> bool;

    /// Enable or disable telemetry publishing
    fn set_post_messages(&self, enabled: bool);

    /// Latency added to the signal path, in seconds
    fn latency_seconds(&self) -> f32;
}

/// Plugins that publish power spectra
pub trait PowerSource {
    /// Subscribe to `(sample_rate, bin_count, power)` updates
    ///
    /// Each update replaces the previous one.
    fn subscribe_power<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PowerSpectrum) + Send + Sync + 'static;
}

/// Copy input channels to output channels
///
/// Each channel copies the common prefix of its input and output spans.
pub fn copy_through(left_in: &[f32], right_in: &[f32], left_out: &mut [f32], right_out: &mut [f32]) {
    debug_assert_eq!(left_in.len(), left_out.len());
    debug_assert_eq!(right_in.len(), right_out.len());

    let n = left_in.len().min(left_out.len());
    left_out[..n].copy_from_slice(&left_in[..n]);

    let n = right_in.len().min(right_out.len());
    right_out[..n].copy_from_slice(&right_in[..n]);
}
