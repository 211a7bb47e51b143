//! Analyzer configuration and live settings store
//!
//! [`SpectrumConfig`] holds the construction-time values (loadable from
//! YAML). [`SettingsStore`] holds the boolean keys that may change while the
//! analyzer runs and notifies subscribers on every change.

use crate::error::ConfigError;
use crate::host::{Signal, Subscription};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Maximum block size a host may deliver, and the default analysis size
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 8192;

/// Spectrum analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// Analysis window size N (number of samples)
    #[serde(default = "default_n_bands")]
    pub n_bands: usize,

    /// Largest block the host may deliver per process call
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    /// Initial sample rate in Hz, replaced by `setup`
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Whether the analysis is shown (bypass is its negation)
    #[serde(default = "default_true")]
    pub show: bool,

    /// Whether power spectra are published
    #[serde(default = "default_true")]
    pub post_messages: bool,

    /// Capacity of the idle dispatch queue
    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,
}

fn default_n_bands() -> usize {
    DEFAULT_MAX_BLOCK_SIZE
}

fn default_max_block_size() -> usize {
    DEFAULT_MAX_BLOCK_SIZE
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_true() -> bool {
    true
}

fn default_dispatch_queue_capacity() -> usize {
    64
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            n_bands: default_n_bands(),
            max_block_size: default_max_block_size(),
            sample_rate: default_sample_rate(),
            show: true,
            post_messages: true,
            dispatch_queue_capacity: default_dispatch_queue_capacity(),
        }
    }
}

impl SpectrumConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        debug!("loaded spectrum config from {}", path.display());
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_bands < 2 {
            return Err(ConfigError::Invalid {
                field: "n_bands",
                reason: format!("must be at least 2, got {}", self.n_bands),
            });
        }
        if self.max_block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_block_size",
                reason: "must be positive".into(),
            });
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be positive".into(),
            });
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "dispatch_queue_capacity",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Boolean keys exposed by the settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// "show": analysis enabled
    Show,
    /// "post-messages": telemetry enabled
    PostMessages,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Show => "show",
            SettingKey::PostMessages => "post-messages",
        }
    }
}

/// A change of one boolean key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingChange {
    pub key: SettingKey,
    pub value: bool,
}

/// Live boolean settings with change notification
pub struct SettingsStore {
    values: Mutex<HashMap<SettingKey, bool>>,
    defaults: HashMap<SettingKey, bool>,
    changed: Signal<SettingChange>,
}

impl SettingsStore {
    pub fn new(config: &SpectrumConfig) -> Self {
        let defaults: HashMap<SettingKey, bool> = [
            (SettingKey::Show, config.show),
            (SettingKey::PostMessages, config.post_messages),
        ]
        .into_iter()
        .collect();

        Self {
            values: Mutex::new(defaults.clone()),
            defaults,
            changed: Signal::new(),
        }
    }

    pub fn get_boolean(&self, key: SettingKey) -> bool {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values
            .get(&key)
            .or_else(|| self.defaults.get(&key))
            .copied()
            .unwrap_or(false)
    }

    /// Set a key, notifying subscribers only if the value changed
    pub fn set_boolean(&self, key: SettingKey, value: bool) {
        let previous = {
            let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
            values.insert(key, value)
        };

        if previous != Some(value) {
            debug!("setting {} changed to {}", key.as_str(), value);
            self.changed.emit(&SettingChange { key, value });
        }
    }

    /// Restore every key to its configured value
    pub fn reset_all(&self) {
        let keys: Vec<SettingKey> = self.defaults.keys().copied().collect();
        for key in keys {
            if let Some(&value) = self.defaults.get(&key) {
                self.set_boolean(key, value);
            }
        }
    }

    /// Subscribe to changes of every key
    pub fn connect_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SettingChange) + Send + Sync + 'static,
    {
        self.changed.connect(callback)
    }

    /// Subscribe to changes of a single key
    pub fn connect_key<F>(&self, key: SettingKey, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.changed.connect(move |change| {
            if change.key == key {
                callback(change.value);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let config = SpectrumConfig::default();
        assert_eq!(config.n_bands, 8192);
        assert_eq!(config.max_block_size, 8192);
        assert_eq!(config.sample_rate, 48000);
        assert!(config.show);
        assert!(config.post_messages);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = SpectrumConfig::from_yaml_str("n_bands: 1024\nshow: false\n").unwrap();
        assert_eq!(config.n_bands, 1024);
        assert!(!config.show);
        assert_eq!(config.max_block_size, 8192);
        assert!(config.post_messages);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SpectrumConfig::from_yaml_str("n_bands: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "n_bands", .. }));

        let err = SpectrumConfig::from_yaml_str("dispatch_queue_capacity: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "dispatch_queue_capacity",
                ..
            }
        ));

        assert!(matches!(
            SpectrumConfig::from_yaml_str("n_bands: [1, 2]\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "n_bands: 2048").unwrap();
        writeln!(file, "sample_rate: 44100").unwrap();

        let config = SpectrumConfig::load(file.path()).unwrap();
        assert_eq!(config.n_bands, 2048);
        assert_eq!(config.sample_rate, 44100);

        assert!(matches!(
            SpectrumConfig::load("/nonexistent/spectrum.yaml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_store_notifies_only_on_change() {
        let store = SettingsStore::new(&SpectrumConfig::default());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _sub = store.connect_key(SettingKey::Show, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set_boolean(SettingKey::Show, true);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        store.set_boolean(SettingKey::Show, false);
        assert!(!store.get_boolean(SettingKey::Show));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Other keys don't reach a key-filtered subscriber
        store.set_boolean(SettingKey::PostMessages, false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        store.reset_all();
        assert!(store.get_boolean(SettingKey::Show));
        assert!(store.get_boolean(SettingKey::PostMessages));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
