//! Click timing settings shared with the click worker

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::engine::ClickError;

/// Shortest wait the worker will ever sleep between clicks
pub const MIN_WAIT_MS: u64 = 10;

/// Plain snapshot of the click timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickConfig {
    pub interval_ms: u64,
    pub jitter_enabled: bool,
    pub jitter_percent: u8,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            jitter_enabled: false,
            jitter_percent: 10,
        }
    }
}

/// Live click settings
///
/// Written by the controller and read by the worker once per cycle, so
/// updates take effect without restarting a session.
#[derive(Debug)]
pub struct ClickSettings {
    interval_ms: AtomicU64,
    jitter_enabled: AtomicBool,
    jitter_percent: AtomicU8,
}

impl ClickSettings {
    pub fn new(config: ClickConfig) -> Result<Self, ClickError> {
        validate_interval(config.interval_ms)?;
        validate_jitter_percent(config.jitter_percent)?;

        Ok(Self {
            interval_ms: AtomicU64::new(config.interval_ms),
            jitter_enabled: AtomicBool::new(config.jitter_enabled),
            jitter_percent: AtomicU8::new(config.jitter_percent),
        })
    }

    pub fn set_interval(&self, interval_ms: u64) -> Result<(), ClickError> {
        validate_interval(interval_ms)?;
        self.interval_ms.store(interval_ms, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_jitter_enabled(&self, enabled: bool) {
        self.jitter_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_jitter_percent(&self, percent: u8) -> Result<(), ClickError> {
        validate_jitter_percent(percent)?;
        self.jitter_percent.store(percent, Ordering::Relaxed);
        Ok(())
    }

    pub fn snapshot(&self) -> ClickConfig {
        ClickConfig {
            interval_ms: self.interval_ms.load(Ordering::Relaxed),
            jitter_enabled: self.jitter_enabled.load(Ordering::Relaxed),
            jitter_percent: self.jitter_percent.load(Ordering::Relaxed),
        }
    }

    /// How long to wait before the next click
    ///
    /// Without jitter this is exactly the interval. With jitter a uniform
    /// offset of up to `interval * percent / 100` either way is applied,
    /// and the result never drops below [`MIN_WAIT_MS`].
    pub fn wait_duration<R: Rng>(&self, rng: &mut R) -> Duration {
        let config = self.snapshot();
        if !config.jitter_enabled {
            return Duration::from_millis(config.interval_ms);
        }

        let interval = config.interval_ms as i64;
        let spread = interval * i64::from(config.jitter_percent) / 100;
        let offset = if spread > 0 {
            rng.gen_range(-spread..=spread)
        } else {
            0
        };

        let wait = (interval + offset).max(MIN_WAIT_MS as i64);
        Duration::from_millis(wait as u64)
    }
}

fn validate_interval(interval_ms: u64) -> Result<(), ClickError> {
    if interval_ms == 0 || interval_ms > i64::MAX as u64 / 100 {
        return Err(ClickError::InvalidInterval(interval_ms));
    }
    Ok(())
}

fn validate_jitter_percent(percent: u8) -> Result<(), ClickError> {
    if percent > 100 {
        return Err(ClickError::InvalidJitterPercent(percent));
    }
    Ok(())
}
