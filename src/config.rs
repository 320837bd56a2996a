//! Configuration loading and management
//!
//! Settings come from `AUTOCLICKER_*` environment variables layered over
//! defaults. Persisting changes made at runtime is up to the UI.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::clicker::ClickConfig;

/// Interval bounds offered to users
pub const MIN_INTERVAL_MS: u64 = 50;
pub const MAX_INTERVAL_MS: u64 = 60_000;

pub const DEFAULT_HOTKEY: &str = "F6";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Initial click timing
    pub click: ClickConfig,

    /// Hotkey string, e.g. "F6" or "Ctrl+Shift+C"
    pub hotkey: String,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClickConfig::default();

        let interval_ms = match lookup("AUTOCLICKER_INTERVAL_MS") {
            Some(raw) => {
                let requested: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("AUTOCLICKER_INTERVAL_MS is not a number: {raw:?}"))?;
                let clamped = requested.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
                if clamped != requested {
                    warn!(requested, clamped, "click interval out of range");
                }
                clamped
            }
            None => defaults.interval_ms,
        };

        let jitter_enabled = match lookup("AUTOCLICKER_JITTER") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("AUTOCLICKER_JITTER is not a boolean: {raw:?}"))?,
            None => defaults.jitter_enabled,
        };

        let jitter_percent = match lookup("AUTOCLICKER_JITTER_PERCENT") {
            Some(raw) => {
                let percent: u8 = raw.trim().parse().with_context(|| {
                    format!("AUTOCLICKER_JITTER_PERCENT is not a number: {raw:?}")
                })?;
                if percent > 100 {
                    bail!("AUTOCLICKER_JITTER_PERCENT must be at most 100, got {percent}");
                }
                percent
            }
            None => defaults.jitter_percent,
        };

        let hotkey = lookup("AUTOCLICKER_HOTKEY")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_HOTKEY.to_string());

        let socket_path = match lookup("AUTOCLICKER_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = lookup("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("autoclicker")
                    .join("daemon.sock")
            }
        };

        Ok(Self {
            socket_path,
            click: ClickConfig {
                interval_ms,
                jitter_enabled,
                jitter_percent,
            },
            hotkey,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
