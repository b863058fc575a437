use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "vibe.toml";

/// Artificial latencies and limits for the simulated backend, in milliseconds
/// unless noted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client_name: String,
    pub login_delay_ms: u64,
    pub consent_poll_interval_ms: u64,
    pub federated_settle_delay_ms: u64,
    pub popup_blocked_delay_ms: u64,
    pub connection_test_delay_ms: u64,
    pub save_delay_ms: u64,
    pub saved_banner_delay_ms: u64,
    /// Bytes.
    pub avatar_max_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_name: "Vibe".into(),
            login_delay_ms: 1500,
            consent_poll_interval_ms: 500,
            federated_settle_delay_ms: 800,
            popup_blocked_delay_ms: 1500,
            connection_test_delay_ms: 2000,
            save_delay_ms: 800,
            saved_banner_delay_ms: 1500,
            avatar_max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }

    pub fn consent_poll_interval(&self) -> Duration {
        // A zero interval would spin the poll loop.
        Duration::from_millis(self.consent_poll_interval_ms.max(1))
    }

    pub fn federated_settle_delay(&self) -> Duration {
        Duration::from_millis(self.federated_settle_delay_ms)
    }

    pub fn popup_blocked_delay(&self) -> Duration {
        Duration::from_millis(self.popup_blocked_delay_ms)
    }

    pub fn connection_test_delay(&self) -> Duration {
        Duration::from_millis(self.connection_test_delay_ms)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn saved_banner_delay(&self) -> Duration {
        Duration::from_millis(self.saved_banner_delay_ms)
    }

    /// All delays zeroed; used by the CLI's `--instant` flag.
    pub fn instant() -> Self {
        Self {
            login_delay_ms: 0,
            consent_poll_interval_ms: 1,
            federated_settle_delay_ms: 0,
            popup_blocked_delay_ms: 0,
            connection_test_delay_ms: 0,
            save_delay_ms: 0,
            saved_banner_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Defaults, then `path` (or `vibe.toml` when present), then environment
/// overrides. An explicit path that cannot be read is an error.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            toml::from_str::<Settings>(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?
        }
        None => match fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(raw) => toml::from_str::<Settings>(&raw).unwrap_or_else(|err| {
                warn!("ignoring malformed {DEFAULT_CONFIG_FILE}: {err}");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        },
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

/// Applies `VIBE__*` then `APP__*` overrides; later sources win and values
/// that fail to parse are ignored.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |suffix: &str| {
        let mut value = None;
        for prefix in ["VIBE__", "APP__"] {
            if let Some(v) = lookup(&format!("{prefix}{suffix}")) {
                value = Some(v);
            }
        }
        value
    };
    let read_u64 = |suffix: &str| read(suffix).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(v) = read("CLIENT_NAME") {
        settings.client_name = v;
    }
    if let Some(v) = read_u64("LOGIN_DELAY_MS") {
        settings.login_delay_ms = v;
    }
    if let Some(v) = read_u64("CONSENT_POLL_INTERVAL_MS") {
        settings.consent_poll_interval_ms = v;
    }
    if let Some(v) = read_u64("FEDERATED_SETTLE_DELAY_MS") {
        settings.federated_settle_delay_ms = v;
    }
    if let Some(v) = read_u64("POPUP_BLOCKED_DELAY_MS") {
        settings.popup_blocked_delay_ms = v;
    }
    if let Some(v) = read_u64("CONNECTION_TEST_DELAY_MS") {
        settings.connection_test_delay_ms = v;
    }
    if let Some(v) = read_u64("SAVE_DELAY_MS") {
        settings.save_delay_ms = v;
    }
    if let Some(v) = read_u64("SAVED_BANNER_DELAY_MS") {
        settings.saved_banner_delay_ms = v;
    }
    if let Some(v) = read("AVATAR_MAX_BYTES").and_then(|v| v.trim().parse::<usize>().ok()) {
        settings.avatar_max_bytes = v;
    }
}
