//! Client configuration (figment-deserialized from defaults / cursor.toml / env vars).
//!
//! Two equivalent ways to configure:
//!
//!   cursor.toml:   host = "cursors.example.com"
//!                  secure = true
//!
//!   env var:       CURSOR_HOST=cursors.example.com
//!                  CURSOR_SECURE=true

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Broker host (and optional port), without scheme or path.
    #[serde(default = "default_host")]
    pub host: String,
    /// This client's session id, sent as the `id` query parameter.
    #[serde(default)]
    pub client_id: String,
    /// Use `wss://` instead of `ws://`.
    #[serde(default)]
    pub secure: bool,
    /// Minimum gap between outbound `move` frames.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    /// How long an activity pulse stays lit after the last message.
    #[serde(default = "default_pulse_duration_ms")]
    pub pulse_duration_ms: u64,
    /// Delay between closing an old connection and dialing a new one during
    /// a manual reconnect, so the broker can tear the old session down.
    #[serde(default = "default_reconnect_grace_ms")]
    pub reconnect_grace_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_send_interval_ms() -> u64 {
    20
}

fn default_pulse_duration_ms() -> u64 {
    250
}

fn default_reconnect_grace_ms() -> u64 {
    1000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            client_id: String::new(),
            secure: false,
            send_interval_ms: default_send_interval_ms(),
            pulse_duration_ms: default_pulse_duration_ms(),
            reconnect_grace_ms: default_reconnect_grace_ms(),
        }
    }
}

impl SyncConfig {
    pub fn new(host: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    /// The broker endpoint for this client.
    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}/ws?id={}", scheme, self.host, self.client_id)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse_duration_ms)
    }

    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_millis(self.reconnect_grace_ms)
    }
}

/// Layer configuration: struct defaults → `cursor.toml` → `CURSOR_*` env vars.
pub fn load_config(config_path: &Path) -> Result<SyncConfig> {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(SyncConfig::default()))
        .merge(Toml::file(config_path))
        .merge(Env::prefixed("CURSOR_"))
        .extract()
        .context("invalid cursor_sync configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_scheme_follows_secure_flag() {
        let mut config = SyncConfig::new("cursors.example.com", "A");
        assert_eq!(config.ws_url(), "ws://cursors.example.com/ws?id=A");
        config.secure = true;
        assert_eq!(config.ws_url(), "wss://cursors.example.com/ws?id=A");
    }

    #[test]
    fn defaults_match_the_documented_knobs() {
        let config = SyncConfig::default();
        assert_eq!(config.send_interval(), Duration::from_millis(20));
        assert_eq!(config.pulse_duration(), Duration::from_millis(250));
        assert_eq!(config.reconnect_grace(), Duration::from_millis(1000));
        assert!(!config.secure);
    }

    #[test]
    fn toml_fields_deserialize_with_defaults() {
        let config: SyncConfig =
            toml_str(r#"host = "example.org:9000""#);
        assert_eq!(config.host, "example.org:9000");
        assert_eq!(config.send_interval_ms, 20);
    }

    fn toml_str(s: &str) -> SyncConfig {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };
        Figment::from(Serialized::defaults(SyncConfig::default()))
            .merge(Toml::string(s))
            .extract()
            .unwrap()
    }
}
