//! Application-level configuration loading: sweep cadence, parallelism, and the admin token.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the service looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATCH_LIFECYCLE_CONFIG_PATH";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;
const DEFAULT_SWEEP_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Pause between two scheduled sweeps.
    pub sweep_interval: Duration,
    /// Matches reconciled in parallel within one sweep.
    pub sweep_concurrency: usize,
    /// Token expected in `X-Admin-Token`; admin routes are closed when unset.
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk and apply environment overrides.
    ///
    /// A missing or unreadable file falls back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        raw.with_env_overrides(|key| env::var(key).ok()).into()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    sweep_interval_secs: Option<u64>,
    #[serde(default)]
    sweep_concurrency: Option<usize>,
    #[serde(default)]
    admin_token: Option<String>,
}

impl RawConfig {
    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = parse_env(&lookup, "SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = Some(secs);
        }
        if let Some(concurrency) = parse_env(&lookup, "SWEEP_CONCURRENCY") {
            self.sweep_concurrency = Some(concurrency);
        }
        if let Some(token) = lookup("ADMIN_TOKEN") {
            self.admin_token = Some(token);
        }
        self
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let secs = value
            .sweep_interval_secs
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
            .max(1);
        Self {
            sweep_interval: Duration::from_secs(secs),
            sweep_concurrency: value
                .sweep_concurrency
                .unwrap_or(DEFAULT_SWEEP_CONCURRENCY)
                .max(1),
            admin_token: value
                .admin_token
                .map(|token| token.trim().to_owned())
                .filter(|token| !token.is_empty()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "ignoring unparsable environment override");
            None
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.sweep_concurrency, 8);
        assert_eq!(config.admin_token, None);
    }

    #[test]
    fn file_values_are_clamped() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"sweep_interval_secs": 0, "sweep_concurrency": 0, "admin_token": "  "}"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.sweep_concurrency, 1);
        assert_eq!(config.admin_token, None);
    }

    #[test]
    fn environment_wins_over_file() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"sweep_interval_secs": 30, "admin_token": "file"}"#).unwrap();
        let config: AppConfig = raw
            .with_env_overrides(lookup(&[
                ("SWEEP_INTERVAL_SECS", "2"),
                ("SWEEP_CONCURRENCY", "not-a-number"),
                ("ADMIN_TOKEN", "env"),
            ]))
            .into();

        assert_eq!(config.sweep_interval, Duration::from_secs(2));
        assert_eq!(config.sweep_concurrency, 8);
        assert_eq!(config.admin_token.as_deref(), Some("env"));
    }
}
