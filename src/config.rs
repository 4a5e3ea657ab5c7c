//! Application configuration.
//!
//! The padding amounts themselves always come from the command line (see
//! [`padding`](crate::padding)).  The optional JSON file only tunes the
//! timing of the reservation handshake and of instance supersession.
//!
//! # Example
//!
//! ```json
//! {
//!   "timing": {
//!     "commit_settle_ms": 150,
//!     "supersede_settle_ms": 300,
//!     "exit_timeout_ms": 2000,
//!     "poll_interval_ms": 10
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
///
/// Every field is optional. A minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settle delays and timeouts.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Settle delays and timeouts.
///
/// All durations are in **milliseconds**.  A value of `0` disables that
/// wait entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper bound on how long to wait, after each commit, for the monitor's
    /// available area to reflect the new bar.
    pub commit_settle_ms: u64,
    /// Pause after terminating a previous instance, giving the shell time to
    /// reclaim the bars of its destroyed windows.
    pub supersede_settle_ms: u64,
    /// Upper bound on how long to wait for a terminated instance to exit.
    pub exit_timeout_ms: u64,
    /// Interval between work-area polls while settling.
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            commit_settle_ms: 150,
            supersede_settle_ms: 300,
            exit_timeout_ms: 2000,
            poll_interval_ms: 10,
        }
    }
}

impl TimingConfig {
    /// No waiting at all.  Used against backends whose state changes are
    /// visible immediately.
    pub fn immediate() -> Self {
        Self {
            commit_settle_ms: 0,
            supersede_settle_ms: 0,
            exit_timeout_ms: 0,
            poll_interval_ms: 0,
        }
    }

    pub fn commit_settle(&self) -> Duration {
        Duration::from_millis(self.commit_settle_ms)
    }

    pub fn supersede_settle(&self) -> Duration {
        Duration::from_millis(self.supersede_settle_ms)
    }

    pub fn exit_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Resolve the default config file path.
///
/// `%APPDATA%\aerial\config.json` on Windows,
/// `$XDG_CONFIG_HOME/aerial/config.json` (or `~/.config/...`) elsewhere.
pub fn default_path() -> PathBuf {
    let base = if cfg!(windows) {
        std::env::var("APPDATA").unwrap_or_else(|_| ".".into())
    } else {
        std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            format!("{}/.config", home)
        })
    };
    PathBuf::from(base).join("aerial").join("config.json")
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "timing": {
                "commit_settle_ms": 50,
                "supersede_settle_ms": 500,
                "exit_timeout_ms": 1000,
                "poll_interval_ms": 5
            }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.timing.commit_settle_ms, 50);
        assert_eq!(cfg.timing.supersede_settle_ms, 500);
        assert_eq!(cfg.timing.exit_timeout_ms, 1000);
        assert_eq!(cfg.timing.poll_interval_ms, 5);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.timing, TimingConfig::default());
        assert_eq!(cfg.timing.commit_settle(), Duration::from_millis(150));
        assert_eq!(cfg.timing.supersede_settle(), Duration::from_millis(300));
    }

    #[test]
    fn deserialize_partial_timing() {
        let json = r#"{ "timing": { "supersede_settle_ms": 1200 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.timing.supersede_settle_ms, 1200);
        let d = TimingConfig::default();
        assert_eq!(cfg.timing.commit_settle_ms, d.commit_settle_ms);
        assert_eq!(cfg.timing.exit_timeout_ms, d.exit_timeout_ms);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "timing": {}, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/aerial/config.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn default_path_ends_in_config_json() {
        let p = default_path();
        assert!(p.ends_with("aerial/config.json") || p.ends_with("aerial\\config.json"));
    }
}
