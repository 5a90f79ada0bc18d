//! Cluster-management configuration (§6 table): loaded from TOML with
//! `serde`, held in an `ArcSwap` behind a `Lazy` static the way the
//! teacher's `config` module holds its `ConfigAndUsers`, and reloadable on
//! SIGHUP.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error reading `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("toml parse error in `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `PARTITIONS` only ever accepts `AUTO`; kept as an enum (rather than
/// collapsed to a unit type) because it is deprecated, not removed (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Partitions {
    #[default]
    Auto,
}

/// The cluster-management configuration table (§6). Unknown keys are
/// rejected the way the teacher's config structs use
/// `#[serde(deny_unknown_fields)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub partitions: Partitions,
    /// Per-command timeout in milliseconds; `None` means no explicit
    /// timeout is enforced by this layer.
    pub timeout_ms: Option<u64>,
    pub oss_global_password: Option<String>,
    /// `0` selects a default of 1 effective connection (Open Question
    /// #1, SPEC_FULL §D.1).
    pub conn_per_shard: usize,
    pub cursor_reply_threshold: Option<u64>,
    pub search_threads: Option<usize>,
    /// `0` disables the wait entirely (Open Question #2, SPEC_FULL §D.2).
    pub topology_validation_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partitions: Partitions::Auto,
            timeout_ms: None,
            oss_global_password: None,
            conn_per_shard: 0,
            cursor_reply_threshold: None,
            search_threads: None,
            topology_validation_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Validate values documented as "≥0 or ≥1" in §6. `TIMEOUT`,
    /// `CURSOR_REPLY_THRESHOLD`, and `SEARCH_THREADS` are `≥1` when set at
    /// all (a value of `0` is rejected rather than silently clamped).
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(t) = self.timeout_ms {
            if t < 1 {
                return Err(Error::Invalid("TIMEOUT must be >= 1".into()));
            }
        }
        if let Some(t) = self.cursor_reply_threshold {
            if t < 1 {
                return Err(Error::Invalid("CURSOR_REPLY_THRESHOLD must be >= 1".into()));
            }
        }
        if let Some(t) = self.search_threads {
            if t < 1 {
                return Err(Error::Invalid("SEARCH_THREADS must be >= 1".into()));
            }
        }
        Ok(())
    }

    /// Effective connection count per shard: `0` selects 1 (SPEC_FULL
    /// §D.1).
    pub fn effective_conn_per_shard(&self) -> usize {
        self.conn_per_shard.max(1)
    }

    pub fn topology_validation_timeout(&self) -> Duration {
        Duration::from_millis(self.topology_validation_timeout_ms)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = toml::from_str(&text).map_err(|e| Error::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }
}

static CONFIG: Lazy<ArcSwap<Config>> = Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// The current configuration snapshot.
pub fn config() -> Arc<Config> {
    CONFIG.load_full()
}

/// Replace the global configuration (e.g. on SIGHUP reload).
pub fn set(config: Config) -> Result<Arc<Config>, Error> {
    config.validate()?;
    let arc = Arc::new(config);
    CONFIG.store(arc.clone());
    Ok(arc)
}

/// Load from `path` and install as the global configuration.
pub fn load(path: impl AsRef<Path>) -> Result<Arc<Config>, Error> {
    let config = Config::load(path)?;
    set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_immutable_partitions_auto() {
        let c = Config::default();
        assert_eq!(c.partitions, Partitions::Auto);
    }

    #[test]
    fn conn_per_shard_zero_selects_one_effective() {
        let c = Config::default();
        assert_eq!(c.effective_conn_per_shard(), 1);
    }

    #[test]
    fn timeout_zero_is_rejected() {
        let mut c = Config::default();
        c.timeout_ms = Some(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<Config>("bogus_key = 1").unwrap_err();
        assert!(err.to_string().contains("unknown field") || err.to_string().contains("bogus_key"));
    }

    #[test]
    fn topology_validation_timeout_zero_disables_wait() {
        let mut c = Config::default();
        c.topology_validation_timeout_ms = 0;
        assert_eq!(c.topology_validation_timeout(), Duration::from_millis(0));
    }
}
