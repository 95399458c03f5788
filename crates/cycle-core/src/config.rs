//! groupcycle.toml configuration parser.
//!
//! All settings live in an explicit config struct passed to component
//! constructors; there is no process-wide mutable state. CLI flags may
//! override individual fields after loading.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a rollout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Region the group lives in.
    pub region: Option<String>,
    /// Name of the compute group to cycle.
    pub group: Option<String>,
    /// Time between evaluation cycles, e.g. "30s" or "1m".
    pub poll_interval: Option<String>,
    pub baseline: Option<BaselineConfig>,
    pub credentials: Option<CredentialsConfig>,
    /// Extra provider-specific settings, passed through opaquely.
    pub provider: Option<HashMap<String, toml::Value>>,
}

/// Where the capacity baseline is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// "tags" (pairs on the group, the default) or "local" (embedded
    /// blob store at `path`).
    pub backend: Option<String>,
    pub path: Option<String>,
}

/// Static credentials for the cloud APIs. Optional; providers may read
/// their environment's default credential chain instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl CycleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CycleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Poll interval with the 30 second default applied.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(Duration::from_secs(30))
    }

    /// Baseline backend name with the default applied.
    pub fn baseline_backend(&self) -> &str {
        self.baseline
            .as_ref()
            .and_then(|b| b.backend.as_deref())
            .unwrap_or("tags")
    }
}

/// Parse a duration string like "30s", "500ms", "5m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
