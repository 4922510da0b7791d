use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kit_sync::DelayConfig;
use kit_util::SECRET_LEN;

/// Settings read from `kit.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitConfig {
    pub backoff: DelayConfig,
    pub secret: SecretConfig,
    pub fs: FsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    pub length: usize,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self { length: SECRET_LEN }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub poll_interval_ms: u64,
    /// 0 disables the timeout.
    pub wait_timeout_secs: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: kit_fs::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            wait_timeout_secs: 0,
        }
    }
}

impl FsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl KitConfig {
    /// Load from `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
