use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CairnConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::writers")]
    pub writers: usize,
    #[serde(default = "defaults::readers")]
    pub readers: usize,
    #[serde(default)]
    pub pool: PoolSection,
    #[serde(default)]
    pub pacing: PacingSection,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PoolSection {
    #[serde(default = "defaults::slot_count")]
    pub slot_count: usize,
    #[serde(default = "defaults::slot_size")]
    pub slot_size: usize,
}

/// How long workers sit on a claimed slot, and how long a claim may wait.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PacingSection {
    #[serde(default)]
    pub writer_hold_ms: u64,
    #[serde(default)]
    pub reader_hold_ms: u64,
    /// 0 blocks indefinitely.
    #[serde(default)]
    pub claim_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn writers() -> usize {
        2
    }

    pub fn readers() -> usize {
        3
    }

    pub fn slot_count() -> usize {
        5
    }

    pub fn slot_size() -> usize {
        500
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            slot_count: defaults::slot_count(),
            slot_size: defaults::slot_size(),
        }
    }
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            writers: defaults::writers(),
            readers: defaults::readers(),
            pool: PoolSection::default(),
            pacing: PacingSection::default(),
        }
    }
}

impl PacingSection {
    pub fn writer_hold(&self) -> Duration {
        Duration::from_millis(self.writer_hold_ms)
    }

    pub fn reader_hold(&self) -> Duration {
        Duration::from_millis(self.reader_hold_ms)
    }

    /// `None` when claims should block until a slot or stop.
    pub fn claim_timeout(&self) -> Option<Duration> {
        (self.claim_timeout_ms > 0).then(|| Duration::from_millis(self.claim_timeout_ms))
    }
}

impl CairnConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&toml_to_str)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cairn_config: CairnConfig = toml::from_str(text)?;
        cairn_config.validate()?;
        Ok(cairn_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.writers == 0 {
            return invalid("writers", "must be at least 1");
        }
        if self.readers == 0 {
            return invalid("readers", "must be at least 1");
        }
        if self.pool.slot_count == 0 {
            return invalid("pool.slot_count", "must be at least 1");
        }
        if self.pool.slot_size == 0 {
            return invalid("pool.slot_size", "must be at least 1");
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return invalid("log_level", "must be one of trace, debug, info, warn, error");
        }
        Ok(())
    }
}
