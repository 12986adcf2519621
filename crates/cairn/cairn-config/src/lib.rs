mod config;

pub use config::{CairnConfig, ConfigError, PacingSection, PoolSection};
