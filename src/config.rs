// src/config.rs
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::drivers::scheduler::MAX_TIMER_INTERVAL_MS;
use crate::drivers::{CalibrationTiming, DriverError, MAX_WINDOW_SECONDS};

pub const CONFIG_ENV: &str = "ATEMGURT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "atemgurt.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(#[from] DriverError),
}

/// 运行参数，全部可选，缺省值与演示版一致
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window_seconds: f64,
    pub retention_seconds: f64,
    pub tick_interval_ms: u64,
    pub countdown_steps: u32,
    pub countdown_interval_ms: u64,
    pub sampling_interval_ms: u64,
    pub sampling_duration_ms: u64,
    pub ui_refresh_ms: u64,
    pub max_timer_lag_ms: u64,
    pub sim_phase_step: f64,
    pub sim_noise: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_seconds: 10.0,
            retention_seconds: 20.0,
            tick_interval_ms: 50,
            countdown_steps: 3,
            countdown_interval_ms: 1000,
            sampling_interval_ms: 50,
            sampling_duration_ms: 2000,
            ui_refresh_ms: 150,
            max_timer_lag_ms: 1000,
            sim_phase_step: 0.1,
            sim_noise: 0.0,
        }
    }
}

impl AppConfig {
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    // 环境变量优先，其次是当前目录下的 atemgurt.json，都没有则用缺省值
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(std::env::var_os(CONFIG_ENV), Path::new("."))
    }

    fn load_from(env_path: Option<OsString>, dir: &Path) -> Result<Self, ConfigError> {
        let path = match env_path {
            Some(p) => PathBuf::from(p),
            None => {
                let local = dir.join(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    info!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                local
            }
        };
        let config = Self::load_file(&path)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        let tick_ok = |ms: u64| (1..=MAX_TIMER_INTERVAL_MS).contains(&ms);
        if !tick_ok(self.tick_interval_ms) || !tick_ok(self.ui_refresh_ms) {
            return Err(DriverError::InvalidTickInterval);
        }
        if !(self.window_seconds.is_finite()
            && self.window_seconds > 0.0
            && self.window_seconds <= MAX_WINDOW_SECONDS)
        {
            return Err(DriverError::InvalidWindow(self.window_seconds));
        }
        if !(self.retention_seconds.is_finite()
            && self.retention_seconds >= 0.0
            && self.retention_seconds <= MAX_WINDOW_SECONDS)
        {
            return Err(DriverError::InvalidRetention(self.retention_seconds));
        }
        CalibrationTiming::new(
            self.countdown_steps,
            self.countdown_interval_ms,
            self.sampling_interval_ms,
            self.sampling_duration_ms,
        )?;
        Ok(())
    }
}
