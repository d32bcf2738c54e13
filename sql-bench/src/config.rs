//! Run configuration: the properties file plus process-level settings.

use crate::consumer::ByteCountPolicy;
use crate::error::BenchError;
use bench_core::properties::Properties;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_VAR: &str = "SQL_BENCH_CONFIG";
pub const REPEAT_VAR: &str = "SQL_BENCH_REPEAT";
pub const PAUSE_VAR: &str = "SQL_BENCH_PAUSE_MS";
pub const LOG_LEVEL_VAR: &str = "SQL_BENCH_LOG_LEVEL";
pub const LOG_FILE_VAR: &str = "SQL_BENCH_LOG_FILE";

pub const DEFAULT_CONFIG_FILE: &str = "sql-bench.properties";
pub const DEFAULT_REPEAT: usize = 100;
pub const DEFAULT_PAUSE_MS: u64 = 100;

/// Process-level settings that sit outside the properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub repeat: usize,
    /// Exclusive upper bound of the random pause between trials.
    pub max_pause: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            repeat: DEFAULT_REPEAT,
            max_pause: Duration::from_millis(DEFAULT_PAUSE_MS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, BenchError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup, so callers other than the
    /// process environment can supply values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BenchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(path) = lookup(CONFIG_VAR).filter(|p| !p.trim().is_empty()) {
            settings.config_path = PathBuf::from(path.trim());
        }
        if let Some(raw) = lookup(REPEAT_VAR) {
            settings.repeat = raw.trim().parse().map_err(|_| {
                BenchError::Config(format!("{REPEAT_VAR} must be a non-negative integer, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup(PAUSE_VAR) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                BenchError::Config(format!("{PAUSE_VAR} must be a number of milliseconds, got {raw:?}"))
            })?;
            settings.max_pause = Duration::from_millis(millis);
        }

        Ok(settings)
    }
}

/// Connection target, query and parameters read from the properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub user: String,
    pub password: String,
    pub url: String,
    pub driver: String,
    pub query: String,
    pub byte_policy: ByteCountPolicy,
    params: BTreeMap<usize, String>,
}

impl BenchmarkConfig {
    /// Reads the properties file named by `settings`.
    pub fn load(settings: &Settings) -> Result<Self, BenchError> {
        let path = &settings.config_path;
        let props = Properties::load(path).map_err(|source| BenchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_properties(&props)
    }

    pub fn from_properties(props: &Properties) -> Result<Self, BenchError> {
        let required = |key: &str| {
            props
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| BenchError::Config(format!("missing required property `{key}`")))
        };

        let byte_policy = match props.get("bytes.policy") {
            None => ByteCountPolicy::default(),
            Some(raw) => ByteCountPolicy::from_name(raw).ok_or_else(|| {
                BenchError::Config(format!(
                    "bytes.policy must be `column` or `first-column`, got {raw:?}"
                ))
            })?,
        };

        let params = props
            .iter()
            .filter_map(|(key, value)| {
                let index = key.strip_prefix('p')?.parse::<usize>().ok()?;
                (index > 0).then(|| (index, value.to_string()))
            })
            .collect();

        Ok(Self {
            user: props.get("user").unwrap_or_default().to_string(),
            password: props.get("password").unwrap_or_default().to_string(),
            url: required("url")?,
            driver: required("driver")?,
            query: required("query")?,
            byte_policy,
            params,
        })
    }

    /// Raw `p{index}` entry, if configured.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(&index).map(String::as_str)
    }
}
