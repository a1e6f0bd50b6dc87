//! Process configuration from environment variables.
//!
//! # Invariants
//! - Missing variables fall back to documented defaults (logged at info).
//! - Present but malformed variables are errors, never silently defaulted.

use crate::logging::default_log_level;
use crate::model::calendar::offset_from_minutes;
use chrono::{FixedOffset, Offset, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "SCHOOLFLOW_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "SCHOOLFLOW_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SCHOOLFLOW_LOG_DIR";
pub const ENV_UTC_OFFSET_MINUTES: &str = "SCHOOLFLOW_UTC_OFFSET_MINUTES";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SCHOOLFLOW_BUSY_TIMEOUT_MS";

const DEFAULT_DB_PATH: &str = "schoolflow.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} value `{}`: {}", self.key, self.value, self.reason)
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Rolling file logs are written here when set.
    pub log_dir: Option<PathBuf>,
    /// Minutes east of UTC of the calendar that defines attendance days.
    pub utc_offset_minutes: i32,
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            utc_offset_minutes: 0,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = var(ENV_DB_PATH).map_or_else(
            || {
                info!("event=config_default module=config key={ENV_DB_PATH} value={DEFAULT_DB_PATH}");
                defaults.db_path.clone()
            },
            PathBuf::from,
        );
        let log_level = var(ENV_LOG_LEVEL).unwrap_or_else(|| defaults.log_level.clone());
        let log_dir = var(ENV_LOG_DIR).map(PathBuf::from);

        let utc_offset_minutes = match var(ENV_UTC_OFFSET_MINUTES) {
            Some(raw) => {
                let minutes: i32 = parse_value(ENV_UTC_OFFSET_MINUTES, &raw)?;
                if offset_from_minutes(minutes).is_none() {
                    return Err(ConfigError {
                        key: ENV_UTC_OFFSET_MINUTES,
                        value: raw,
                        reason: "expected -1439..=1439".to_string(),
                    });
                }
                minutes
            }
            None => defaults.utc_offset_minutes,
        };

        let busy_timeout_ms = match var(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => parse_value(ENV_BUSY_TIMEOUT_MS, &raw)?,
            None => defaults.busy_timeout_ms,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            utc_offset_minutes,
            busy_timeout_ms,
        })
    }

    /// Reference calendar offset used for attendance day windows.
    pub fn zone(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|err: T::Err| ConfigError {
        key,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{
        CoreConfig, ConfigError, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_LOG_DIR,
        ENV_UTC_OFFSET_MINUTES,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(pairs: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load(&[]).expect("defaults should load");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.zone().local_minus_utc(), 0);
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = load(&[
            (ENV_DB_PATH, " /tmp/school.db "),
            (ENV_LOG_DIR, "/tmp/logs"),
            (ENV_UTC_OFFSET_MINUTES, "330"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
        ])
        .expect("config should load");
        assert_eq!(config.db_path, PathBuf::from("/tmp/school.db"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.zone().local_minus_utc(), 330 * 60);
        assert_eq!(config.busy_timeout().as_millis(), 250);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = load(&[(ENV_UTC_OFFSET_MINUTES, "abc")]).unwrap_err();
        assert_eq!(err.key, ENV_UTC_OFFSET_MINUTES);

        let err = load(&[(ENV_UTC_OFFSET_MINUTES, "1500")]).unwrap_err();
        assert!(err.to_string().contains("-1439..=1439"));

        assert!(load(&[(ENV_BUSY_TIMEOUT_MS, "-1")]).is_err());
    }
}
