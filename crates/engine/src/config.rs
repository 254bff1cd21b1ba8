//! Engine configuration from environment variables.

use std::time::Duration;

use crate::infrastructure::email::DEFAULT_EMAIL_FROM;
use crate::infrastructure::image_prep::{ImagePrepConfig, DEFAULT_MAX_BYTES, DEFAULT_MAX_DIMENSION};
use crate::infrastructure::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::infrastructure::renderer::DEFAULT_RENDERER_URL;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:playbymail.db?mode=rwc";

/// Scheduler cadence bounds, in seconds.
pub const SCHEDULER_INTERVAL_SECS: u64 = 30;
pub const SCHEDULER_INTERVAL_MIN_SECS: u64 = 15;
pub const SCHEDULER_INTERVAL_MAX_SECS: u64 = 60;

/// Default age, in hours, after which finished jobs are deleted.
pub const JOB_RETENTION_HOURS: u64 = 7 * 24;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub renderer_url: String,
    pub turn_sheet_code_key: String,
    pub scheduler_interval: Duration,
    pub game_queue_workers: usize,
    pub default_queue_workers: usize,
    pub job_timeout: Duration,
    /// Finished jobs older than this are deleted by the scheduler.
    pub job_retention: Duration,
    pub image: ImagePrepConfig,
    pub email_from: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));
        let or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let scheduler_secs = parsed(&var, "SCHEDULER_INTERVAL_SECS", SCHEDULER_INTERVAL_SECS)?
            .clamp(SCHEDULER_INTERVAL_MIN_SECS, SCHEDULER_INTERVAL_MAX_SECS);

        let image = ImagePrepConfig {
            max_dimension: parsed(&var, "IMAGE_MAX_DIMENSION", DEFAULT_MAX_DIMENSION)?,
            max_bytes: parsed(&var, "IMAGE_MAX_BYTES", DEFAULT_MAX_BYTES)?,
            ..ImagePrepConfig::default()
        };

        Ok(Self {
            database_url: or("DATABASE_URL", DEFAULT_DATABASE_URL),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            renderer_url: or("RENDERER_URL", DEFAULT_RENDERER_URL),
            turn_sheet_code_key: required("TURN_SHEET_CODE_KEY")?,
            scheduler_interval: Duration::from_secs(scheduler_secs),
            game_queue_workers: parsed::<usize, _>(&var, "GAME_QUEUE_WORKERS", 2)?.max(1),
            default_queue_workers: parsed::<usize, _>(&var, "DEFAULT_QUEUE_WORKERS", 4)?.max(1),
            job_timeout: Duration::from_secs(parsed(&var, "JOB_TIMEOUT_SECS", 300)?),
            job_retention: Duration::from_secs(
                parsed::<u64, _>(&var, "JOB_RETENTION_HOURS", JOB_RETENTION_HOURS)?
                    .max(1)
                    .saturating_mul(60 * 60),
            ),
            image,
            email_from: or("EMAIL_FROM", DEFAULT_EMAIL_FROM),
        })
    }
}

fn parsed<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[("OPENAI_API_KEY", "sk-test"), ("TURN_SHEET_CODE_KEY", "k")];

    #[test]
    fn defaults_apply() {
        let config = config(REQUIRED).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.scheduler_interval, Duration::from_secs(30));
        assert_eq!(config.image.max_dimension, 2000);
        assert_eq!(config.image.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.renderer_url, DEFAULT_RENDERER_URL);
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.job_retention, Duration::from_secs(168 * 60 * 60));
    }

    #[test]
    fn job_retention_is_read_in_hours() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("JOB_RETENTION_HOURS", "48"));
        assert_eq!(config(&vars).unwrap().job_retention, Duration::from_secs(48 * 60 * 60));

        vars.pop();
        vars.push(("JOB_RETENTION_HOURS", "0"));
        assert_eq!(config(&vars).unwrap().job_retention, Duration::from_secs(60 * 60));
    }

    #[test]
    fn scheduler_interval_is_clamped() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SCHEDULER_INTERVAL_SECS", "5"));
        assert_eq!(config(&vars).unwrap().scheduler_interval, Duration::from_secs(15));

        vars.pop();
        vars.push(("SCHEDULER_INTERVAL_SECS", "600"));
        assert_eq!(config(&vars).unwrap().scheduler_interval, Duration::from_secs(60));
    }

    #[test]
    fn missing_code_key_is_an_error() {
        let err = config(&[("OPENAI_API_KEY", "sk-test"), ("TURN_SHEET_CODE_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TURN_SHEET_CODE_KEY")));
    }

    #[test]
    fn unparsable_numbers_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("GAME_QUEUE_WORKERS", "many"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid { name: "GAME_QUEUE_WORKERS", .. })
        ));
    }
}
