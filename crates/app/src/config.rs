use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quiz_core::AssessmentConfig;
use quiz_core::config::{
    ConfigError as AssessmentConfigError, DEFAULT_TARGET_QUESTION_COUNT,
    DEFAULT_TIME_BUDGET_TICKS, DEFAULT_TICK_INTERVAL,
};
use services::DEFAULT_PASS_THRESHOLD_PERCENT;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error(transparent)]
    Assessment(#[from] AssessmentConfigError),
}

/// Values supplied on the command line; each one beats its environment
/// variable.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub budget: Option<u32>,
    pub count: Option<u32>,
    pub tick_ms: Option<u64>,
    pub pass_percent: Option<f64>,
    pub bank: Option<PathBuf>,
    pub no_shuffle: bool,
}

/// Resolved settings for one `quiz run`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub assessment: AssessmentConfig,
    pub pass_percent: f64,
    pub bank: Option<PathBuf>,
    pub shuffle: bool,
    pub log_level: String,
}

impl AppConfig {
    /// Read `.env`, then the `QUIZ_*` variables, then apply `overrides`.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::resolve(|key| env::var(key).ok(), overrides)
    }

    fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let budget = match overrides.budget {
            Some(value) => value,
            None => parse_var(&lookup, "QUIZ_TIME_BUDGET")?.unwrap_or(DEFAULT_TIME_BUDGET_TICKS),
        };
        let count = match overrides.count {
            Some(value) => value,
            None => {
                parse_var(&lookup, "QUIZ_QUESTION_COUNT")?.unwrap_or(DEFAULT_TARGET_QUESTION_COUNT)
            }
        };
        let tick = match overrides.tick_ms {
            Some(ms) => Duration::from_millis(ms),
            None => parse_var::<u64>(&lookup, "QUIZ_TICK_MS")?
                .map_or(DEFAULT_TICK_INTERVAL, Duration::from_millis),
        };
        let pass_percent = match overrides.pass_percent {
            Some(value) => value,
            None => {
                parse_var(&lookup, "QUIZ_PASS_PERCENT")?.unwrap_or(DEFAULT_PASS_THRESHOLD_PERCENT)
            }
        };
        let bank = overrides
            .bank
            .clone()
            .or_else(|| lookup("QUIZ_BANK").filter(|v| !v.trim().is_empty()).map(PathBuf::from));
        let log_level = lookup("QUIZ_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());

        Ok(Self {
            assessment: AssessmentConfig::new(budget, count, tick)?,
            pass_percent,
            bank,
            shuffle: !overrides.no_shuffle,
            log_level,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { key, value: raw })
}
