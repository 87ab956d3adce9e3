use std::time::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("time budget must be > 0 ticks")]
    InvalidTimeBudget,

    #[error("target question count must be > 0")]
    InvalidQuestionCount,

    #[error("tick interval must be between 1ms and 60s")]
    InvalidTickInterval,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Ticks each question may stay on screen before it times out.
pub const DEFAULT_TIME_BUDGET_TICKS: u32 = 30;
/// Number of questions requested from the question source.
pub const DEFAULT_TARGET_QUESTION_COUNT: u32 = 20;
/// Wall-clock length of one tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Timing and sizing knobs for an assessment session.
///
/// The pass threshold is deliberately absent: it belongs to the grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentConfig {
    time_budget_ticks: u32,
    target_question_count: u32,
    tick_interval: Duration,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            time_budget_ticks: DEFAULT_TIME_BUDGET_TICKS,
            target_question_count: DEFAULT_TARGET_QUESTION_COUNT,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl AssessmentConfig {
    /// Creates a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the budget or count is zero, or the tick interval is
    /// zero or longer than a minute.
    pub fn new(
        time_budget_ticks: u32,
        target_question_count: u32,
        tick_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if time_budget_ticks == 0 {
            return Err(ConfigError::InvalidTimeBudget);
        }
        if target_question_count == 0 {
            return Err(ConfigError::InvalidQuestionCount);
        }
        if tick_interval.is_zero() || tick_interval > MAX_TICK_INTERVAL {
            return Err(ConfigError::InvalidTickInterval);
        }

        Ok(Self {
            time_budget_ticks,
            target_question_count,
            tick_interval,
        })
    }

    #[must_use]
    pub fn time_budget_ticks(&self) -> u32 {
        self.time_budget_ticks
    }

    #[must_use]
    pub fn target_question_count(&self) -> u32 {
        self.target_question_count
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Total wall-clock time one question may take.
    #[must_use]
    pub fn question_duration(&self) -> Duration {
        self.tick_interval.saturating_mul(self.time_budget_ticks)
    }
}
