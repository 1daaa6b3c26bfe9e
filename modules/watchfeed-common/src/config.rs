use std::env;
use std::str::FromStr;

use chrono::Duration;
use tracing::info;

use crate::error::WatchfeedError;

/// Detection windows and classification thresholds shared by every detector.
///
/// Defaults are the production values. Each field can be overridden from a
/// `WATCHFEED_*` environment variable via [`MonitorConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    // Windows
    pub job_window_days: i64,
    pub update_window_days: i64,
    pub warm_path_window_days: i64,

    // Hiring heat tiers
    pub min_new_jobs: usize,
    pub hot_threshold: usize,
    pub very_hot_threshold: usize,

    // Job alerts
    pub match_score_cutoff: u8,

    // Presentation limits
    pub max_top_titles: usize,
    pub insight_text_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            job_window_days: 7,
            update_window_days: 7,
            warm_path_window_days: 30,
            min_new_jobs: 3,
            hot_threshold: 6,
            very_hot_threshold: 10,
            match_score_cutoff: 50,
            max_top_titles: 3,
            insight_text_limit: 200,
        }
    }
}

impl MonitorConfig {
    /// Load defaults, then apply any `WATCHFEED_*` overrides present in the environment.
    pub fn from_env() -> Result<Self, WatchfeedError> {
        let defaults = Self::default();
        let config = Self {
            job_window_days: env_or("WATCHFEED_JOB_WINDOW_DAYS", defaults.job_window_days)?,
            update_window_days: env_or(
                "WATCHFEED_UPDATE_WINDOW_DAYS",
                defaults.update_window_days,
            )?,
            warm_path_window_days: env_or(
                "WATCHFEED_WARM_PATH_WINDOW_DAYS",
                defaults.warm_path_window_days,
            )?,
            min_new_jobs: env_or("WATCHFEED_MIN_NEW_JOBS", defaults.min_new_jobs)?,
            hot_threshold: env_or("WATCHFEED_HOT_THRESHOLD", defaults.hot_threshold)?,
            very_hot_threshold: env_or(
                "WATCHFEED_VERY_HOT_THRESHOLD",
                defaults.very_hot_threshold,
            )?,
            match_score_cutoff: env_or(
                "WATCHFEED_MATCH_SCORE_CUTOFF",
                defaults.match_score_cutoff,
            )?,
            max_top_titles: env_or("WATCHFEED_MAX_TOP_TITLES", defaults.max_top_titles)?,
            insight_text_limit: env_or(
                "WATCHFEED_INSIGHT_TEXT_LIMIT",
                defaults.insight_text_limit,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Tiers must be ordered or the heat classification is meaningless.
    pub fn validate(&self) -> Result<(), WatchfeedError> {
        if self.min_new_jobs == 0 {
            return Err(WatchfeedError::Config("min_new_jobs must be at least 1".into()));
        }
        if !(self.min_new_jobs <= self.hot_threshold && self.hot_threshold <= self.very_hot_threshold)
        {
            return Err(WatchfeedError::Config(format!(
                "heat tiers must be ordered: min_new_jobs={} hot={} very_hot={}",
                self.min_new_jobs, self.hot_threshold, self.very_hot_threshold
            )));
        }
        if self.match_score_cutoff > 100 {
            return Err(WatchfeedError::Config(format!(
                "match_score_cutoff must be 0..=100, got {}",
                self.match_score_cutoff
            )));
        }
        if self.job_window_days <= 0 || self.update_window_days <= 0 || self.warm_path_window_days <= 0
        {
            return Err(WatchfeedError::Config("detection windows must be positive".into()));
        }
        Ok(())
    }

    pub fn job_window(&self) -> Duration {
        Duration::days(self.job_window_days)
    }

    pub fn update_window(&self) -> Duration {
        Duration::days(self.update_window_days)
    }

    pub fn warm_path_window(&self) -> Duration {
        Duration::days(self.warm_path_window_days)
    }

    /// Log the effective configuration at startup.
    pub fn log_effective(&self) {
        info!(
            job_window_days = self.job_window_days,
            update_window_days = self.update_window_days,
            warm_path_window_days = self.warm_path_window_days,
            min_new_jobs = self.min_new_jobs,
            hot_threshold = self.hot_threshold,
            very_hot_threshold = self.very_hot_threshold,
            match_score_cutoff = self.match_score_cutoff,
            "Monitor configuration"
        );
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, WatchfeedError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| WatchfeedError::Config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_constants() {
        let config = MonitorConfig::default();
        assert_eq!(config.job_window_days, 7);
        assert_eq!(config.update_window_days, 7);
        assert_eq!(config.warm_path_window_days, 30);
        assert_eq!(config.min_new_jobs, 3);
        assert_eq!(config.hot_threshold, 6);
        assert_eq!(config.very_hot_threshold, 10);
        assert_eq!(config.match_score_cutoff, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unordered_tiers_are_rejected() {
        let config = MonitorConfig {
            hot_threshold: 12,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(WatchfeedError::Config(_))));
    }

    #[test]
    fn zero_min_new_jobs_is_rejected() {
        let config = MonitorConfig {
            min_new_jobs: 0,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(WatchfeedError::Config(_))));
    }

    #[test]
    fn cutoff_above_hundred_is_rejected() {
        let config = MonitorConfig {
            match_score_cutoff: 101,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_is_parsed() {
        std::env::set_var("WATCHFEED_TEST_ONLY_WINDOW", "14");
        let value: i64 = env_or("WATCHFEED_TEST_ONLY_WINDOW", 7).unwrap();
        assert_eq!(value, 14);
        std::env::remove_var("WATCHFEED_TEST_ONLY_WINDOW");
    }

    #[test]
    fn bad_env_value_is_a_config_error() {
        std::env::set_var("WATCHFEED_TEST_ONLY_BAD", "seven");
        let result: Result<i64, _> = env_or("WATCHFEED_TEST_ONLY_BAD", 7);
        assert!(matches!(result, Err(WatchfeedError::Config(_))));
        std::env::remove_var("WATCHFEED_TEST_ONLY_BAD");
    }
}
