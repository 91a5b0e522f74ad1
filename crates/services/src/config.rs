use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::latency::{FixedLatency, Latency, SimulatedLatency};
use crate::theme_service::THEME_STORAGE_KEY;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatencyMode {
    Simulated,
    Instant,
}

impl LatencyMode {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simulated" => Some(Self::Simulated),
            "instant" | "none" => Some(Self::Instant),
            _ => None,
        }
    }
}

/// Runtime settings for a course session.
#[derive(Clone, Debug)]
pub struct CourseConfig {
    pub database_url: String,
    pub theme_key: String,
    pub latency: LatencyMode,
    pub cached_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub read_dwell: Duration,
    pub video_load_timeout: Duration,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://course.sqlite3".into(),
            theme_key: THEME_STORAGE_KEY.into(),
            latency: LatencyMode::Simulated,
            cached_delay: Duration::from_millis(300),
            min_delay: Duration::from_millis(800),
            max_delay: Duration::from_millis(2000),
            read_dwell: Duration::from_secs(3),
            video_load_timeout: Duration::from_secs(10),
        }
    }
}

impl CourseConfig {
    /// Defaults overridden by `COURSE_DB_URL`, `COURSE_LATENCY` and `COURSE_READ_DWELL_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            database_url: lookup("COURSE_DB_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.database_url),
            latency: lookup("COURSE_LATENCY")
                .and_then(|v| LatencyMode::parse(&v))
                .unwrap_or(default.latency),
            read_dwell: lookup("COURSE_READ_DWELL_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(default.read_dwell, Duration::from_millis),
            ..default
        }
    }

    /// The delay policy the course service should use.
    #[must_use]
    pub fn latency_policy(&self) -> Arc<dyn Latency> {
        match self.latency {
            LatencyMode::Simulated => Arc::new(SimulatedLatency::new(
                self.cached_delay,
                self.min_delay,
                self.max_delay,
            )),
            LatencyMode::Instant => Arc::new(FixedLatency::instant()),
        }
    }
}
