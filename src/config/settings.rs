use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::domain::rating_type::RatingTypePolicy;

pub struct ApiSettings {
    pub base_url: String,
    pub game: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_factor_secs: u64,
    pub max_backoff_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://aoe2.net/api".to_string(),
            game: "aoe2de".to_string(),
            user_agent: "aoe2stats/0.1".to_string(),
            timeout_secs: 30,
            max_retries: 6,
            backoff_factor_secs: 10,
            max_backoff_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub page_size: usize,
    pub gap_threshold_secs: i64,
    pub backward_jump_secs: i64,
    pub quiet_pages_before_reverse: u32,
    pub page_delay_ms: u64,
    pub resume_overlap_secs: i64,
    pub default_lookback_secs: i64,
    pub rating_type_policy: RatingTypePolicy,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            gap_threshold_secs: 1200,
            backward_jump_secs: 4 * 60 * 60,
            quiet_pages_before_reverse: 2,
            page_delay_ms: 5000,
            resume_overlap_secs: 90 * 60,
            default_lookback_secs: 7 * 24 * 60 * 60,
            rating_type_policy: RatingTypePolicy::Declared,
        }
    }
}

impl IngestSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

#[derive(Debug, Clone)]
pub struct BackfillSettings {
    pub page_size: usize,
    pub page_delay_ms: u64,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            page_delay_ms: 5000,
        }
    }
}

impl BackfillSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

pub struct DatabaseSettings {
    pub path: String,
    pub batch_size: usize,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "aoe2stats.db".to_string(),
            batch_size: 300,
        }
    }
}

pub struct AppConfig {
    pub api: ApiSettings,
    pub ingest: IngestSettings,
    pub backfill: BackfillSettings,
    pub database: DatabaseSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            api: ApiSettings::default(),
            ingest: IngestSettings::default(),
            backfill: BackfillSettings::default(),
            database: DatabaseSettings::default(),
        }
    }

    /// Defaults with environment overrides applied on top.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(url) = lookup("AOE2_API_BASE_URL") {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(delay) = parse_override(&lookup, "AOE2_PAGE_DELAY_MS")? {
            self.ingest.page_delay_ms = delay;
            self.backfill.page_delay_ms = delay;
        }
        if let Some(retries) = parse_override(&lookup, "AOE2_MAX_RETRIES")? {
            self.api.max_retries = retries;
        }
        if let Some(policy) = parse_override(&lookup, "AOE2_RATING_TYPE_POLICY")? {
            self.ingest.rating_type_policy = policy;
        }
        Ok(())
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {raw:?}"))
        })
        .transpose()
}
