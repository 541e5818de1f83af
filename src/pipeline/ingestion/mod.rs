pub mod collector;
pub mod retry;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use collector::{CollectOutcome, Collector};
pub use retry::{AttemptState, RetryPolicy};

/// Concurrency, timeout and retry settings for source collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    pub max_concurrent_sources: usize,
    pub per_source_timeout_seconds: f64,
    pub collection_timeout_seconds: f64,
    pub retry_failed_sources: bool,
    pub max_retries: u32,
    pub retry_backoff_seconds: f64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: 4,
            per_source_timeout_seconds: 20.0,
            collection_timeout_seconds: 90.0,
            retry_failed_sources: true,
            max_retries: 2,
            retry_backoff_seconds: 1.5,
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

impl CollectConfig {
    pub fn per_source_timeout(&self) -> Duration {
        seconds(self.per_source_timeout_seconds)
    }

    pub fn collection_timeout(&self) -> Duration {
        seconds(self.collection_timeout_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        seconds(self.retry_backoff_seconds)
    }
}
