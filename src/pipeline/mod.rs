//! Collection, normalization and deduplication wired into one run.

pub mod ingestion;
pub mod processing;
pub mod utils;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::observability::metrics;
use crate::types::{ReconciliationResult, ReconciliationStats, SourceAdapter};
use crate::window::{target_window, WindowConfig};

use ingestion::{CollectOutcome, Collector};
use processing::normalize::{CategoryKnowledgeBase, Normalizer};
use processing::Deduplicator;

/// Collector -> window -> Normalizer -> Deduplicator
pub struct ReconciliationPipeline {
    collector: Collector,
    normalizer: Normalizer,
    deduplicator: Deduplicator,
    categories: CategoryKnowledgeBase,
    timezone: Tz,
    window: WindowConfig,
}

impl ReconciliationPipeline {
    pub fn new(
        collector: Collector,
        normalizer: Normalizer,
        deduplicator: Deduplicator,
        categories: CategoryKnowledgeBase,
        timezone: Tz,
        window: WindowConfig,
    ) -> Self {
        Self { collector, normalizer, deduplicator, categories, timezone, window }
    }

    pub fn from_config(config: &Config, categories: CategoryKnowledgeBase) -> Result<Self> {
        let timezone = config.timezone()?;
        let normalizer = Normalizer::new(config.normalize.clone(), timezone)
            .with_silent_periods(config.silent_periods()?);
        Ok(Self::new(
            Collector::new(config.collect.clone()),
            normalizer,
            Deduplicator::new(config.similarity.clone()),
            categories,
            timezone,
            config.window_config()?,
        ))
    }

    pub fn categories(&self) -> &CategoryKnowledgeBase {
        &self.categories
    }

    /// Full run against live adapters. Fails only when collection itself is
    /// fatal (no adapters, every adapter panicked).
    #[instrument(skip_all, fields(sources = adapters.len()))]
    pub async fn reconcile(
        &self,
        adapters: &[Arc<dyn SourceAdapter>],
        now: DateTime<Utc>,
    ) -> Result<ReconciliationResult> {
        info!("🚀 Starting reconciliation for {} sources", adapters.len());
        let started = Instant::now();
        let collected = self.collector.collect(adapters).await?;
        let source_timezones: HashMap<String, Tz> = adapters
            .iter()
            .filter_map(|adapter| adapter.timezone().map(|tz| (adapter.source_id().to_string(), tz)))
            .collect();

        let result = self.reconcile_collected(collected, source_timezones, now);
        metrics::pipeline::run_completed(started.elapsed().as_secs_f64(), result.events.len());
        Ok(result)
    }

    /// Everything after collection. Pure: the same outcome and `now` always
    /// produce the same result.
    pub fn reconcile_collected(
        &self,
        collected: CollectOutcome,
        source_timezones: HashMap<String, Tz>,
        now: DateTime<Utc>,
    ) -> ReconciliationResult {
        let window = target_window(now, self.timezone, &self.window);
        info!(start = %window.start, end = %window.end, "📅 Target window");

        let CollectOutcome { candidates, errors, per_source_fetched } = collected;
        let fetched = candidates.len();

        let normalized = self
            .normalizer
            .clone()
            .with_source_timezones(source_timezones)
            .normalize(candidates, &window, &self.categories);
        let events = self.deduplicator.deduplicate(&normalized.events);

        let mut rejected_by_reason: BTreeMap<String, usize> = BTreeMap::new();
        for rejected in &normalized.rejected {
            *rejected_by_reason.entry(rejected.reason.label().to_string()).or_default() += 1;
        }
        let mut per_source_errors: BTreeMap<String, usize> = BTreeMap::new();
        for error in &errors {
            *per_source_errors.entry(error.source_id.clone()).or_default() += 1;
        }

        let stats = ReconciliationStats {
            fetched,
            normalized: normalized.events.len(),
            rejected: normalized.rejected.len(),
            rejected_by_reason,
            duplicates_merged: normalized.events.len() - events.len(),
            emitted: events.len(),
            per_source_errors,
            per_source_fetched,
        };
        info!(
            fetched = stats.fetched,
            rejected = stats.rejected,
            merged = stats.duplicates_merged,
            emitted = stats.emitted,
            failed_sources = errors.len(),
            "✅ Reconciliation finished"
        );

        ReconciliationResult {
            window,
            events,
            stats,
            errors,
            rejected: normalized.rejected,
            learned_categories: normalized.learned,
        }
    }
}
