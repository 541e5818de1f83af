//! Metrics for the reconciliation run.
//!
//! Recording goes through the `metrics` facade, so every helper is a no-op
//! until [`init_metrics`] installs the Prometheus recorder.

use std::fmt;
use std::net::SocketAddr;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Environment variable holding an optional `host:port` to serve `/metrics` on
pub const METRICS_ADDR_ENV: &str = "MSR_METRICS_ADDR";

/// Every metric name the crate records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Sources
    SourcesAttempts,
    SourcesRetries,
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesRequestDuration,
    SourcesCandidates,

    // Normalize
    NormalizeRecordsProcessed,
    NormalizeRecordsRejected,
    NormalizeCategoriesLearned,

    // Conflation
    ConflationGroupSize,
    ConflationDuplicatesMerged,

    // Pipeline
    PipelineRuns,
    PipelineEventsEmitted,
    PipelineDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesAttempts => "msr_sources_attempts_total",
            MetricName::SourcesRetries => "msr_sources_retries_total",
            MetricName::SourcesRequestsSuccess => "msr_sources_requests_success_total",
            MetricName::SourcesRequestsError => "msr_sources_requests_error_total",
            MetricName::SourcesRequestDuration => "msr_sources_request_duration_seconds",
            MetricName::SourcesCandidates => "msr_sources_candidates_total",

            MetricName::NormalizeRecordsProcessed => "msr_normalize_records_processed_total",
            MetricName::NormalizeRecordsRejected => "msr_normalize_records_rejected_total",
            MetricName::NormalizeCategoriesLearned => "msr_normalize_categories_learned_total",

            MetricName::ConflationGroupSize => "msr_conflation_group_size",
            MetricName::ConflationDuplicatesMerged => "msr_conflation_duplicates_merged_total",

            MetricName::PipelineRuns => "msr_pipeline_runs_total",
            MetricName::PipelineEventsEmitted => "msr_pipeline_events_emitted_total",
            MetricName::PipelineDuration => "msr_pipeline_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            SourcesAttempts,
            SourcesRetries,
            SourcesRequestsSuccess,
            SourcesRequestsError,
            SourcesRequestDuration,
            SourcesCandidates,
            NormalizeRecordsProcessed,
            NormalizeRecordsRejected,
            NormalizeCategoriesLearned,
            ConflationGroupSize,
            ConflationDuplicatesMerged,
            PipelineRuns,
            PipelineEventsEmitted,
            PipelineDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once.
///
/// When `MSR_METRICS_ADDR` is set the exporter also serves the scrape
/// endpoint on that address; this needs a running tokio runtime.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = match std::env::var(METRICS_ADDR_ENV) {
        Ok(addr) => {
            let addr: SocketAddr = addr.parse()?;
            let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(addr).build()?;
            let handle = recorder.handle();
            ::metrics::set_global_recorder(recorder)
                .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
            tokio::spawn(exporter);
            info!(%addr, "Metrics system initialized with scrape endpoint");
            handle
        }
        Err(_) => {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
            info!("Metrics system initialized");
            handle
        }
    };

    METRICS_HANDLE.set(handle).ok();
    Ok(())
}

/// Current metrics in Prometheus text format, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Sources Metrics
// ============================================================================

pub mod sources {
    use super::MetricName;

    pub fn attempt(source_id: &str) {
        ::metrics::counter!(MetricName::SourcesAttempts.as_str(), "source" => source_id.to_string())
            .increment(1);
    }

    pub fn retry(source_id: &str) {
        ::metrics::counter!(MetricName::SourcesRetries.as_str(), "source" => source_id.to_string())
            .increment(1);
    }

    /// Record a source that returned candidates
    pub fn request_success(source_id: &str, secs: f64, candidates: usize) {
        let source = source_id.to_string();
        ::metrics::counter!(MetricName::SourcesRequestsSuccess.as_str(), "source" => source.clone())
            .increment(1);
        ::metrics::histogram!(MetricName::SourcesRequestDuration.as_str(), "source" => source.clone())
            .record(secs);
        ::metrics::counter!(MetricName::SourcesCandidates.as_str(), "source" => source)
            .increment(candidates as u64);
    }

    /// Record a source that ended in a `SourceError`
    pub fn request_error(source_id: &str, kind: &'static str) {
        ::metrics::counter!(
            MetricName::SourcesRequestsError.as_str(),
            "source" => source_id.to_string(),
            "kind" => kind
        )
        .increment(1);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn records_processed(count: usize) {
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str()).increment(count as u64);
    }

    pub fn record_rejected(reason: &'static str) {
        ::metrics::counter!(MetricName::NormalizeRecordsRejected.as_str(), "reason" => reason).increment(1);
    }

    pub fn category_learned() {
        ::metrics::counter!(MetricName::NormalizeCategoriesLearned.as_str()).increment(1);
    }
}

// ============================================================================
// Conflation Metrics
// ============================================================================

pub mod conflation {
    use super::MetricName;

    pub fn group_size(size: usize) {
        ::metrics::histogram!(MetricName::ConflationGroupSize.as_str()).record(size as f64);
    }

    pub fn duplicates_merged(count: usize) {
        ::metrics::counter!(MetricName::ConflationDuplicatesMerged.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn run_completed(secs: f64, emitted: usize) {
        ::metrics::counter!(MetricName::PipelineRuns.as_str()).increment(1);
        ::metrics::counter!(MetricName::PipelineEventsEmitted.as_str()).increment(emitted as u64);
        ::metrics::histogram!(MetricName::PipelineDuration.as_str()).record(secs);
    }
}
