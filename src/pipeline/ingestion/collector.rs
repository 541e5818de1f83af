use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{Result, ScraperError};
use crate::observability::metrics;
use crate::pipeline::ingestion::retry::{AttemptState, RetryPolicy};
use crate::pipeline::ingestion::CollectConfig;
use crate::types::{CandidateEvent, SourceAdapter, SourceError, SourceErrorKind};

/// Everything the collector gathered in one run
#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    /// Candidates in adapter order, each stamped with its source and a
    /// global `fetch_order`
    pub candidates: Vec<CandidateEvent>,
    pub errors: Vec<SourceError>,
    pub per_source_fetched: BTreeMap<String, usize>,
}

/// What one source task hands back to the reducer
#[derive(Debug)]
struct SourceReport {
    source_id: String,
    outcome: std::result::Result<Vec<CandidateEvent>, SourceError>,
}

enum AttemptFailure {
    Error(ScraperError),
    Panic(String),
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "adapter panicked".to_string()
    }
}

/// One fetch + parse, bounded by the per-source timeout
async fn attempt_once(
    adapter: &Arc<dyn SourceAdapter>,
    config: &CollectConfig,
) -> std::result::Result<Vec<CandidateEvent>, AttemptFailure> {
    let work = async {
        let document = adapter.fetch().await?;
        adapter.parse(&document)
    };
    match tokio::time::timeout(config.per_source_timeout(), AssertUnwindSafe(work).catch_unwind()).await {
        Err(_) => Err(AttemptFailure::Error(ScraperError::Timeout(config.per_source_timeout_seconds))),
        Ok(Err(payload)) => Err(AttemptFailure::Panic(panic_message(payload))),
        Ok(Ok(Err(e))) => Err(AttemptFailure::Error(e)),
        Ok(Ok(Ok(candidates))) => Ok(candidates),
    }
}

/// Drive one source through the attempt state machine until it succeeds,
/// fails for good, or the collection is cancelled
async fn run_source(
    adapter: Arc<dyn SourceAdapter>,
    config: CollectConfig,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> SourceReport {
    let source_id = adapter.source_id().to_string();
    let policy = RetryPolicy::from_config(&config);
    let mut state = AttemptState::start();
    let mut last_error = String::new();

    let permit = tokio::select! {
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    if permit.is_none() {
        last_error = "collection cancelled before the source started".to_string();
        state = state.cancel();
    }

    let started = Instant::now();
    let mut candidates = Vec::new();
    loop {
        state = match state {
            pending @ AttemptState::Pending { .. } => {
                metrics::sources::attempt(&source_id);
                pending.run()
            }
            running @ AttemptState::Running { attempt } => {
                let result = tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = attempt_once(&adapter, &config) => Some(result),
                };
                match result {
                    None => {
                        last_error = "collection timeout reached during fetch".to_string();
                        running.cancel()
                    }
                    Some(Ok(found)) => {
                        metrics::sources::request_success(&source_id, started.elapsed().as_secs_f64(), found.len());
                        info!(source_id = %source_id, attempt, candidates = found.len(), "Source fetched");
                        candidates = found;
                        running.succeed()
                    }
                    Some(Err(AttemptFailure::Panic(message))) => {
                        error!(source_id = %source_id, attempt, panic = %message, "Source adapter panicked");
                        last_error = format!("panic: {}", message);
                        running.panic()
                    }
                    Some(Err(AttemptFailure::Error(e))) => {
                        let transient = e.is_transient();
                        last_error = e.to_string();
                        let next = running.fail(transient, &policy);
                        if let AttemptState::Backoff { delay, .. } = &next {
                            warn!(
                                source_id = %source_id,
                                attempt,
                                delay_secs = delay.as_secs_f64(),
                                error = %e,
                                "Transient source failure, retrying"
                            );
                            metrics::sources::retry(&source_id);
                        } else {
                            warn!(source_id = %source_id, attempt, transient, error = %e, "Source failed");
                        }
                        next
                    }
                }
            }
            waiting @ AttemptState::Backoff { delay, .. } => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        last_error = format!("collection timeout reached during backoff ({})", last_error);
                        waiting.cancel()
                    }
                    _ = tokio::time::sleep(delay) => waiting.resume(),
                }
            }
            AttemptState::Succeeded { .. } => {
                return SourceReport { source_id, outcome: Ok(candidates) };
            }
            AttemptState::Failed { attempts, kind } => {
                metrics::sources::request_error(&source_id, kind.label());
                return SourceReport {
                    source_id: source_id.clone(),
                    outcome: Err(SourceError { source_id, attempts, kind, last_error }),
                };
            }
        };
    }
}

/// Runs every source adapter concurrently with bounded parallelism,
/// per-attempt timeouts, retry with linear backoff and an overall deadline.
pub struct Collector {
    config: CollectConfig,
}

impl Collector {
    pub fn new(config: CollectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollectConfig {
        &self.config
    }

    /// Collect candidates from all adapters.
    ///
    /// Per-source failures are reported in [`CollectOutcome::errors`]. The
    /// call itself only fails when there are no adapters or when every
    /// adapter panicked. Sources still running when the collection deadline
    /// passes are cancelled and reported with [`SourceErrorKind::Cancelled`].
    #[instrument(skip_all, fields(sources = adapters.len()))]
    pub async fn collect(&self, adapters: &[Arc<dyn SourceAdapter>]) -> Result<CollectOutcome> {
        if adapters.is_empty() {
            return Err(ScraperError::NoSources);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sources.max(1)));
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        for (index, adapter) in adapters.iter().enumerate() {
            let task = run_source(adapter.clone(), self.config.clone(), semaphore.clone(), cancel.clone());
            tasks.spawn(async move { (index, task.await) });
        }

        let deadline = tokio::time::Instant::now() + self.config.collection_timeout();
        let mut reports: Vec<Option<SourceReport>> = (0..adapters.len()).map(|_| None).collect();
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, report))) => reports[index] = Some(report),
                    Some(Err(e)) => error!(error = %e, "Source task failed to join"),
                },
                _ = tokio::time::sleep_until(deadline), if !cancel.is_cancelled() => {
                    warn!(
                        timeout_secs = self.config.collection_timeout_seconds,
                        "Collection timeout reached, cancelling unfinished sources"
                    );
                    cancel.cancel();
                }
            }
        }

        self.reduce(adapters, reports)
    }

    /// Single accumulation point. Adapter order, not completion order,
    /// decides `fetch_order`.
    fn reduce(
        &self,
        adapters: &[Arc<dyn SourceAdapter>],
        reports: Vec<Option<SourceReport>>,
    ) -> Result<CollectOutcome> {
        let mut outcome = CollectOutcome::default();
        let mut fetch_order: u64 = 0;
        let mut panicked = 0usize;

        for (adapter, report) in adapters.iter().zip(reports) {
            let source_id = adapter.source_id().to_string();
            let report = report.unwrap_or_else(|| SourceReport {
                source_id: source_id.clone(),
                outcome: Err(SourceError {
                    source_id: source_id.clone(),
                    attempts: 0,
                    kind: SourceErrorKind::Panicked,
                    last_error: "source task aborted".to_string(),
                }),
            });

            match report.outcome {
                Ok(candidates) => {
                    outcome.per_source_fetched.insert(report.source_id.clone(), candidates.len());
                    for mut candidate in candidates {
                        candidate.source_id = report.source_id.clone();
                        candidate.source_priority = adapter.priority();
                        candidate.fetch_order = fetch_order;
                        fetch_order += 1;
                        outcome.candidates.push(candidate);
                    }
                }
                Err(source_error) => {
                    if source_error.kind == SourceErrorKind::Panicked {
                        panicked += 1;
                    }
                    warn!(
                        source_id = %source_error.source_id,
                        attempts = source_error.attempts,
                        kind = source_error.kind.label(),
                        error = %source_error.last_error,
                        "Source contributed no candidates"
                    );
                    outcome.per_source_fetched.insert(report.source_id, 0);
                    outcome.errors.push(source_error);
                }
            }
        }

        if panicked == adapters.len() {
            return Err(ScraperError::AllSourcesPanicked(panicked));
        }

        info!(
            candidates = outcome.candidates.len(),
            failed_sources = outcome.errors.len(),
            "Collection finished"
        );
        Ok(outcome)
    }
}
