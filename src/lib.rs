pub mod apis;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod temporal;
pub mod types;
pub mod window;

// Layered boundaries for application ports and infrastructure
pub mod app;
pub mod infra;

pub use config::Config;
pub use error::{Result, ScraperError};
pub use output::{EventExporter, JsonExporter};
pub use pipeline::ingestion::{CollectConfig, CollectOutcome, Collector};
pub use pipeline::processing::normalize::{CategoryKnowledgeBase, NormalizeConfig, Normalizer};
pub use pipeline::processing::{Deduplicator, SimilarityConfig};
pub use pipeline::ReconciliationPipeline;
pub use types::{
    CandidateEvent, NormalizedEvent, RawDocument, ReconciliationResult, ReconciliationStats, RejectedEvent,
    RejectionReason, SourceAdapter, SourceError, SourceErrorKind,
};
pub use window::{target_window, TargetWindow, WindowConfig};
