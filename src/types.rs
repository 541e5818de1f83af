use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScraperError};
use crate::temporal::ParseErrorKind;
use crate::window::TargetWindow;

/// A fetched page or text block, as returned by a source
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source_id: String,
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// An event as extracted from one source, before any interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub source_id: String,
    pub raw_name: String,
    pub raw_category: String,
    pub raw_location: String,
    pub raw_date_text: Option<String>,
    pub raw_time_text: Option<String>,
    /// Date-bearing text from the surrounding page (title, day header, URL)
    pub context_date_text: Option<String>,
    pub links: Vec<String>,
    pub raw_official_url: Option<String>,
    /// Stamped by the collector from the adapter
    pub source_priority: i32,
    /// Stamped by the collector after all sources joined
    pub fetch_order: u64,
}

impl CandidateEvent {
    pub fn new(source_id: impl Into<String>, raw_name: impl Into<String>) -> Result<Self> {
        let raw_name = raw_name.into();
        if raw_name.trim().is_empty() {
            return Err(ScraperError::MissingField("raw_name".into()));
        }
        Ok(Self {
            source_id: source_id.into(),
            raw_name,
            raw_category: String::new(),
            raw_location: String::new(),
            raw_date_text: None,
            raw_time_text: None,
            context_date_text: None,
            links: Vec::new(),
            raw_official_url: None,
            source_priority: 0,
            fetch_order: 0,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.raw_category = category.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.raw_location = location.into();
        self
    }

    pub fn with_date(mut self, text: impl Into<String>) -> Self {
        self.raw_date_text = non_blank(text.into());
        self
    }

    pub fn with_time(mut self, text: impl Into<String>) -> Self {
        self.raw_time_text = non_blank(text.into());
        self
    }

    pub fn with_context(mut self, text: impl Into<String>) -> Self {
        self.context_date_text = non_blank(text.into());
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links.extend(links.into_iter().map(Into::into));
        self
    }

    pub fn with_official_url(mut self, url: impl Into<String>) -> Self {
        self.raw_official_url = non_blank(url.into());
        self
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// An event with every field resolved to its canonical form.
///
/// `instant` always carries an explicit offset; candidates whose start cannot
/// be resolved never become a `NormalizedEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub name: String,
    pub category: String,
    pub location: String,
    pub country: Option<String>,
    pub instant: DateTime<FixedOffset>,
    pub end_instant: Option<DateTime<FixedOffset>>,
    pub duration_minutes: i64,
    /// Only a date was known; `instant` is local midnight
    pub all_day: bool,
    pub links: Vec<String>,
    pub official_url: Option<String>,
    pub source_id: String,
    pub source_priority: i32,
    pub from_context: bool,
    pub date_confidence: f32,
    pub in_silent_period: bool,
    pub fetch_order: u64,
}

/// Why a candidate did not make it into the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    OutsideWindow,
    UnresolvableTime { kind: ParseErrorKind },
}

impl RejectionReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::OutsideWindow => "outside_window",
            RejectionReason::UnresolvableTime { .. } => "unresolvable_time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEvent {
    pub candidate: CandidateEvent,
    #[serde(flatten)]
    pub reason: RejectionReason,
    /// The resolved start, when there was one
    pub instant: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Retries were exhausted or disabled
    Transient,
    Permanent,
    /// The collection deadline passed before the source finished
    Cancelled,
    Panicked,
}

impl SourceErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceErrorKind::Transient => "transient",
            SourceErrorKind::Permanent => "permanent",
            SourceErrorKind::Cancelled => "cancelled",
            SourceErrorKind::Panicked => "panicked",
        }
    }
}

/// Per-source failure, reported instead of raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source_id: String,
    pub attempts: u32,
    pub kind: SourceErrorKind,
    pub last_error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationStats {
    pub fetched: usize,
    pub normalized: usize,
    pub rejected: usize,
    pub rejected_by_reason: BTreeMap<String, usize>,
    pub duplicates_merged: usize,
    pub emitted: usize,
    pub per_source_errors: BTreeMap<String, usize>,
    pub per_source_fetched: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub window: TargetWindow,
    pub events: Vec<NormalizedEvent>,
    pub stats: ReconciliationStats,
    pub errors: Vec<SourceError>,
    pub rejected: Vec<RejectedEvent>,
    /// Category aliases learned during this run, as (alias, canonical)
    pub learned_categories: Vec<(String, String)>,
}

/// Core trait that every schedule source implements
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier for this source
    fn source_id(&self) -> &str;

    /// Higher wins when duplicates are merged
    fn priority(&self) -> i32 {
        0
    }

    /// Timezone of the wall-clock times this source prints, when it differs
    /// from the configured one
    fn timezone(&self) -> Option<Tz> {
        None
    }

    /// Fetch the raw document
    async fn fetch(&self) -> Result<RawDocument>;

    /// Turn a fetched document into candidate events
    fn parse(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>>;
}
