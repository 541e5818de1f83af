//! Candidate -> normalized event.
//!
//! Every candidate ends up either as a [`NormalizedEvent`] inside the target
//! window or as a [`RejectedEvent`] with a typed reason. Nothing is dropped
//! silently and nothing defaults to "now".

pub mod category;
pub mod links;
pub mod location;
pub mod silent;

use std::collections::HashMap;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::constants::{
    ALL_DAY_DURATION_MINUTES, DEFAULT_EVENT_DURATION_MINUTES, TIME_PLACEHOLDERS, UNKNOWN_CATEGORY,
};
use crate::observability::metrics;
use crate::pipeline::utils::StringUtils;
use crate::temporal::{
    parse_date, parse_time_range, resolve_range, resolve_range_at, split_utc_offset, start_of_day, DateMatch,
    ParseErrorKind,
};
use crate::types::{CandidateEvent, NormalizedEvent, RejectedEvent, RejectionReason};
use crate::window::TargetWindow;

pub use category::{CategoryKnowledgeBase, CategoryMatch};
pub use silent::SilentPeriod;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Duration given to timed events without an end time
    pub default_duration_minutes: i64,
    /// Floor for fuzzy category matches
    pub category_min_similarity: f64,
    /// Report fuzzy category matches as new aliases
    pub learn_categories: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_EVENT_DURATION_MINUTES,
            category_min_similarity: 0.80,
            learn_categories: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub events: Vec<NormalizedEvent>,
    pub rejected: Vec<RejectedEvent>,
    /// (alias, canonical) pairs worth adding to the knowledge base
    pub learned: Vec<(String, String)>,
}

/// Resolved start of a candidate
struct Resolved {
    date: DateMatch,
    from_context: bool,
    start: chrono::DateTime<chrono::FixedOffset>,
    end: Option<chrono::DateTime<chrono::FixedOffset>>,
    all_day: bool,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizeConfig,
    timezone: Tz,
    source_timezones: HashMap<String, Tz>,
    silent_periods: Vec<SilentPeriod>,
}

fn is_placeholder(time_text: &str) -> bool {
    let folded = StringUtils::fold(time_text);
    folded.is_empty() || TIME_PLACEHOLDERS.contains(&folded.as_str())
}

impl Normalizer {
    pub fn new(config: NormalizeConfig, timezone: Tz) -> Self {
        Self { config, timezone, source_timezones: HashMap::new(), silent_periods: Vec::new() }
    }

    pub fn with_source_timezones(mut self, source_timezones: HashMap<String, Tz>) -> Self {
        self.source_timezones = source_timezones;
        self
    }

    pub fn with_silent_periods(mut self, silent_periods: Vec<SilentPeriod>) -> Self {
        self.silent_periods = silent_periods;
        self
    }

    fn timezone_for(&self, source_id: &str) -> Tz {
        self.source_timezones.get(source_id).copied().unwrap_or(self.timezone)
    }

    /// The row's own date first, then the page context. When both fail the
    /// row's error wins, since it is the more specific one.
    fn resolve_date(
        &self,
        candidate: &CandidateEvent,
        window: &TargetWindow,
    ) -> Result<(DateMatch, bool), ParseErrorKind> {
        let hints = window.hints();
        let explicit = candidate.raw_date_text.as_deref().map(|text| parse_date(text, &hints));
        if let Some(Ok(date)) = explicit {
            return Ok((date, false));
        }
        let context = candidate.context_date_text.as_deref().map(|text| parse_date(text, &hints));
        match (explicit, context) {
            (_, Some(Ok(date))) => Ok((date, true)),
            (Some(Err(kind)), _) => Err(kind),
            (None, Some(Err(kind))) => Err(kind),
            _ => Err(ParseErrorKind::NoMatch),
        }
    }

    fn resolve_instant(
        &self,
        candidate: &CandidateEvent,
        window: &TargetWindow,
        tz: Tz,
    ) -> Result<Resolved, ParseErrorKind> {
        let (date, from_context) = self.resolve_date(candidate, window)?;
        match candidate.raw_time_text.as_deref().filter(|text| !is_placeholder(text)) {
            None => Ok(Resolved {
                date,
                from_context,
                start: start_of_day(date.date, tz),
                end: None,
                all_day: true,
            }),
            Some(time_text) => {
                let range = parse_time_range(time_text)?;
                let resolved = match split_utc_offset(time_text).1 {
                    Some(offset) => resolve_range_at(date.date, &range, offset),
                    None => resolve_range(date.date, &range, tz),
                };
                Ok(Resolved { date, from_context, start: resolved.start, end: resolved.end, all_day: false })
            }
        }
    }

    /// Normalize one candidate
    pub fn normalize_one(
        &self,
        candidate: CandidateEvent,
        window: &TargetWindow,
        categories: &CategoryKnowledgeBase,
    ) -> Result<(NormalizedEvent, Option<(String, String)>), RejectedEvent> {
        let tz = self.timezone_for(&candidate.source_id);
        let resolved = match self.resolve_instant(&candidate, window, tz) {
            Ok(resolved) => resolved,
            Err(kind) => {
                return Err(RejectedEvent {
                    candidate,
                    reason: RejectionReason::UnresolvableTime { kind },
                    instant: None,
                })
            }
        };
        if !window.contains(&resolved.start) {
            return Err(RejectedEvent {
                candidate,
                reason: RejectionReason::OutsideWindow,
                instant: Some(resolved.start),
            });
        }

        let duration_minutes = match (resolved.end, resolved.all_day) {
            (Some(end), _) => (end - resolved.start).num_minutes(),
            (None, true) => ALL_DAY_DURATION_MINUTES,
            (None, false) => self.config.default_duration_minutes,
        };

        let category_match = categories.resolve(&candidate.raw_category, self.config.category_min_similarity);
        let learned = match &category_match {
            CategoryMatch::Fuzzy { canonical, .. } if self.config.learn_categories => {
                Some((StringUtils::collapse_whitespace(&candidate.raw_category), canonical.clone()))
            }
            _ => None,
        };
        let category = category_match.canonical().unwrap_or(UNKNOWN_CATEGORY).to_string();

        let official_url = candidate.raw_official_url.as_deref().and_then(links::validate_url);
        let links = links::clean_links(
            candidate
                .links
                .iter()
                .map(String::as_str)
                .chain(official_url.as_deref()),
        );

        let location = location::clean_location(&candidate.raw_location);
        let country = location::infer_country(&location);
        let local_start = resolved.start.with_timezone(&self.timezone).naive_local();
        let in_silent_period = self.silent_periods.iter().any(|period| period.contains(local_start));

        let event = NormalizedEvent {
            name: StringUtils::collapse_whitespace(&candidate.raw_name),
            category,
            location,
            country,
            instant: resolved.start,
            end_instant: resolved.end,
            duration_minutes,
            all_day: resolved.all_day,
            links,
            official_url,
            source_id: candidate.source_id,
            source_priority: candidate.source_priority,
            from_context: resolved.from_context,
            date_confidence: resolved.date.confidence,
            in_silent_period,
            fetch_order: candidate.fetch_order,
        };
        Ok((event, learned))
    }

    /// Normalize every candidate against the window. Input order is kept in
    /// both output lists.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn normalize(
        &self,
        candidates: Vec<CandidateEvent>,
        window: &TargetWindow,
        categories: &CategoryKnowledgeBase,
    ) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::default();
        metrics::normalize::records_processed(candidates.len());

        for candidate in candidates {
            match self.normalize_one(candidate, window, categories) {
                Ok((event, learned)) => {
                    if let Some(pair) = learned {
                        if !outcome.learned.contains(&pair) {
                            debug!(alias = %pair.0, canonical = %pair.1, "Learned category alias");
                            metrics::normalize::category_learned();
                            outcome.learned.push(pair);
                        }
                    }
                    outcome.events.push(event);
                }
                Err(rejected) => {
                    debug!(
                        name = %rejected.candidate.raw_name,
                        source_id = %rejected.candidate.source_id,
                        reason = rejected.reason.label(),
                        "Rejected candidate"
                    );
                    metrics::normalize::record_rejected(rejected.reason.label());
                    outcome.rejected.push(rejected);
                }
            }
        }
        outcome
    }
}
