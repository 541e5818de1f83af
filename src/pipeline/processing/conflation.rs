use std::cmp::{Ordering, Reverse};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::constants::UNKNOWN_CATEGORY;
use crate::observability::metrics;
use crate::pipeline::processing::normalize::links::merge_links;
use crate::pipeline::utils::StringUtils;
use crate::types::NormalizedEvent;

/// Thresholds for treating two events as the same real-world session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimum fuzzy ratio between folded names
    pub name_threshold: f64,
    /// Maximum distance between start instants
    pub time_tolerance_minutes: i64,
    /// Minimum category ratio; "Unknown" matches anything
    pub category_threshold: f64,
    /// Minimum location ratio; an empty location matches anything
    pub location_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            name_threshold: 0.85,
            time_tolerance_minutes: 30,
            category_threshold: 0.90,
            location_threshold: 0.80,
        }
    }
}

/// Events judged to be one real-world event
#[derive(Debug, Clone, PartialEq)]
pub struct DedupGroup {
    /// Members in input order
    pub members: Vec<NormalizedEvent>,
    /// Index into `members` of the representative
    pub canonical: usize,
}

impl DedupGroup {
    pub fn canonical_event(&self) -> &NormalizedEvent {
        &self.members[self.canonical]
    }

    /// The representative with every member's links and the first known
    /// country / official link filled in
    pub fn merged(&self) -> NormalizedEvent {
        let mut canonical = self.canonical_event().clone();
        let mut others: Vec<&NormalizedEvent> = self
            .members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.canonical)
            .map(|(_, event)| event)
            .collect();
        others.sort_by_key(|event| event.fetch_order);

        canonical.links = merge_links(
            canonical
                .links
                .iter()
                .chain(others.iter().flat_map(|event| event.links.iter()))
                .cloned(),
        );
        if canonical.country.is_none() {
            canonical.country = others.iter().find_map(|event| event.country.clone());
        }
        if canonical.official_url.is_none() {
            canonical.official_url = others.iter().find_map(|event| event.official_url.clone());
        }
        canonical
    }
}

/// Disjoint-set forest over event indices
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self { parent: (0..size).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// The smaller index always becomes the root
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        match ra.cmp(&rb) {
            Ordering::Less => self.parent[rb] = ra,
            Ordering::Greater => self.parent[ra] = rb,
            Ordering::Equal => {}
        }
    }
}

/// Total order for picking a group's representative; greater wins.
///
/// Priority, then link count, then name length, then having an official
/// link, then the earliest fetch.
fn canonical_key(event: &NormalizedEvent) -> (i32, usize, usize, bool, Reverse<u64>) {
    (
        event.source_priority,
        event.links.len(),
        event.name.chars().count(),
        event.official_url.is_some(),
        Reverse(event.fetch_order),
    )
}

/// Output order: start instant, then name, then fetch order
fn output_order(a: &NormalizedEvent, b: &NormalizedEvent) -> Ordering {
    a.instant
        .cmp(&b.instant)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.fetch_order.cmp(&b.fetch_order))
}

pub struct Deduplicator {
    config: SimilarityConfig,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

impl Deduplicator {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// All four checks must pass: name, start time, category and location
    pub fn is_similar(&self, a: &NormalizedEvent, b: &NormalizedEvent) -> bool {
        let apart = (a.instant - b.instant).abs();
        if apart > Duration::minutes(self.config.time_tolerance_minutes) {
            return false;
        }
        if StringUtils::similarity(&a.name, &b.name) < self.config.name_threshold {
            return false;
        }
        let category_matches = a.category == UNKNOWN_CATEGORY
            || b.category == UNKNOWN_CATEGORY
            || StringUtils::similarity(&a.category, &b.category) >= self.config.category_threshold;
        if !category_matches {
            return false;
        }
        a.location.trim().is_empty()
            || b.location.trim().is_empty()
            || StringUtils::similarity(&a.location, &b.location) >= self.config.location_threshold
    }

    /// Transitive grouping. Groups come back ordered by their first member's
    /// position in `events`.
    pub fn group(&self, events: &[NormalizedEvent]) -> Vec<DedupGroup> {
        let mut sets = UnionFind::new(events.len());
        for i in 0..events.len() {
            for j in (i + 1)..events.len() {
                if self.is_similar(&events[i], &events[j]) {
                    sets.union(i, j);
                }
            }
        }

        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); events.len()];
        for i in 0..events.len() {
            let root = sets.find(i);
            by_root[root].push(i);
        }

        by_root
            .into_iter()
            .filter(|indices| !indices.is_empty())
            .map(|indices| {
                let members: Vec<NormalizedEvent> = indices.iter().map(|&i| events[i].clone()).collect();
                let canonical = members
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| canonical_key(a).cmp(&canonical_key(b)))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                DedupGroup { members, canonical }
            })
            .collect()
    }

    /// One merged event per group, in output order
    #[instrument(skip_all, fields(events = events.len()))]
    pub fn deduplicate(&self, events: &[NormalizedEvent]) -> Vec<NormalizedEvent> {
        let groups = self.group(events);
        let mut merged_total = 0usize;
        let mut output: Vec<NormalizedEvent> = groups
            .iter()
            .map(|group| {
                metrics::conflation::group_size(group.members.len());
                if group.members.len() > 1 {
                    merged_total += group.members.len() - 1;
                    debug!(
                        canonical = %group.canonical_event().name,
                        source_id = %group.canonical_event().source_id,
                        members = group.members.len(),
                        "Merged duplicate events"
                    );
                }
                group.merged()
            })
            .collect();
        output.sort_by(output_order);

        metrics::conflation::duplicates_merged(merged_total);
        info!(input = events.len(), emitted = output.len(), merged = merged_total, "Deduplication finished");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600).unwrap().with_ymd_and_hms(2025, 8, 3, hour, minute, 0).unwrap()
    }

    fn event(name: &str, instant: DateTime<FixedOffset>, fetch_order: u64) -> NormalizedEvent {
        NormalizedEvent {
            name: name.to_string(),
            category: "Formula 1".to_string(),
            location: "Hungaroring".to_string(),
            country: None,
            instant,
            end_instant: None,
            duration_minutes: 90,
            all_day: false,
            links: vec![],
            official_url: None,
            source_id: format!("src{}", fetch_order),
            source_priority: 0,
            from_context: false,
            date_confidence: 0.9,
            in_silent_period: false,
            fetch_order,
        }
    }

    #[test]
    fn test_same_race_from_two_sources_is_merged() {
        let mut a = event("Grande Premio da Hungria", at(10, 0), 0);
        a.links = vec!["https://a.example/hu".into()];
        let mut b = event("Grande Premio de Hungria", at(10, 10), 1);
        b.links = vec!["https://b.example/hu".into(), "https://a.example/hu".into()];
        b.country = Some("Hungary".into());

        let out = Deduplicator::default().deduplicate(&[a, b]);
        assert_eq!(out.len(), 1);
        // more links wins
        assert_eq!(out[0].fetch_order, 1);
        assert_eq!(out[0].links, vec!["https://b.example/hu".to_string(), "https://a.example/hu".to_string()]);
        assert_eq!(out[0].country.as_deref(), Some("Hungary"));
    }

    #[test]
    fn test_each_check_can_keep_events_apart() {
        let dedup = Deduplicator::default();
        let base = event("Grande Premio da Hungria", at(10, 0), 0);

        let later = event("Grande Premio da Hungria", at(10, 31), 1);
        assert!(!dedup.is_similar(&base, &later));

        let other_name = event("Treino Livre 1", at(10, 0), 1);
        assert!(!dedup.is_similar(&base, &other_name));

        let mut other_category = event("Grande Premio da Hungria", at(10, 0), 1);
        other_category.category = "MotoGP".into();
        assert!(!dedup.is_similar(&base, &other_category));

        let mut other_place = event("Grande Premio da Hungria", at(10, 0), 1);
        other_place.location = "Interlagos".into();
        assert!(!dedup.is_similar(&base, &other_place));
    }

    #[test]
    fn test_time_tolerance_counts_seconds() {
        let dedup = Deduplicator::default();
        let base = event("Grande Premio da Hungria", at(10, 0), 0);

        let edge = event("Grande Premio da Hungria", at(10, 30), 1);
        assert!(dedup.is_similar(&base, &edge));

        let just_over = event("Grande Premio da Hungria", at(10, 30) + Duration::seconds(59), 1);
        assert!(!dedup.is_similar(&base, &just_over));
        assert!(!dedup.is_similar(&just_over, &base));
    }

    #[test]
    fn test_unknown_category_and_empty_location_are_wildcards() {
        let dedup = Deduplicator::default();
        let base = event("Grande Premio da Hungria", at(10, 0), 0);
        let mut loose = event("Grande Premio da Hungria", at(10, 5), 1);
        loose.category = UNKNOWN_CATEGORY.into();
        loose.location = String::new();
        assert!(dedup.is_similar(&base, &loose));
    }

    #[test]
    fn test_grouping_is_transitive() {
        let a = event("Corrida", at(10, 0), 0);
        let b = event("Corrida", at(10, 25), 1);
        let c = event("Corrida", at(10, 50), 2);
        let dedup = Deduplicator::default();
        assert!(!dedup.is_similar(&a, &c));

        let groups = dedup.group(&[a, b, c]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
    }

    #[test]
    fn test_tie_break_chain() {
        let dedup = Deduplicator::default();

        let mut low = event("Corrida", at(10, 0), 0);
        low.links = vec!["https://a.example".into(), "https://b.example".into()];
        let mut high = event("Corrida", at(10, 0), 1);
        high.source_priority = 5;
        assert_eq!(dedup.deduplicate(&[low, high])[0].fetch_order, 1);

        let short = event("Corrida", at(10, 0), 0);
        let long = event("Corrida!", at(10, 0), 1);
        assert_eq!(dedup.deduplicate(&[short, long])[0].fetch_order, 1);

        let plain = event("Corrida", at(10, 0), 0);
        let mut official = event("Corrida", at(10, 0), 1);
        official.official_url = Some("https://www.formula1.com/".into());
        assert_eq!(dedup.deduplicate(&[plain, official])[0].fetch_order, 1);

        let first = event("Corrida", at(10, 0), 3);
        let second = event("Corrida", at(10, 0), 7);
        assert_eq!(dedup.deduplicate(&[second, first])[0].fetch_order, 3);
    }

    #[test]
    fn test_output_order_and_idempotence() {
        let events = vec![
            event("Sprint", at(15, 0), 0),
            event("Corrida", at(10, 0), 1),
            event("Classificacao", at(10, 0), 2),
            event("Corrida", at(10, 5), 3),
        ];
        let dedup = Deduplicator::default();
        let once = dedup.deduplicate(&events);
        let names: Vec<&str> = once.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Classificacao", "Corrida", "Sprint"]);
        assert_eq!(dedup.deduplicate(&once), once);

        for (i, a) in once.iter().enumerate() {
            for b in &once[i + 1..] {
                assert!(!dedup.is_similar(a, b));
            }
        }
    }
}
