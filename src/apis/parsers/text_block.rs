use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::apis::base::ScheduleParser;
use crate::error::Result;
use crate::pipeline::utils::StringUtils;
use crate::temporal::{parse_date, parse_time, weekday_in, ContextHints};
use crate::types::{CandidateEvent, RawDocument};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("valid url regex"));

/// Field separator; a bare hyphen only counts with spaces around it
static FIELD_SEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[–—|]\s*|\s+-\s+").expect("valid separator regex"));

static LEADING_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}/\d{1,2}(?:/\d{2,4})?)\s*(?:[-–—|]\s*)?")
        .expect("valid leading date regex")
});

static BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li, pre, tr").expect("valid block selector")
});

static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td, th").expect("valid cell selector"));

/// Parser for free-text programming blocks such as
///
/// ```text
/// SÁBADO – 02/08/2025
/// 10h30 – Fórmula 1 – Treino Livre 3 – Hungaroring
/// 14:00 - 15:00 | MotoGP | Sprint https://example.com/motogp
/// ```
///
/// Day header lines set the context date for the lines that follow them.
pub struct TextBlockParser;

impl TextBlockParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextBlockParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A block inside another block is already covered by the outer one's text
fn nested_in_block(block: ElementRef) -> bool {
    block
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BLOCK_SELECTOR.matches(&ancestor))
}

/// Break an HTML body into text lines, one per outermost block element
fn html_lines(body: &str) -> Vec<String> {
    let html = Html::parse_document(body);
    let mut lines = Vec::new();
    for block in html.select(&BLOCK_SELECTOR) {
        if nested_in_block(block) {
            continue;
        }
        if block.value().name() == "tr" {
            let cells: Vec<String> = block
                .select(&CELL_SELECTOR)
                .map(|cell| StringUtils::collapse_whitespace(&cell.text().collect::<String>()))
                .filter(|cell| !cell.is_empty())
                .collect();
            lines.push(cells.join(" – "));
        } else {
            let text: String = block.text().collect();
            lines.extend(text.lines().map(str::to_string));
        }
    }
    lines
}

/// An event line, split into its fields
struct EventLine {
    date_text: Option<String>,
    time_text: String,
    category: String,
    name: String,
    location: String,
    links: Vec<String>,
}

fn starts_with_digit(text: &str) -> bool {
    text.chars().next().map_or(false, |c| c.is_ascii_digit())
}

fn split_event_line(line: &str) -> Option<EventLine> {
    let links: Vec<String> = URL_RE
        .find_iter(line)
        .map(|m| m.as_str().trim_end_matches(|c| matches!(c, '.' | ',' | ')' | ';')).to_string())
        .collect();
    let stripped = URL_RE.replace_all(line, " ");
    let mut text = StringUtils::collapse_whitespace(&stripped);

    let mut date_text = None;
    if let Some(caps) = LEADING_DATE_RE.captures(&text) {
        date_text = caps.get(1).map(|m| m.as_str().to_string());
        let rest_start = caps.get(0).map_or(0, |m| m.end());
        text = text[rest_start..].to_string();
    }

    let parts: Vec<&str> = FIELD_SEP_RE
        .split(&text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    let first = parts.first().copied()?;
    if !starts_with_digit(first) || parse_time(first).is_err() {
        return None;
    }

    // `23:50 - 00:10 – ...` splits the range across the first two parts
    let (time_text, rest) = match parts.get(1) {
        Some(second) if parts.len() >= 3 && starts_with_digit(second) && parse_time(second).is_ok() => {
            (format!("{} - {}", first, second), &parts[2..])
        }
        _ => (first.to_string(), &parts[1..]),
    };

    let (category, name, location) = match rest {
        [] => return None,
        [name] => (String::new(), name.to_string(), String::new()),
        [category, name] => (category.to_string(), name.to_string(), String::new()),
        [category, name, location @ ..] => (category.to_string(), name.to_string(), location.join(" - ")),
    };

    Some(EventLine { date_text, time_text, category, name, location, links })
}

fn is_day_header(line: &str, hints: &ContextHints) -> bool {
    parse_date(line, hints).is_ok() || weekday_in(line).is_some()
}

impl ScheduleParser for TextBlockParser {
    fn parser_name(&self) -> &'static str {
        crate::constants::TEXT_BLOCK_KIND
    }

    fn parse_document(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>> {
        let lines = if document.body.trim_start().starts_with('<') {
            html_lines(&document.body)
        } else {
            document.body.lines().map(str::to_string).collect()
        };
        let hints = ContextHints::with_reference(document.fetched_at.date_naive());

        let mut context: Option<String> = None;
        let mut candidates = Vec::new();
        for raw_line in &lines {
            let line = StringUtils::collapse_whitespace(raw_line);
            if line.is_empty() {
                continue;
            }
            if let Some(event) = split_event_line(&line) {
                let mut candidate = CandidateEvent::new(&document.source_id, event.name)?
                    .with_category(event.category)
                    .with_location(event.location)
                    .with_time(event.time_text)
                    .with_links(event.links);
                if let Some(date_text) = event.date_text {
                    candidate = candidate.with_date(date_text);
                }
                if let Some(context_text) = &context {
                    candidate = candidate.with_context(context_text.clone());
                }
                candidates.push(candidate);
            } else if is_day_header(&line, &hints) {
                context = Some(line);
            } else {
                debug!(source_id = %document.source_id, line = %line, "Ignoring line");
            }
        }
        Ok(candidates)
    }
}
