use chrono::{DateTime, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::apis::base::ScheduleParser;
use crate::config::SelectorConfig;
use crate::error::{Result, ScraperError};
use crate::pipeline::utils::StringUtils;
use crate::types::{CandidateEvent, RawDocument};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid title selector"));

/// Parser for listing pages where each event is one element (table row,
/// card, list item) with child elements holding its fields.
pub struct HtmlListingParser {
    row: Selector,
    name: Option<Selector>,
    category: Option<Selector>,
    location: Option<Selector>,
    date: Option<Selector>,
    time: Option<Selector>,
    link: Selector,
    official_link: Option<Selector>,
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScraperError::Config(format!("invalid selector '{}': {}", css, e)))
}

fn compile_opt(css: &Option<String>) -> Result<Option<Selector>> {
    css.as_deref().map(compile).transpose()
}

fn element_text(element: ElementRef) -> String {
    StringUtils::collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

impl HtmlListingParser {
    pub fn from_selectors(selectors: &SelectorConfig) -> Result<Self> {
        let row = selectors
            .row_selector
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("row_selector".into()))?;
        Ok(Self {
            row: compile(row)?,
            name: compile_opt(&selectors.name_selector)?,
            category: compile_opt(&selectors.category_selector)?,
            location: compile_opt(&selectors.location_selector)?,
            date: compile_opt(&selectors.date_selector)?,
            time: compile_opt(&selectors.time_selector)?,
            link: compile(selectors.link_selector.as_deref().unwrap_or("a[href]"))?,
            official_link: compile_opt(&selectors.official_link_selector)?,
        })
    }

    fn field(&self, row: ElementRef, selector: &Option<Selector>) -> String {
        selector
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .map(element_text)
            .unwrap_or_default()
    }

    /// Visible text, or the machine-readable `datetime` attribute of a
    /// `<time>` element when the text is empty
    fn temporal_field(&self, row: ElementRef, selector: &Option<Selector>) -> String {
        let Some(element) = selector.as_ref().and_then(|sel| row.select(sel).next()) else {
            return String::new();
        };
        let text = element_text(element);
        if !text.is_empty() {
            return text;
        }
        element.value().attr("datetime").unwrap_or_default().to_string()
    }

    fn hrefs(&self, row: ElementRef, selector: &Selector, base: Option<&Url>) -> Vec<String> {
        row.select(selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve_href(base, href))
            .collect()
    }
}

/// Formats accepted for a zone-less `datetime` attribute
const NAIVE_DATETIME_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%dT%H:%M:%S", "%H:%M:%S"),
    ("%Y-%m-%dT%H:%M", "%H:%M"),
    ("%Y-%m-%d %H:%M:%S", "%H:%M:%S"),
    ("%Y-%m-%d %H:%M", "%H:%M"),
];

/// Split a machine date-time (`2025-08-02T14:00:00-03:00`) into date text
/// and time text. An explicit offset stays on the time text.
fn machine_datetime(value: &str) -> Option<(String, String)> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some((dt.format("%Y-%m-%d").to_string(), dt.format("%H:%M:%S%:z").to_string()));
    }
    NAIVE_DATETIME_FORMATS.iter().find_map(|(format, time_format)| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|dt| (dt.format("%Y-%m-%d").to_string(), dt.format(time_format).to_string()))
    })
}

/// Route the date and time halves of machine date-times to their fields.
/// A half only fills a field that is empty or held the whole date-time.
fn split_datetimes(date: String, time: String) -> (String, String) {
    let from_date = machine_datetime(&date);
    let from_time = machine_datetime(&time);
    let (mut date, mut time) = (date, time);
    if let Some((date_part, time_part)) = from_date {
        date = date_part;
        if time.is_empty() {
            time = time_part;
        }
    }
    if let Some((date_part, time_part)) = from_time {
        time = time_part;
        if date.is_empty() {
            date = date_part;
        }
    }
    (date, time)
}

fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Some(href.to_string()),
    }
}

impl ScheduleParser for HtmlListingParser {
    fn parser_name(&self) -> &'static str {
        crate::constants::HTML_LISTING_KIND
    }

    fn parse_document(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>> {
        let html = Html::parse_document(&document.body);
        let base = Url::parse(&document.url).ok();
        let title = html.select(&TITLE_SELECTOR).next().map(element_text).unwrap_or_default();

        let mut candidates = Vec::new();
        for row in html.select(&self.row) {
            let name = match &self.name {
                Some(_) => self.field(row, &self.name),
                None => element_text(row),
            };
            if name.is_empty() {
                debug!(source_id = %document.source_id, "Skipping row without a name");
                continue;
            }

            let (date_text, time_text) =
                split_datetimes(self.temporal_field(row, &self.date), self.temporal_field(row, &self.time));
            let mut candidate = CandidateEvent::new(&document.source_id, name)?
                .with_category(self.field(row, &self.category))
                .with_location(self.field(row, &self.location))
                .with_date(date_text)
                .with_time(time_text)
                .with_context(title.clone())
                .with_links(self.hrefs(row, &self.link, base.as_ref()));
            if let Some(official) = &self.official_link {
                if let Some(url) = self.hrefs(row, official, base.as_ref()).into_iter().next() {
                    candidate = candidate.with_official_url(url);
                }
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}
