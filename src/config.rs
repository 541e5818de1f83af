use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{HTML_LISTING_KIND, TEXT_BLOCK_KIND};
use crate::error::{Result, ScraperError};
use crate::pipeline::ingestion::CollectConfig;
use crate::pipeline::processing::conflation::SimilarityConfig;
use crate::pipeline::processing::normalize::{NormalizeConfig, SilentPeriod};
use crate::window::WindowConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone all wall-clock times are read in unless a source overrides it
    pub timezone: String,
    pub log_dir: String,
    pub output_dir: String,
    /// JSON store of learned category aliases
    pub categories_path: Option<String>,
    pub collect: CollectConfig,
    pub window: WindowSection,
    pub similarity: SimilarityConfig,
    pub normalize: NormalizeConfig,
    pub silent_periods: Vec<SilentPeriodConfig>,
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "America/Sao_Paulo".to_string(),
            log_dir: "logs".to_string(),
            output_dir: "output".to_string(),
            categories_path: None,
            collect: CollectConfig::default(),
            window: WindowSection::default(),
            similarity: SimilarityConfig::default(),
            normalize: NormalizeConfig::default(),
            silent_periods: Vec::new(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    pub start_weekday: String,
    pub end_weekday: String,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self { start_weekday: "fri".to_string(), end_weekday: "sun".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilentPeriodConfig {
    pub start: String,
    pub end: String,
    /// Empty means every day
    #[serde(default)]
    pub weekdays: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    HtmlListing,
    TextBlock,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::HtmlListing => HTML_LISTING_KIND,
            SourceKind::TextBlock => TEXT_BLOCK_KIND,
        }
    }
}

/// CSS selectors for `html_listing` sources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub row_selector: Option<String>,
    pub name_selector: Option<String>,
    pub category_selector: Option<String>,
    pub location_selector: Option<String>,
    pub date_selector: Option<String>,
    pub time_selector: Option<String>,
    pub link_selector: Option<String>,
    pub official_link_selector: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub priority: i32,
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub selectors: SelectorConfig,
}

impl SourceConfig {
    pub fn timezone(&self) -> Result<Option<Tz>> {
        self.timezone.as_deref().map(parse_timezone).transpose()
    }
}

impl Config {
    /// Read, parse and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let collect = &self.collect;
        if collect.max_concurrent_sources < 1 {
            return Err(config_error("collect.max_concurrent_sources must be at least 1"));
        }
        if !(collect.per_source_timeout_seconds > 0.0) {
            return Err(config_error("collect.per_source_timeout_seconds must be positive"));
        }
        if !(collect.collection_timeout_seconds > 0.0) {
            return Err(config_error("collect.collection_timeout_seconds must be positive"));
        }
        if !(collect.retry_backoff_seconds >= 0.0) || !collect.retry_backoff_seconds.is_finite() {
            return Err(config_error("collect.retry_backoff_seconds must be zero or positive"));
        }

        let thresholds = [
            ("similarity.name_threshold", self.similarity.name_threshold),
            ("similarity.category_threshold", self.similarity.category_threshold),
            ("similarity.location_threshold", self.similarity.location_threshold),
            ("normalize.category_min_similarity", self.normalize.category_min_similarity),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(config_error(&format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.similarity.time_tolerance_minutes < 0 {
            return Err(config_error("similarity.time_tolerance_minutes must not be negative"));
        }
        if self.normalize.default_duration_minutes <= 0 {
            return Err(config_error("normalize.default_duration_minutes must be positive"));
        }

        self.timezone()?;
        self.window_config()?;
        self.silent_periods()?;

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(config_error("source id must not be empty"));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(config_error(&format!("duplicate source id '{}'", source.id)));
            }
            source.timezone()?;
            if source.kind == SourceKind::HtmlListing && source.selectors.row_selector.is_none() {
                return Err(config_error(&format!(
                    "source '{}' is an html_listing without row_selector",
                    source.id
                )));
            }
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    pub fn window_config(&self) -> Result<WindowConfig> {
        Ok(WindowConfig {
            start: parse_weekday(&self.window.start_weekday)?,
            end: parse_weekday(&self.window.end_weekday)?,
        })
    }

    pub fn silent_periods(&self) -> Result<Vec<SilentPeriod>> {
        self.silent_periods
            .iter()
            .map(|period| {
                let weekdays = period
                    .weekdays
                    .iter()
                    .map(|day| parse_weekday(day))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SilentPeriod {
                    start: parse_clock(&period.start)?,
                    end: parse_clock(&period.end)?,
                    weekdays,
                })
            })
            .collect()
    }
}

fn config_error(message: &str) -> ScraperError {
    ScraperError::Config(message.to_string())
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| ScraperError::Config(format!("unknown timezone '{}': {}", name, e)))
}

fn parse_weekday(name: &str) -> Result<Weekday> {
    name.trim()
        .parse::<Weekday>()
        .map_err(|_| ScraperError::Config(format!("unknown weekday '{}'", name)))
}

fn parse_clock(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|e| ScraperError::Config(format!("invalid time '{}': {}", text, e)))
}
