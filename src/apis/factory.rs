use std::sync::Arc;

use crate::apis::base::{BaseAdapter, ScheduleParser};
use crate::apis::parsers::{HtmlListingParser, TextBlockParser};
use crate::app::ports::HttpClientPort;
use crate::config::{SourceConfig, SourceKind};
use crate::error::Result;
use crate::types::SourceAdapter;

/// Build the parser matching a source's configured kind
pub fn create_parser(source: &SourceConfig) -> Result<Box<dyn ScheduleParser>> {
    Ok(match source.kind {
        SourceKind::HtmlListing => Box::new(HtmlListingParser::from_selectors(&source.selectors)?),
        SourceKind::TextBlock => Box::new(TextBlockParser::new()),
    })
}

/// Build an adapter for one configured source
pub fn create_adapter(source: &SourceConfig, http: Arc<dyn HttpClientPort>) -> Result<Arc<dyn SourceAdapter>> {
    let adapter = BaseAdapter::new(&source.id, &source.url, http, create_parser(source)?)
        .with_priority(source.priority)
        .with_timezone(source.timezone()?);
    Ok(Arc::new(adapter))
}

/// Build adapters for every configured source, optionally restricted to the
/// given ids. Unknown ids in `only` are ignored.
pub fn create_adapters(
    sources: &[SourceConfig],
    only: Option<&[String]>,
    http: Arc<dyn HttpClientPort>,
) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    sources
        .iter()
        .filter(|source| only.map_or(true, |ids| ids.iter().any(|id| id == &source.id)))
        .map(|source| create_adapter(source, http.clone()))
        .collect()
}
