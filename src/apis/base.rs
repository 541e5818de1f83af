use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{debug, info, instrument};

use crate::app::ports::HttpClientPort;
use crate::error::{Result, ScraperError};
use crate::types::{CandidateEvent, RawDocument, SourceAdapter};

/// Source-specific parsing logic
pub trait ScheduleParser: Send + Sync {
    /// Parse a fetched document into candidate events
    fn parse_document(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>>;

    /// Short name of the parser, for logs
    fn parser_name(&self) -> &'static str;
}

/// Adapter that fetches one URL and hands the body to a [`ScheduleParser`]
pub struct BaseAdapter {
    source_id: String,
    url: String,
    priority: i32,
    timezone: Option<Tz>,
    http: Arc<dyn HttpClientPort>,
    parser: Box<dyn ScheduleParser>,
}

impl BaseAdapter {
    pub fn new(
        source_id: impl Into<String>,
        url: impl Into<String>,
        http: Arc<dyn HttpClientPort>,
        parser: Box<dyn ScheduleParser>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            url: url.into(),
            priority: 0,
            timezone: None,
            http,
            parser,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl SourceAdapter for BaseAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    #[instrument(skip(self), fields(source_id = %self.source_id))]
    async fn fetch(&self) -> Result<RawDocument> {
        let response = self.http.get(&self.url).await?;
        if !response.is_success() {
            return Err(ScraperError::HttpStatus { status: response.status, url: self.url.clone() });
        }
        let body = response.text();
        if body.trim().is_empty() {
            return Err(ScraperError::EmptyResponse(self.url.clone()));
        }
        debug!(bytes = body.len(), content_type = %response.content_type, "Fetched document");
        Ok(RawDocument {
            source_id: self.source_id.clone(),
            url: self.url.clone(),
            body,
            fetched_at: Utc::now(),
        })
    }

    fn parse(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>> {
        let candidates = self.parser.parse_document(document)?;
        info!(
            source_id = %self.source_id,
            parser = self.parser.parser_name(),
            "Parsed {} candidate events",
            candidates.len()
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;

    struct FixedHttp {
        status: u16,
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl HttpClientPort for FixedHttp {
        async fn get(&self, _url: &str) -> Result<HttpGetResult> {
            Ok(HttpGetResult {
                status: self.status,
                bytes: self.body.as_bytes().to_vec(),
                content_type: "text/plain".into(),
            })
        }
    }

    struct LineParser;

    impl ScheduleParser for LineParser {
        fn parse_document(&self, document: &RawDocument) -> Result<Vec<CandidateEvent>> {
            document
                .body
                .lines()
                .map(|line| CandidateEvent::new(&document.source_id, line))
                .collect()
        }

        fn parser_name(&self) -> &'static str {
            "lines"
        }
    }

    fn adapter(status: u16, body: &'static str) -> BaseAdapter {
        BaseAdapter::new("src", "https://example.com", Arc::new(FixedHttp { status, body }), Box::new(LineParser))
    }

    #[tokio::test]
    async fn test_fetch_and_parse() {
        let adapter = adapter(200, "Race\nQualifying");
        let document = adapter.fetch().await.unwrap();
        assert_eq!(document.source_id, "src");
        let candidates = adapter.parse(&document).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_status_and_empty_body_errors() {
        let err = adapter(503, "down").fetch().await.unwrap_err();
        assert!(matches!(err, ScraperError::HttpStatus { status: 503, .. }));
        assert!(err.is_transient());

        let err = adapter(200, "   ").fetch().await.unwrap_err();
        assert!(matches!(err, ScraperError::EmptyResponse(_)));
        assert!(!err.is_transient());
    }
}
