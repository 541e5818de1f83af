use async_trait::async_trait;

use crate::error::Result;

/// Outbound HTTP seam used by source adapters.
///
/// Transport failures are returned as `ScraperError::Http` so the collector
/// can classify them; non-2xx statuses are returned as a normal result and
/// interpreted by the adapter.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}
