use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Empty response body from {0}")]
    EmptyResponse(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0:.1}s")]
    Timeout(f64),

    #[error("No sources configured")]
    NoSources,

    #[error("All {0} sources panicked")]
    AllSourcesPanicked(usize),
}

impl ScraperError {
    /// Whether a source failure is worth retrying.
    ///
    /// Timeouts, connection problems and server-side statuses (5xx, 408, 429)
    /// are transient. Client errors, empty or unparseable bodies are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => {
                if let Some(status) = e.status() {
                    return is_transient_status(status.as_u16());
                }
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            ScraperError::HttpStatus { status, .. } => is_transient_status(*status),
            ScraperError::Timeout(_) | ScraperError::Io(_) => true,
            _ => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

pub type Result<T> = std::result::Result<T, ScraperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = ScraperError::HttpStatus { status: 500, url: "https://example.com".into() };
        assert!(err.is_transient());
        let err = ScraperError::HttpStatus { status: 429, url: "https://example.com".into() };
        assert!(err.is_transient());
    }

    #[test]
    fn client_errors_and_empty_bodies_are_permanent() {
        let err = ScraperError::HttpStatus { status: 404, url: "https://example.com".into() };
        assert!(!err.is_transient());
        assert!(!ScraperError::EmptyResponse("https://example.com".into()).is_transient());
        assert!(!ScraperError::Parse("bad markup".into()).is_transient());
    }

    #[test]
    fn timeouts_are_transient() {
        assert!(ScraperError::Timeout(5.0).is_transient());
    }
}
