use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::types::ReconciliationResult;

/// Hands a finished run to whatever renders it
pub trait EventExporter {
    /// Write the result somewhere and return where it went
    fn export(&self, result: &ReconciliationResult) -> Result<PathBuf>;
}

/// Writes the whole result as pretty JSON to `<output_dir>/<prefix>_<timestamp>.json`
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
    prefix: String,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), prefix: "schedule".to_string() }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl EventExporter for JsonExporter {
    fn export(&self, result: &ReconciliationResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filepath = self.output_dir.join(format!("{}_{timestamp}.json", self.prefix));

        let json_content = serde_json::to_string_pretty(result)?;
        fs::write(&filepath, json_content)?;

        info!(path = %filepath.display(), events = result.events.len(), "💾 Exported schedule");
        Ok(filepath)
    }
}
