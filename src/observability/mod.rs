// Observability: metrics recorder and per-phase recording helpers

pub mod metrics;

pub use metrics::{init_metrics, render};
