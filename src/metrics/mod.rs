//! Metrics export for pattern caches (feature `metrics`).

pub mod exporter;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use traits::{CacheMetricsSnapshot, MetricsExporter, MetricsReset, MetricsSnapshotProvider};
